//! Embedded SQLite backend.
//!
//! Reads the schema the same way the database service does: table names from
//! `sqlite_master`, then `PRAGMA table_info` per table. A connection is opened
//! for each call and closed when the call returns; rusqlite is blocking, so
//! the work runs on tokio's blocking pool.
//!
//! Every call is bounded by the configured timeout. A progress handler aborts
//! the running statement once the deadline passes, so a runaway query does not
//! keep a blocking thread busy after the caller has given up.

use crate::collab::DatabaseService;
use crate::types::{AskError, Result, ResultTable, ScalarValue, Schema};
use async_trait::async_trait;
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OpenFlags};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// VM instructions between deadline checks.
const PROGRESS_OPS: i32 = 1_000;

/// Extra wait for the blocking task after the deadline before giving up on it.
const ABORT_GRACE: Duration = Duration::from_millis(500);

/// SQLite database file.
pub struct SqliteDatabase {
    path: PathBuf,
    timeout: Duration,
}

impl SqliteDatabase {
    /// Use the database at `path`. The file is not created if missing.
    ///
    /// Each schema read or query is aborted after `timeout`.
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    async fn blocking<T, E, F>(&self, work: F) -> std::result::Result<T, String>
    where
        T: Send + 'static,
        E: Display,
        F: FnOnce(&Connection) -> std::result::Result<T, E> + Send + 'static,
    {
        let path = self.path.clone();
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;

        let task = tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path).map_err(|e| {
                format!("unable to open database {}: {}", path.display(), e)
            })?;
            conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));

            work(&conn).map_err(|e| {
                if Instant::now() >= deadline {
                    format!("statement timed out after {:?}", timeout)
                } else {
                    e.to_string()
                }
            })
        });

        match tokio::time::timeout(timeout + ABORT_GRACE, task).await {
            Ok(joined) => joined.map_err(|e| format!("database task failed: {}", e))?,
            Err(_) => Err(format!("statement timed out after {:?}", timeout)),
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Tables in `sqlite_master` order, columns in declaration order.
pub(crate) fn read_schema(conn: &Connection) -> rusqlite::Result<Schema> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table'")?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut schema = Schema::new();
    for table in tables {
        let mut info = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(&table)))?;
        let columns = info
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        schema.insert(table, columns);
    }

    Ok(schema)
}

fn scalar(value: ValueRef<'_>) -> ScalarValue {
    match value {
        ValueRef::Null => ScalarValue::Null,
        ValueRef::Integer(i) => ScalarValue::Integer(i),
        ValueRef::Real(r) => ScalarValue::Real(r),
        ValueRef::Text(bytes) => ScalarValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => ScalarValue::Text(format!("<blob {} bytes>", bytes.len())),
    }
}

/// Run exactly one statement. Statements without result columns still
/// execute and yield an empty table.
///
/// Anything after the first statement other than whitespace, `;` or comments
/// is rejected before the first statement runs.
pub(crate) fn run_query(
    conn: &Connection,
    sql: &str,
) -> std::result::Result<(Vec<String>, Vec<Vec<ScalarValue>>), String> {
    let mut batch = Batch::new(conn, sql);
    let mut stmt = match batch.next() {
        Ok(Some(stmt)) => stmt,
        Ok(None) => return Err("no statement to execute".to_string()),
        Err(e) => return Err(e.to_string()),
    };
    if !matches!(batch.next(), Ok(None)) {
        return Err("You can only execute one statement at a time.".to_string());
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
    let mut values = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(scalar(row.get_ref(i).map_err(|e| e.to_string())?));
        }
        values.push(cells);
    }

    Ok((columns, values))
}

#[async_trait]
impl DatabaseService for SqliteDatabase {
    async fn schema(&self) -> Result<Schema> {
        self.blocking(read_schema).await.map_err(AskError::schema)
    }

    async fn query(&self, sql: &str) -> Result<ResultTable> {
        let sql = sql.to_string();
        let (columns, rows) = self
            .blocking(move |conn| run_query(conn, &sql))
            .await
            .map_err(AskError::execution)?;
        ResultTable::new(columns, rows)
    }

    fn system(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT, dept TEXT);
             CREATE TABLE \"odd\"\"name\" (x REAL);
             INSERT INTO employees (name, dept) VALUES ('ann', 'eng'), ('bo', 'ops');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_read_schema() {
        let schema = read_schema(&memory_db()).unwrap();

        assert_eq!(
            schema.columns("employees").unwrap(),
            &["id".to_string(), "name".to_string(), "dept".to_string()]
        );
        assert_eq!(schema.columns("odd\"name").unwrap(), &["x".to_string()]);
    }

    #[test]
    fn test_run_query_types() {
        let conn = memory_db();
        let (columns, rows) = run_query(
            &conn,
            "SELECT name, id, 1.5 AS r, NULL AS n FROM employees ORDER BY id",
        )
        .unwrap();

        assert_eq!(columns, vec!["name", "id", "r", "n"]);
        assert_eq!(
            rows[0],
            vec![
                ScalarValue::Text("ann".into()),
                ScalarValue::Integer(1),
                ScalarValue::Real(1.5),
                ScalarValue::Null,
            ]
        );
    }

    #[test]
    fn test_run_query_syntax_error() {
        let err = run_query(&memory_db(), "SELEC oops").unwrap_err();
        assert!(err.contains("syntax error"));
    }

    #[test]
    fn test_trailing_statement_rejected() {
        let conn = memory_db();
        let err =
            run_query(&conn, "SELECT name FROM employees; DROP TABLE employees").unwrap_err();
        assert_eq!(err, "You can only execute one statement at a time.");

        // Nothing ran, the table is still there.
        let schema = read_schema(&conn).unwrap();
        assert!(schema.columns("employees").is_some());
    }

    #[test]
    fn test_trailing_separators_and_comments_allowed() {
        let conn = memory_db();
        let (_, rows) =
            run_query(&conn, "SELECT COUNT(*) FROM employees; ;\n-- done\n").unwrap();
        assert_eq!(rows[0][0], ScalarValue::Integer(2));
    }

    #[tokio::test]
    async fn test_runaway_query_times_out() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("loop.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER);")
            .unwrap();

        let db = SqliteDatabase::new(&path, Duration::from_millis(200));
        let started = Instant::now();
        let err = db
            .query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                 SELECT count(*) FROM c",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AskError::ExecutionError(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));

        // The connection was released; the file is usable again.
        assert_eq!(db.schema().await.unwrap().len(), 1);
    }

    #[test]
    fn test_mutating_statement_executes() {
        let conn = memory_db();
        let (columns, rows) =
            run_query(&conn, "DELETE FROM employees WHERE dept = 'ops'").unwrap();
        assert!(columns.is_empty());
        assert!(rows.is_empty());

        let (_, rows) = run_query(&conn, "SELECT COUNT(*) FROM employees").unwrap();
        assert_eq!(rows[0][0], ScalarValue::Integer(1));
    }
}
