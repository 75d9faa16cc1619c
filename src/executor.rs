//! Query execution.

use crate::collab::DatabaseService;
use crate::telemetry::{db_query_span, record_rows};
use crate::types::{AskError, GeneratedSql, Result, ResultTable};
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use std::sync::Arc;
use tracing::{debug, Instrument};

/// Restrictions applied before SQL reaches the database.
///
/// The default imposes none: a generated `DELETE` or `DROP` runs as written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Reject anything that does not parse as a query.
    pub read_only: bool,
}

/// Check that `sql` consists only of query statements.
///
/// # Errors
///
/// Returns `AskError::ExecutionError` if the SQL does not parse or contains a
/// non-query statement
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql).map_err(|e| {
        AskError::execution(format!("cannot verify statement is read-only: {}", e))
    })?;

    if statements.is_empty() {
        return Err(AskError::execution("no statement to execute"));
    }

    match statements.iter().find(|s| !matches!(s, Statement::Query(_))) {
        Some(statement) => Err(AskError::execution(format!(
            "read-only mode rejects statement: {}",
            statement
        ))),
        None => Ok(()),
    }
}

/// Runs generated SQL against the database.
pub struct QueryExecutor {
    db: Arc<dyn DatabaseService>,
    policy: ExecutionPolicy,
}

impl QueryExecutor {
    pub fn new(db: Arc<dyn DatabaseService>, policy: ExecutionPolicy) -> Self {
        Self { db, policy }
    }

    /// Execute `sql` and return its rows.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ExecutionError` for any database failure, syntax
    /// errors included, or a read-only violation when the policy asks for it
    pub async fn execute(&self, sql: &GeneratedSql) -> Result<ResultTable> {
        if self.policy.read_only {
            ensure_read_only(sql.as_str())?;
        }

        async {
            let table = self.db.query(sql.as_str()).await.map_err(|e| match e {
                AskError::ExecutionError(_) => e,
                other => AskError::execution(other.to_string()),
            })?;
            record_rows(table.row_count());
            debug!(rows = table.row_count(), columns = table.columns().len(), "query executed");
            Ok::<_, AskError>(table)
        }
        .instrument(db_query_span(self.db.system(), sql.as_str()))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_accepts_queries() {
        assert!(ensure_read_only("SELECT COUNT(*) FROM employees;").is_ok());
        assert!(ensure_read_only("WITH d AS (SELECT dept FROM employees) SELECT * FROM d").is_ok());
    }

    #[test]
    fn test_read_only_rejects_mutations() {
        let err = ensure_read_only("DELETE FROM employees").unwrap_err();
        assert!(err.to_string().contains("read-only mode rejects statement"));

        assert!(ensure_read_only("SELECT 1; DROP TABLE employees").is_err());
    }

    #[test]
    fn test_read_only_rejects_unparseable() {
        let err = ensure_read_only("SELEC oops").unwrap_err();
        assert!(matches!(err, AskError::ExecutionError(_)));
    }
}
