//! End-to-end pipeline scenarios against in-memory collaborators.

use askql::collab::{DatabaseService, HttpDatabase};
use askql::llm::{LanguageModel, SynthesisRequest};
use askql::{
    AskError, ExecutionPolicy, Pipeline, Question, Result, ResultTable, ScalarValue, Schema,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Database with a fixed schema and canned answers per SQL string.
struct FakeDatabase {
    schema: Option<Schema>,
    answers: HashMap<String, ResultTable>,
    executed: Mutex<Vec<String>>,
}

impl FakeDatabase {
    fn new(schema: Option<Schema>) -> Self {
        Self {
            schema,
            answers: HashMap::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    fn answer(mut self, sql: &str, table: ResultTable) -> Self {
        self.answers.insert(sql.to_string(), table);
        self
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseService for FakeDatabase {
    async fn schema(&self) -> Result<Schema> {
        self.schema
            .clone()
            .ok_or_else(|| AskError::schema("connection refused"))
    }

    async fn query(&self, sql: &str) -> Result<ResultTable> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.answers
            .get(sql)
            .cloned()
            .ok_or_else(|| AskError::execution("no such table: nonexistent"))
    }

    fn system(&self) -> &'static str {
        "fake"
    }
}

/// Model that always gives the same answer, or always fails.
struct FakeModel {
    answer: Option<String>,
    seen_schema: Mutex<Vec<String>>,
}

impl FakeModel {
    fn answering(sql: &str) -> Self {
        Self {
            answer: Some(sql.to_string()),
            seen_schema: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            seen_schema: Mutex::new(Vec::new()),
        }
    }

    fn seen_schema(&self) -> Vec<String> {
        self.seen_schema.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, request: SynthesisRequest<'_>) -> Result<String> {
        self.seen_schema
            .lock()
            .unwrap()
            .push(request.schema_text.to_string());
        self.answer
            .clone()
            .ok_or_else(|| AskError::synthesis("Gemini API error: 503 Service Unavailable"))
    }

    fn model(&self) -> &str {
        "fake"
    }
}

fn employees_schema() -> Schema {
    vec![(
        "employees",
        vec!["id".to_string(), "name".to_string(), "dept".to_string()],
    )]
    .into_iter()
    .collect()
}

fn count_table(n: i64) -> ResultTable {
    ResultTable::new(vec!["COUNT(*)".to_string()], vec![vec![ScalarValue::Integer(n)]]).unwrap()
}

fn question(text: &str) -> Option<Question> {
    Some(Question::new(text).unwrap())
}

#[tokio::test]
async fn test_happy_path() {
    let db = Arc::new(
        FakeDatabase::new(Some(employees_schema()))
            .answer("SELECT COUNT(*) FROM employees;", count_table(5)),
    );
    let model = Arc::new(FakeModel::answering(
        "```sqlite\nSELECT COUNT(*) FROM employees;\n```",
    ));
    let pipeline = Pipeline::new(db.clone(), model.clone(), ExecutionPolicy::default());

    let payload = pipeline
        .handle(question("how many employees are there"))
        .await
        .unwrap();

    assert!(payload.error().is_none());
    assert_eq!(payload.question(), Some("how many employees are there"));
    assert_eq!(payload.sql().unwrap().as_str(), "SELECT COUNT(*) FROM employees;");
    assert_eq!(
        payload.result().unwrap().get(0, "COUNT(*)"),
        Some(&ScalarValue::Integer(5))
    );

    let chart = payload.chart().unwrap();
    assert_eq!(chart.labels(), &["0".to_string()]);
    assert_eq!(chart.values(), &[5.0]);

    assert_eq!(payload.schema(), &employees_schema());
    assert_eq!(model.seen_schema(), vec!["Table: employees\n- id, name, dept"]);
    assert_eq!(db.executed(), vec!["SELECT COUNT(*) FROM employees;"]);
}

#[tokio::test]
async fn test_page_view_skips_synthesis() {
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())));
    let model = Arc::new(FakeModel::answering("SELECT 1"));
    let pipeline = Pipeline::new(db.clone(), model.clone(), ExecutionPolicy::default());

    let payload = pipeline.handle(None).await.unwrap();

    assert_eq!(payload.schema(), &employees_schema());
    assert!(payload.sql().is_none());
    assert!(payload.result().is_none());
    assert!(payload.chart().is_none());
    assert!(payload.error().is_none());
    assert!(model.seen_schema().is_empty());
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_schema_failure_still_synthesizes() {
    let db = Arc::new(FakeDatabase::new(None));
    let model = Arc::new(FakeModel::answering("SELECT COUNT(*) FROM employees;"));
    let pipeline = Pipeline::new(db.clone(), model.clone(), ExecutionPolicy::default());

    let payload = pipeline
        .handle(question("how many employees are there"))
        .await
        .unwrap();

    assert!(payload.schema().is_empty());
    assert_eq!(model.seen_schema(), vec![String::new()]);
    assert_eq!(db.executed().len(), 1);
    assert!(payload.error().unwrap().starts_with("Error executing SQL: "));
    assert!(payload.result().is_none());
    assert!(payload.chart().is_none());
}

#[tokio::test]
async fn test_unreachable_database_service() {
    let db = Arc::new(HttpDatabase::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap());
    let model = Arc::new(FakeModel::answering("SELECT COUNT(*) FROM employees;"));
    let pipeline = Pipeline::new(db, model.clone(), ExecutionPolicy::default());

    let payload = pipeline
        .handle(question("how many employees are there"))
        .await
        .unwrap();

    assert!(payload.schema().is_empty());
    assert_eq!(model.seen_schema(), vec![String::new()]);
    assert!(payload.error().unwrap().starts_with("Error executing SQL: "));
    assert!(payload.result().is_none());
}

#[tokio::test]
async fn test_malformed_sql() {
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())));
    let model = Arc::new(FakeModel::answering("SELECT * FROM nonexistent;"));
    let pipeline = Pipeline::new(db, model, ExecutionPolicy::default());

    let payload = pipeline.handle(question("show everything")).await.unwrap();

    assert_eq!(
        payload.error(),
        Some("Error executing SQL: no such table: nonexistent")
    );
    assert!(payload.result().is_none());
    assert!(payload.chart().is_none());
    assert_eq!(payload.sql().unwrap().as_str(), "SELECT * FROM nonexistent;");
}

#[tokio::test]
async fn test_synthesis_failure_hides_sql() {
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())));
    let model = Arc::new(FakeModel::failing());
    let pipeline = Pipeline::new(db.clone(), model, ExecutionPolicy::default());

    let payload = pipeline.handle(question("how many employees")).await.unwrap();

    assert_eq!(
        payload.error(),
        Some("Error converting to SQL: Gemini API error: 503 Service Unavailable")
    );
    assert!(payload.sql().is_none());
    assert!(payload.result().is_none());
    assert_eq!(payload.schema(), &employees_schema());
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_fence_only_answer_is_synthesis_error() {
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())));
    let model = Arc::new(FakeModel::answering("```sqlite\n```"));
    let pipeline = Pipeline::new(db.clone(), model, ExecutionPolicy::default());

    let payload = pipeline.handle(question("anything")).await.unwrap();

    assert!(payload.error().unwrap().starts_with("Error converting to SQL: "));
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_read_only_policy_blocks_mutation() {
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())));
    let model = Arc::new(FakeModel::answering("DELETE FROM employees"));
    let pipeline = Pipeline::new(db.clone(), model, ExecutionPolicy { read_only: true });

    let payload = pipeline.handle(question("remove everyone")).await.unwrap();

    assert!(payload
        .error()
        .unwrap()
        .contains("read-only mode rejects statement"));
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_blank_form_input() {
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())));
    let model = Arc::new(FakeModel::answering("SELECT 1"));
    let pipeline = Pipeline::new(db, model.clone(), ExecutionPolicy::default());

    let payload = pipeline.handle_form(Some("   ")).await.unwrap();
    assert!(payload.error().unwrap().contains("question must not be empty"));
    assert_eq!(payload.schema(), &employees_schema());
    assert!(model.seen_schema().is_empty());

    let payload = pipeline.handle_form(None).await.unwrap();
    assert!(payload.error().is_none());
}

#[tokio::test]
async fn test_grouped_chart() {
    let table = ResultTable::new(
        vec!["dept".to_string(), "salary".to_string()],
        vec![
            vec![ScalarValue::Text("eng".into()), ScalarValue::Integer(100)],
            vec![ScalarValue::Text("ops".into()), ScalarValue::Integer(50)],
            vec![ScalarValue::Text("eng".into()), ScalarValue::Integer(120)],
        ],
    )
    .unwrap();
    let sql = "SELECT dept, salary FROM employees";
    let db = Arc::new(FakeDatabase::new(Some(employees_schema())).answer(sql, table));
    let model = Arc::new(FakeModel::answering(sql));
    let pipeline = Pipeline::new(db, model, ExecutionPolicy::default());

    let payload = pipeline.handle(question("salaries by dept")).await.unwrap();
    let chart = payload.chart().unwrap();

    assert_eq!(chart.labels(), &["eng".to_string(), "ops".to_string()]);
    assert_eq!(chart.values(), &[220.0, 50.0]);
}

#[tokio::test]
async fn test_payload_json_shape() {
    let db = Arc::new(
        FakeDatabase::new(Some(employees_schema()))
            .answer("SELECT COUNT(*) FROM employees;", count_table(5)),
    );
    let model = Arc::new(FakeModel::answering("SELECT COUNT(*) FROM employees;"));
    let pipeline = Pipeline::new(db, model, ExecutionPolicy::default());

    let payload = pipeline.handle(question("how many")).await.unwrap();
    let json = serde_json::to_value(&payload).unwrap();

    assert_eq!(json["sql"], "SELECT COUNT(*) FROM employees;");
    assert_eq!(json["result"]["rows"][0]["COUNT(*)"], 5);
    assert_eq!(json["chart"]["labels"][0], "0");
    assert_eq!(json["schema"]["employees"][1], "name");
    assert!(json["error"].is_null());
}
