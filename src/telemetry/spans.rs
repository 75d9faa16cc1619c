//! Span constructors for pipeline stages and collaborator calls.

use tracing::field::Empty;
use tracing::{span, Level, Span};
use uuid::Uuid;

/// Pipeline stage (maps to the `stage` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Introspect,
    Synthesize,
    Execute,
    Reduce,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introspect => "introspect",
            Self::Synthesize => "synthesize",
            Self::Execute => "execute",
            Self::Reduce => "reduce",
        }
    }
}

/// Root span of one question.
///
/// `outcome` is recorded when the run finishes: `view`, `answered` or the
/// failing error kind.
pub fn pipeline_span(request_id: &Uuid) -> Span {
    span!(
        Level::INFO,
        "pipeline",
        otel.name = "ask",
        request.id = %request_id,
        outcome = Empty,
    )
}

pub fn stage_span(stage: PipelineStage) -> Span {
    span!(
        Level::INFO,
        "stage",
        otel.name = stage.as_str(),
        stage = stage.as_str(),
    )
}

/// Span around a schema lookup.
pub fn db_schema_span(system: &str) -> Span {
    span!(
        Level::INFO,
        "db.schema",
        otel.name = "schema",
        otel.kind = "client",
        db.system.name = system,
        db.operation.name = "schema",
        db.collection.count = Empty,
    )
}

/// Span around a query execution.
///
/// # Example
///
/// ```rust,ignore
/// let span = db_query_span("sqlite", "SELECT COUNT(*) FROM employees");
/// let table = db.query(sql).instrument(span).await?;
/// ```
pub fn db_query_span(system: &str, query_text: &str) -> Span {
    span!(
        Level::INFO,
        "db.query",
        otel.name = "query",
        otel.kind = "client",
        db.system.name = system,
        db.operation.name = "query",
        db.query.text = query_text,
        db.response.returned_rows = Empty,
    )
}

pub fn llm_span(model: &str) -> Span {
    span!(
        Level::INFO,
        "llm.generate",
        otel.name = "generate_sql",
        otel.kind = "client",
        gen_ai.operation.name = "generate_sql",
        gen_ai.request.model = model,
    )
}

/// Record the returned row count on the current `db.query` span.
pub fn record_rows(rows: usize) {
    Span::current().record("db.response.returned_rows", rows as u64);
}
