//! Logging and tracing for pipeline runs.
//!
//! Span naming follows the OpenTelemetry semantic conventions where one
//! exists:
//! - Database calls: `db.system.name`, `db.operation.name`, `db.query.text`
//! - Model calls: `gen_ai.operation.name`, `gen_ai.request.model`
//!
//! Export over OTLP is available behind the `otel` cargo feature; without it
//! spans only reach the console subscriber.

pub mod init;
pub mod spans;

pub use init::{init_tracing, TelemetryGuard};
pub use spans::{
    db_query_span, db_schema_span, llm_span, pipeline_span, record_rows, stage_span,
    PipelineStage,
};
