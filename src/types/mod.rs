//! Core types for the question pipeline.

pub mod error;
pub mod payload;
pub mod schema;
pub mod table;

pub use error::{AskError, Result};
pub use payload::{GeneratedSql, Question, ResponsePayload};
pub use schema::{Schema, SchemaText, TableSchema};
pub use table::{ChartSeries, ResultTable, ScalarValue};
