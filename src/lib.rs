//! askql - natural-language questions over a relational database.
//!
//! The pipeline behind a single question:
//! - Schema discovery from the database collaborator
//! - SQL synthesis through a language model
//! - Query execution against the database collaborator
//! - Reduction of the result table into a chart series
//!
//! Collaborators are reached through the [`collab::DatabaseService`] and
//! [`llm::LanguageModel`] traits, so the same pipeline runs against the HTTP
//! services, the embedded SQLite backend, or in-memory fakes in tests.

pub mod chart;
pub mod collab;
pub mod config;
pub mod executor;
pub mod introspect;
pub mod llm;
pub mod pipeline;
pub mod telemetry;
pub mod types;

pub use chart::reduce;
pub use config::Config;
pub use executor::{ExecutionPolicy, QueryExecutor};
pub use introspect::SchemaIntrospector;
pub use llm::QuerySynthesizer;
pub use pipeline::Pipeline;
pub use types::{
    AskError, ChartSeries, GeneratedSql, Question, ResponsePayload, Result, ResultTable,
    ScalarValue, Schema, SchemaText,
};
