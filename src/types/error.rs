//! Error types for the question pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AskError>;

/// Failure kinds raised at each pipeline boundary.
///
/// The `Display` output of the stage errors is the message shown to the user,
/// so it never includes more than one cause string.
#[derive(Error, Debug)]
pub enum AskError {
    /// Schema introspection failed (degraded to an empty schema by the introspector)
    #[error("Error getting schema: {0}")]
    SchemaUnavailable(String),

    /// Language model unreachable or rejected the request
    #[error("Error converting to SQL: {0}")]
    SynthesisError(String),

    /// Database rejected or failed the generated SQL
    #[error("Error executing SQL: {0}")]
    ExecutionError(String),

    /// Result table had a shape the reducer cannot chart
    #[error("Error reducing result: {0}")]
    ReductionError(String),

    /// Question was empty
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AskError {
    /// Create a synthesis error with context.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::SynthesisError(msg.into())
    }

    /// Create an execution error with context.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a schema error with context.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaUnavailable(msg.into())
    }

    /// Short machine-readable name of the failure kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaUnavailable(_) => "schema_unavailable",
            Self::SynthesisError(_) => "synthesis",
            Self::ExecutionError(_) => "execution",
            Self::ReductionError(_) => "reduction",
            Self::InvalidQuestion(_) => "invalid_question",
            Self::ConfigError(_) => "config",
            Self::IoError(_) => "io",
            Self::JsonError(_) => "json",
        }
    }
}
