//! Database collaborator: the trait the pipeline talks to and its backends.
//!
//! - [`HttpDatabase`]: the database service (`GET /schema`, `POST /query`)
//! - [`SqliteDatabase`]: a local SQLite file, opened per call

pub mod http;
pub mod sqlite;
pub mod wire;

pub use http::HttpDatabase;
pub use sqlite::SqliteDatabase;

use crate::types::{Result, ResultTable, Schema};
use async_trait::async_trait;

/// Relational database reachable by the pipeline.
///
/// Implementations acquire and release any connection within a single call.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Discover tables and their columns, in database order.
    ///
    /// # Errors
    ///
    /// Returns `AskError::SchemaUnavailable` if the database cannot be reached
    /// or reports a failure
    async fn schema(&self) -> Result<Schema>;

    /// Run one SQL statement and return its rows.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ExecutionError` for any failure, syntax errors included
    async fn query(&self, sql: &str) -> Result<ResultTable>;

    /// Backend name recorded as `db.system.name` on spans.
    fn system(&self) -> &'static str;
}
