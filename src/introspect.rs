//! Schema discovery.

use crate::collab::DatabaseService;
use crate::telemetry::db_schema_span;
use crate::types::{AskError, Result, Schema};
use std::sync::Arc;
use tracing::{debug, warn, Instrument, Span};

/// Reads the live schema from the database on every call; nothing is cached.
pub struct SchemaIntrospector {
    db: Arc<dyn DatabaseService>,
}

impl SchemaIntrospector {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Fetch the schema, surfacing failures.
    ///
    /// # Errors
    ///
    /// Returns `AskError::SchemaUnavailable` if the database is unreachable or
    /// reports an error
    pub async fn try_fetch_schema(&self) -> Result<Schema> {
        async {
            let schema = self.db.schema().await.map_err(|e| match e {
                AskError::SchemaUnavailable(_) => e,
                other => AskError::schema(other.to_string()),
            })?;
            Span::current().record("db.collection.count", schema.len() as u64);
            debug!(tables = schema.len(), "schema fetched");
            Ok::<_, AskError>(schema)
        }
        .instrument(db_schema_span(self.db.system()))
        .await
    }

    /// Fetch the schema, degrading to an empty one on failure.
    ///
    /// A page must still render when the database is down, so the failure is
    /// only logged.
    pub async fn fetch_schema(&self) -> Schema {
        match self.try_fetch_schema().await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(error = %e, "schema unavailable, continuing with empty schema");
                Schema::new()
            }
        }
    }
}
