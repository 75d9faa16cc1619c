//! HTTP client for the database service.

use crate::collab::wire::{
    null_non_finite, ErrorBody, QueryRequest, QueryResponse, SchemaResponse,
};
use crate::collab::DatabaseService;
use crate::types::{AskError, Result, ResultTable, Schema};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build a client whose every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AskError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Describe a transport failure, calling out timeouts explicitly.
pub(crate) fn transport_error(service: &str, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("{} request timed out: {}", service, err)
    } else if err.is_connect() {
        format!("{} unreachable: {}", service, err)
    } else {
        format!("{} request failed: {}", service, err)
    }
}

/// Read a JSON response body, turning non-2xx statuses into their error text.
///
/// Bare `NaN`/`Infinity` number tokens decode as null.
pub(crate) async fn decode<T: DeserializeOwned>(
    response: Response,
    service: &str,
) -> std::result::Result<T, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("Failed to read {} response: {}", service, e))?;

    if !status.is_success() {
        let cause = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(format!("{} error {}: {}", service, status, cause));
    }

    serde_json::from_str(&null_non_finite(&body))
        .map_err(|e| format!("Failed to parse {} response: {}", service, e))
}

/// Database service client.
pub struct HttpDatabase {
    base_url: String,
    client: Client,
}

impl HttpDatabase {
    /// Create new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. `http://localhost:5557`
    /// * `timeout` - Bound on each request
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DatabaseService for HttpDatabase {
    async fn schema(&self) -> Result<Schema> {
        let response = self
            .client
            .get(format!("{}/schema", self.base_url))
            .send()
            .await
            .map_err(|e| AskError::schema(transport_error("database service", &e)))?;

        let parsed: SchemaResponse = decode(response, "database service")
            .await
            .map_err(AskError::schema)?;

        parsed.into_schema().map_err(AskError::schema)
    }

    async fn query(&self, sql: &str) -> Result<ResultTable> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&QueryRequest {
                sql: sql.to_string(),
            })
            .send()
            .await
            .map_err(|e| AskError::execution(transport_error("database service", &e)))?;

        let parsed: QueryResponse = decode(response, "database service")
            .await
            .map_err(AskError::execution)?;

        parsed.into_table().map_err(AskError::execution)
    }

    fn system(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let db = HttpDatabase::new("http://localhost:5557/", Duration::from_secs(1)).unwrap();
        assert_eq!(db.base_url(), "http://localhost:5557");
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Port 1 is never served; connection is refused immediately.
        let db = HttpDatabase::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();

        let err = db.schema().await.unwrap_err();
        assert!(matches!(err, AskError::SchemaUnavailable(_)));

        let err = db.query("SELECT 1").await.unwrap_err();
        assert!(matches!(err, AskError::ExecutionError(_)));
    }
}
