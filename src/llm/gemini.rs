//! Direct Gemini `generateContent` backend.
//!
//! Sends the locally built prompt and returns the first candidate's text.

use crate::collab::http::{build_client, decode, transport_error};
use crate::llm::{LanguageModel, SynthesisRequest};
use crate::types::{AskError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const SERVICE: &str = "Gemini API";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Gemini model called with an API key.
pub struct GeminiModel {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl GeminiModel {
    /// Create new Gemini backend.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key
    /// * `model` - Model name (e.g., "gemini-2.5-flash")
    /// * `endpoint` - Models root URL
    /// * `timeout` - Bound on each request
    pub fn new(
        api_key: String,
        model: String,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, request: SynthesisRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(self.url())
            .header("X-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{
                    "parts": [{"text": request.prompt}]
                }]
            }))
            .send()
            .await
            .map_err(|e| AskError::synthesis(transport_error(SERVICE, &e)))?;

        let parsed: GenerateContentResponse = decode(response, SERVICE)
            .await
            .map_err(AskError::synthesis)?;

        parsed
            .first_text()
            .ok_or_else(|| AskError::synthesis("No response from Gemini"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let model = GeminiModel::new(
            "key".into(),
            DEFAULT_MODEL.into(),
            format!("{}/", DEFAULT_ENDPOINT),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            model.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_first_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "```sqlite\nSELECT 1\n```"}]}}]
        }))
        .unwrap();
        assert_eq!(response.first_text().unwrap(), "```sqlite\nSELECT 1\n```");

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.first_text().is_none());
    }
}
