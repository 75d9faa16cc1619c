//! Client for the language-model service (`POST /nl2sql`).
//!
//! The service builds its own prompt from the question and schema text, so
//! only those two fields travel over the wire.

use crate::collab::http::{build_client, decode, transport_error};
use crate::collab::wire::{Nl2SqlRequest, Nl2SqlResponse};
use crate::llm::{LanguageModel, SynthesisRequest};
use crate::types::{AskError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const SERVICE: &str = "language model service";

/// Language-model service client.
pub struct Nl2SqlService {
    base_url: String,
    client: Client,
}

impl Nl2SqlService {
    /// Create new client for the service at `base_url` (e.g. `http://localhost:5556`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl LanguageModel for Nl2SqlService {
    async fn generate(&self, request: SynthesisRequest<'_>) -> Result<String> {
        let body = Nl2SqlRequest {
            question: request.question.to_string(),
            schema: request.schema_text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/nl2sql", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AskError::synthesis(transport_error(SERVICE, &e)))?;

        let parsed: Nl2SqlResponse = decode(response, SERVICE)
            .await
            .map_err(AskError::synthesis)?;

        parsed.into_sql().map_err(AskError::synthesis)
    }

    fn model(&self) -> &str {
        "nl2sql"
    }
}
