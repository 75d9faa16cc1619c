//! Language-model collaborator and SQL synthesis.

pub mod gemini;
pub mod nl2sql;
pub mod synthesizer;

pub use gemini::GeminiModel;
pub use nl2sql::Nl2SqlService;
pub use synthesizer::{build_prompt, strip_fences, QuerySynthesizer};

use crate::types::Result;
use async_trait::async_trait;

/// Inputs for one SQL generation call.
///
/// `prompt` is the fully rendered prompt; backends that build their own
/// prompt server-side use `question` and `schema_text` instead.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub question: &'a str,
    pub schema_text: &'a str,
    pub prompt: &'a str,
}

/// Language model that turns a question into raw SQL text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the model's raw answer; fence markers may still be present.
    ///
    /// # Errors
    ///
    /// Returns `AskError::SynthesisError` on transport failure or a
    /// non-success response
    async fn generate(&self, request: SynthesisRequest<'_>) -> Result<String>;

    /// Model or service name recorded on spans.
    fn model(&self) -> &str;
}
