//! Natural language to SQL synthesis.

use crate::llm::{LanguageModel, SynthesisRequest};
use crate::telemetry::llm_span;
use crate::types::{AskError, GeneratedSql, Question, Result, SchemaText};
use std::sync::Arc;
use tracing::{debug, Instrument};

const FENCE: &str = "```";

/// Language tags accepted on an opening fence. Longest first.
const FENCE_TAGS: [&str; 2] = ["sqlite", "sql"];

/// Render the prompt sent to the language model.
///
/// Deterministic: the same question and schema always produce the same text.
pub fn build_prompt(question: &str, schema_text: &str) -> String {
    format!(
        "You are a SQL expert working with the following SQLite schema:\n\n\
         {}\n\n\
         Convert the following natural language question to an SQLite query:\n\n\
         Question: {}\n\n\
         SQL:",
        schema_text, question
    )
}

fn strip_opener(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    for tag in FENCE_TAGS {
        let matches_tag = rest
            .get(..tag.len())
            .map(|head| head.eq_ignore_ascii_case(tag))
            .unwrap_or(false);
        if matches_tag {
            let after = &rest[tag.len()..];
            if after.is_empty()
                || after.starts_with(char::is_whitespace)
                || after.starts_with(FENCE)
            {
                return Some(after);
            }
        }
    }
    Some(rest)
}

/// Remove Markdown code fences wrapped around a model answer.
///
/// Trims, drops a leading fence (bare or tagged `sqlite`/`sql`) and a
/// trailing bare fence, and repeats until nothing changes, so applying it
/// twice gives the same result as applying it once.
///
/// # Examples
///
/// - "```sqlite\nSELECT 1;\n```" → "SELECT 1;"
/// - "  SELECT 1;  " → "SELECT 1;"
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    loop {
        let mut next = text;
        if let Some(rest) = strip_opener(next) {
            next = rest.trim();
        }
        if let Some(rest) = next.strip_suffix(FENCE) {
            next = rest.trim();
        }
        if next.len() == text.len() {
            return next.to_string();
        }
        text = next;
    }
}

/// Turns a question plus schema text into a single SQL statement.
pub struct QuerySynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Generate SQL for `question` against `schema_text`.
    ///
    /// # Errors
    ///
    /// Returns `AskError::SynthesisError` if the model call fails or the
    /// answer is empty once fences are removed
    pub async fn synthesize(
        &self,
        question: &Question,
        schema_text: &SchemaText,
    ) -> Result<GeneratedSql> {
        let prompt = build_prompt(question.as_str(), schema_text.as_str());
        let request = SynthesisRequest {
            question: question.as_str(),
            schema_text: schema_text.as_str(),
            prompt: &prompt,
        };

        let raw = self
            .model
            .generate(request)
            .instrument(llm_span(self.model.model()))
            .await
            .map_err(|e| match e {
                AskError::SynthesisError(_) => e,
                other => AskError::synthesis(other.to_string()),
            })?;

        let sql = strip_fences(&raw);
        if sql.is_empty() {
            return Err(AskError::synthesis("language model returned no SQL"));
        }

        debug!(sql = %sql, "synthesized query");
        Ok(GeneratedSql::new(sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("how many employees are there", "Table: employees\n- id, name");

        assert!(prompt
            .starts_with("You are a SQL expert working with the following SQLite schema:"));
        assert!(prompt.contains("\n\nTable: employees\n- id, name\n\n"));
        assert!(prompt.contains("Question: how many employees are there"));
        assert!(prompt.ends_with("SQL:"));
    }

    #[test]
    fn test_strip_tagged_fence() {
        assert_eq!(
            strip_fences("```sqlite\nSELECT COUNT(*) FROM employees;\n```"),
            "SELECT COUNT(*) FROM employees;"
        );
        assert_eq!(strip_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_fences("```SQL SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_fences("SELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_strip_leaves_plain_sql() {
        assert_eq!(strip_fences("  SELECT name FROM t;\n"), "SELECT name FROM t;");
        // "sqlx" is not a fence tag; only the fence goes.
        assert_eq!(strip_fences("```sqlx\nSELECT 1```"), "sqlx\nSELECT 1");
    }

    #[test]
    fn test_strip_nested_fences() {
        let once = strip_fences("```sqlite```sqlite SELECT 1```");
        assert_eq!(once, "SELECT 1");
        assert_eq!(strip_fences(&once), once);
    }

    #[test]
    fn test_strip_only_fences() {
        assert_eq!(strip_fences("```"), "");
        assert_eq!(strip_fences("```sqlite\n```"), "");
    }

    #[test]
    fn test_strip_multibyte_after_fence() {
        assert_eq!(strip_fences("```é"), "é");
    }
}
