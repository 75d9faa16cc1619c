//! Request input and the assembled response.

use crate::types::error::{AskError, Result};
use crate::types::schema::Schema;
use crate::types::table::{ChartSeries, ResultTable};
use serde::Serialize;
use std::fmt;

/// User-supplied natural-language question. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Question(String);

impl Question {
    /// # Errors
    ///
    /// Returns `AskError::InvalidQuestion` if the text is empty or whitespace.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AskError::InvalidQuestion(
                "question must not be empty".to_string(),
            ));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SQL produced by the synthesizer, already stripped of fence markers.
///
/// Untrusted: nothing checks it until the database tries to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneratedSql(String);

impl GeneratedSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneratedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the rendering layer needs for one page.
///
/// For a submitted question exactly one of {result + chart, error} is set.
/// The schema is always present, possibly empty.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsePayload {
    question: Option<String>,
    sql: Option<GeneratedSql>,
    result: Option<ResultTable>,
    chart: Option<ChartSeries>,
    schema: Schema,
    error: Option<String>,
}

impl ResponsePayload {
    /// Plain page view: schema only.
    pub fn view(schema: Schema) -> Self {
        Self {
            question: None,
            sql: None,
            result: None,
            chart: None,
            schema,
            error: None,
        }
    }

    pub fn answered(
        question: &Question,
        sql: GeneratedSql,
        result: ResultTable,
        chart: ChartSeries,
        schema: Schema,
    ) -> Self {
        Self {
            question: Some(question.as_str().to_string()),
            sql: Some(sql),
            result: Some(result),
            chart: Some(chart),
            schema,
            error: None,
        }
    }

    /// Failed request. `sql` is only kept when synthesis succeeded.
    pub fn failed(
        question: Option<String>,
        sql: Option<GeneratedSql>,
        error: &AskError,
        schema: Schema,
    ) -> Self {
        Self {
            question,
            sql,
            result: None,
            chart: None,
            schema,
            error: Some(error.to_string()),
        }
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn sql(&self) -> Option<&GeneratedSql> {
        self.sql.as_ref()
    }

    pub fn result(&self) -> Option<&ResultTable> {
        self.result.as_ref()
    }

    pub fn chart(&self) -> Option<&ChartSeries> {
        self.chart.as_ref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_question_rejected() {
        assert!(Question::new("").is_err());
        assert!(Question::new("   \n").is_err());
        assert_eq!(Question::new("how many?").unwrap().as_str(), "how many?");
    }

    #[test]
    fn test_failed_payload_has_no_result() {
        let err = AskError::execution("no such table: nonexistent");
        let payload = ResponsePayload::failed(Some("q".into()), None, &err, Schema::new());

        assert!(payload.is_error());
        assert!(payload.result().is_none());
        assert!(payload.chart().is_none());
        assert_eq!(
            payload.error(),
            Some("Error executing SQL: no such table: nonexistent")
        );
    }

    #[test]
    fn test_view_payload_serializes_nulls() {
        let json = serde_json::to_value(ResponsePayload::view(Schema::new())).unwrap();
        assert_eq!(json["schema"], serde_json::json!({}));
        assert!(json["error"].is_null());
        assert!(json["sql"].is_null());
    }
}
