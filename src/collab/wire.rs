//! JSON wire types shared with the collaborator services.
//!
//! Every response carries `status: "success" | "error"`; on error the cause is
//! in `error`. Responses are converted into typed values right here so no raw
//! JSON travels further into the pipeline.
//!
//! The database service serializes result frames with bare `NaN` and
//! `Infinity` tokens for missing numbers; [`null_non_finite`] rewrites them to
//! `null` before decoding.
//!
//! The request types also carry the boundary validation the services apply to
//! incoming requests (JSON content type, required fields), returned as a
//! typed [`Rejection`]. This client never serves those requests; the
//! validators are for service implementations sharing these wire types.

use crate::types::{ResultTable, ScalarValue, Schema, SchemaText};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Non-standard number tokens, longest first.
const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Replace bare `NaN`, `Infinity` and `-Infinity` outside string literals
/// with `null`. Bodies without them are returned unchanged.
pub fn null_non_finite(body: &str) -> Cow<'_, str> {
    if !NON_FINITE_TOKENS.iter().any(|token| body.contains(token)) {
        return Cow::Borrowed(body);
    }

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Cow::Owned(out)
}

/// Outcome marker present on every collaborator response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

fn failure_cause(status: Option<ResponseStatus>, error: Option<String>) -> String {
    match (status, error) {
        (_, Some(error)) => error,
        (Some(ResponseStatus::Error), None) => "Unknown error".to_string(),
        _ => "response missing status".to_string(),
    }
}

/// `GET /schema` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    #[serde(default)]
    pub status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaResponse {
    pub fn success(schema: &SchemaText) -> Self {
        Self {
            status: Some(ResponseStatus::Success),
            schema: Some(schema.as_str().to_string()),
            error: None,
        }
    }

    /// Parse the schema text into a [`Schema`], or return the failure cause.
    pub fn into_schema(self) -> std::result::Result<Schema, String> {
        match (self.status, self.schema) {
            (Some(ResponseStatus::Success), Some(text)) => Ok(SchemaText::new(text).parse()),
            (Some(ResponseStatus::Success), None) => {
                Err("success response without schema".to_string())
            }
            (status, _) => Err(failure_cause(status, self.error)),
        }
    }
}

/// `POST /query` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

/// `POST /query` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    /// Build a [`ResultTable`] from the row objects, ordered by `columns`.
    ///
    /// A key missing from a row object reads as null.
    pub fn into_table(self) -> std::result::Result<ResultTable, String> {
        if self.status != Some(ResponseStatus::Success) {
            return Err(failure_cause(self.status, self.error));
        }

        let columns = self
            .columns
            .ok_or_else(|| "success response without columns".to_string())?;
        let rows = self
            .result
            .unwrap_or_default()
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|c| object.get(c).map(ScalarValue::from).unwrap_or(ScalarValue::Null))
                    .collect()
            })
            .collect();

        ResultTable::new(columns, rows).map_err(|e| match e {
            crate::types::AskError::ExecutionError(msg) => msg,
            other => other.to_string(),
        })
    }
}

/// `POST /nl2sql` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nl2SqlRequest {
    pub question: String,
    pub schema: String,
}

/// `POST /nl2sql` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nl2SqlResponse {
    #[serde(default)]
    pub status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Nl2SqlResponse {
    pub fn into_sql(self) -> std::result::Result<String, String> {
        match (self.status, self.sql) {
            (Some(ResponseStatus::Success), Some(sql)) => Ok(sql),
            (Some(ResponseStatus::Success), None) => {
                Err("success response without sql".to_string())
            }
            (status, _) => Err(failure_cause(status, self.error)),
        }
    }
}

/// Error body the services return with a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Typed rejection of an incoming collaborator request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    #[serde(skip)]
    pub status: u16,
    pub error: String,
}

impl Rejection {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: 400,
            error: error.into(),
        }
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json"
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

fn json_object(
    content_type: Option<&str>,
    body: &[u8],
) -> std::result::Result<Map<String, Value>, Rejection> {
    if !is_json_content_type(content_type) {
        return Err(Rejection::bad_request("Request must be JSON"));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Rejection::bad_request("Request body must be a JSON object")),
        Err(e) => Err(Rejection::bad_request(format!("Invalid JSON: {}", e))),
    }
}

fn string_field(map: &Map<String, Value>, field: &str) -> Option<String> {
    map.get(field).and_then(Value::as_str).map(str::to_string)
}

impl Nl2SqlRequest {
    /// Validate an incoming `/nl2sql` request.
    pub fn from_http(
        content_type: Option<&str>,
        body: &[u8],
    ) -> std::result::Result<Self, Rejection> {
        let map = json_object(content_type, body)?;
        match (string_field(&map, "question"), string_field(&map, "schema")) {
            (Some(question), Some(schema)) => Ok(Self { question, schema }),
            _ => Err(Rejection::bad_request(
                "Missing required fields: question and schema",
            )),
        }
    }
}

impl QueryRequest {
    /// Validate an incoming `/query` request.
    pub fn from_http(
        content_type: Option<&str>,
        body: &[u8],
    ) -> std::result::Result<Self, Rejection> {
        let map = json_object(content_type, body)?;
        string_field(&map, "sql")
            .map(|sql| Self { sql })
            .ok_or_else(|| Rejection::bad_request("Missing required field: sql"))
    }
}
