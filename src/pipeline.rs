//! Per-question orchestration.
//!
//! introspect → synthesize → execute → reduce, strictly in order, no retries.
//! Synthesis and execution failures end the run with an error payload; a
//! schema failure only empties the schema.

use crate::chart::reduce;
use crate::collab::{DatabaseService, HttpDatabase, SqliteDatabase};
use crate::config::{Config, DatabaseConfig, LlmConfig};
use crate::executor::{ExecutionPolicy, QueryExecutor};
use crate::introspect::SchemaIntrospector;
use crate::llm::{GeminiModel, LanguageModel, Nl2SqlService, QuerySynthesizer};
use crate::telemetry::{pipeline_span, stage_span, PipelineStage};
use crate::types::{AskError, GeneratedSql, Question, ResponsePayload, Result, Schema};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument, Span};
use uuid::Uuid;

/// The question pipeline. Holds no per-request state, so one instance can
/// serve concurrent requests.
pub struct Pipeline {
    introspector: SchemaIntrospector,
    synthesizer: QuerySynthesizer,
    executor: QueryExecutor,
}

impl Pipeline {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        model: Arc<dyn LanguageModel>,
        policy: ExecutionPolicy,
    ) -> Self {
        Self {
            introspector: SchemaIntrospector::new(db.clone()),
            synthesizer: QuerySynthesizer::new(model),
            executor: QueryExecutor::new(db, policy),
        }
    }

    /// Build the collaborators named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if the configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let timeout = config.timeout();

        let db: Arc<dyn DatabaseService> = match &config.database {
            DatabaseConfig::Http { url } => Arc::new(HttpDatabase::new(url.as_str(), timeout)?),
            DatabaseConfig::Sqlite { path } => Arc::new(SqliteDatabase::new(path.clone(), timeout)),
        };

        let model: Arc<dyn LanguageModel> = match &config.llm {
            LlmConfig::Nl2sql { url } => Arc::new(Nl2SqlService::new(url.as_str(), timeout)?),
            LlmConfig::Gemini {
                api_key,
                model,
                endpoint,
            } => Arc::new(GeminiModel::new(
                api_key.clone(),
                model.clone(),
                endpoint.clone(),
                timeout,
            )?),
        };

        let policy = ExecutionPolicy {
            read_only: config.read_only,
        };

        Ok(Self::new(db, model, policy))
    }

    pub fn introspector(&self) -> &SchemaIntrospector {
        &self.introspector
    }

    /// Answer one request.
    ///
    /// `None` is a plain page view: only the schema is returned.
    ///
    /// # Errors
    ///
    /// Only `AskError::ReductionError` escapes; every collaborator failure is
    /// reported inside the payload instead.
    pub async fn handle(&self, question: Option<Question>) -> Result<ResponsePayload> {
        let request_id = Uuid::new_v4();
        self.run(question)
            .instrument(pipeline_span(&request_id))
            .await
    }

    /// Answer raw form input: `None` is a page view, blank text is an error.
    pub async fn handle_form(&self, raw: Option<&str>) -> Result<ResponsePayload> {
        match raw.map(Question::new).transpose() {
            Ok(question) => self.handle(question).await,
            Err(e) => {
                let schema = self.introspector.fetch_schema().await;
                Ok(ResponsePayload::failed(raw.map(str::to_string), None, &e, schema))
            }
        }
    }

    async fn run(&self, question: Option<Question>) -> Result<ResponsePayload> {
        let schema = self
            .introspector
            .fetch_schema()
            .instrument(stage_span(PipelineStage::Introspect))
            .await;

        let Some(question) = question else {
            Span::current().record("outcome", "view");
            return Ok(ResponsePayload::view(schema));
        };

        let schema_text = schema.to_text();
        let sql = match self
            .synthesizer
            .synthesize(&question, &schema_text)
            .instrument(stage_span(PipelineStage::Synthesize))
            .await
        {
            Ok(sql) => sql,
            Err(e) => return Ok(Self::fail(&question, None, e, schema)),
        };

        let table = match self
            .executor
            .execute(&sql)
            .instrument(stage_span(PipelineStage::Execute))
            .await
        {
            Ok(table) => table,
            Err(e) => return Ok(Self::fail(&question, Some(sql), e, schema)),
        };

        let chart = stage_span(PipelineStage::Reduce)
            .in_scope(|| reduce(&table))
            .map_err(|e| {
                error!(error = %e, "reduction failed");
                Span::current().record("outcome", e.kind());
                e
            })?;

        Span::current().record("outcome", "answered");
        info!(rows = table.row_count(), points = chart.len(), "question answered");
        Ok(ResponsePayload::answered(&question, sql, table, chart, schema))
    }

    fn fail(
        question: &Question,
        sql: Option<GeneratedSql>,
        err: AskError,
        schema: Schema,
    ) -> ResponsePayload {
        warn!(kind = err.kind(), error = %err, "question failed");
        Span::current().record("outcome", err.kind());
        ResponsePayload::failed(Some(question.as_str().to_string()), sql, &err, schema)
    }
}
