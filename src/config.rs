//! Pipeline configuration.
//!
//! Built once at startup (file, then environment overrides) and handed to
//! the pipeline; components never read the environment themselves.

use crate::llm::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::types::{AskError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "http://localhost:5557";
pub const DEFAULT_LLM_URL: &str = "http://localhost:5556";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const CONFIG_FILES: [&str; 3] = ["config.json", "config.yaml", "config.yml"];

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum DatabaseConfig {
    /// Database service over HTTP
    Http { url: String },
    /// Local SQLite file
    Sqlite { path: PathBuf },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::Http {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

fn default_gemini_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_gemini_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Which language model turns questions into SQL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum LlmConfig {
    /// Language-model service over HTTP (`POST /nl2sql`)
    Nl2sql { url: String },
    /// Gemini API called directly
    Gemini {
        api_key: String,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default = "default_gemini_endpoint")]
        endpoint: String,
    },
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::Nl2sql {
            url: DEFAULT_LLM_URL.to_string(),
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nl2sql { url } => f.debug_struct("Nl2sql").field("url", url).finish(),
            Self::Gemini { model, endpoint, .. } => f
                .debug_struct("Gemini")
                .field("api_key", &"<redacted>")
                .field("model", model)
                .field("endpoint", endpoint)
                .finish(),
        }
    }
}

/// Logging output options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub json: bool,
    /// OTLP collector (used with the `otel` feature)
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// Bound on every collaborator call, in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Reject generated SQL that is not a plain query
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            read_only: false,
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Expand `~` and `$VAR` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(path),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Default config directory (~/.askql/).
    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| AskError::ConfigError("HOME not set".to_string()))?;
        Ok(PathBuf::from(home).join(".askql"))
    }

    /// First existing default config file, if any.
    pub fn default_file() -> Option<PathBuf> {
        let dir = Self::config_dir().ok()?;
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load configuration from a JSON or YAML file (chosen by extension).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let parsed = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|e| {
            AskError::ConfigError(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Load from an explicit path, else the default file, else defaults.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if an explicit path does not exist or
    /// any file fails to parse
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let path = expand_path(path);
                if !path.exists() {
                    return Err(AskError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_from(&path)
            }
            None => match Self::default_file() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup.
    ///
    /// - `ASKQL_DATABASE_URL`: database service URL
    /// - `ASKQL_SQLITE_PATH`: local SQLite file (wins over the URL)
    /// - `ASKQL_LLM_URL`: language-model service URL
    /// - `GEMINI_API_KEY`: key for the Gemini backend, when selected
    /// - `ASKQL_TIMEOUT_SECS`: request timeout
    /// - `ASKQL_READ_ONLY`: `1`/`true`/`yes` enables the read-only guard
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ASKQL_DATABASE_URL") {
            self.database = DatabaseConfig::Http { url };
        }
        if let Some(path) = lookup("ASKQL_SQLITE_PATH") {
            self.database = DatabaseConfig::Sqlite {
                path: expand_path(&path),
            };
        }
        if let Some(url) = lookup("ASKQL_LLM_URL") {
            self.llm = LlmConfig::Nl2sql { url };
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            if let LlmConfig::Gemini { api_key, .. } = &mut self.llm {
                *api_key = key;
            }
        }
        if let Some(secs) = lookup("ASKQL_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(flag) = lookup("ASKQL_READ_ONLY") {
            self.read_only = parse_bool(&flag);
        }
        if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.telemetry.otlp_endpoint = Some(endpoint);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(AskError::ConfigError(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        match &self.database {
            DatabaseConfig::Http { url } if url.trim().is_empty() => {
                return Err(AskError::ConfigError("database url is empty".to_string()));
            }
            DatabaseConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                return Err(AskError::ConfigError("sqlite path is empty".to_string()));
            }
            _ => {}
        }
        match &self.llm {
            LlmConfig::Nl2sql { url } if url.trim().is_empty() => {
                Err(AskError::ConfigError("language model url is empty".to_string()))
            }
            LlmConfig::Gemini { api_key, .. } if api_key.trim().is_empty() => Err(
                AskError::ConfigError("Gemini API key not set (GEMINI_API_KEY)".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
