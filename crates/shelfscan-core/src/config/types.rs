//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Listening port (overridden by the PORT env var)
    pub port: u16,

    /// Maximum accepted request body in megabytes
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_mb: 20,
        }
    }
}

/// Which upstream API and response format to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStyle {
    /// Chat Completions with a `json_schema` response format
    #[default]
    ChatSchema,
    /// Responses API with a `json_schema` text format
    Responses,
    /// Chat Completions with a freeform `json_object` response format
    ChatJsonObject,
}

impl CallStyle {
    /// Parse a call style from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "chat_schema" | "chat" => Some(Self::ChatSchema),
            "responses" => Some(Self::Responses),
            "chat_json_object" | "json_object" => Some(Self::ChatJsonObject),
            _ => None,
        }
    }

    /// Whether the upstream enforces the inventory schema for this style.
    pub fn schema_enforced(&self) -> bool {
        !matches!(self, Self::ChatJsonObject)
    }
}

impl fmt::Display for CallStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChatSchema => "chat_schema",
            Self::Responses => "responses",
            Self::ChatJsonObject => "chat_json_object",
        };
        f.write_str(name)
    }
}

/// Upstream vision model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Call style used for every extraction
    pub style: CallStyle,

    /// API base URL (without the trailing endpoint path)
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Per-request timeout in milliseconds; unset leaves the HTTP client's
    /// default (no timeout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            style: CallStyle::default(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: None,
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

/// Temporary upload storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory where uploads live for the duration of one request
    pub dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
        }
    }
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Write one CSV file per successful analysis
    pub enabled: bool,

    /// Directory receiving the CSV files
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("exports"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
