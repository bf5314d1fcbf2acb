//! Vision provider trait and request/response types.
//!
//! Defines the interface that every upstream call style implements, plus the
//! factory that creates the right provider from config.

use super::envelope::UpstreamResponse;
use crate::config::{CallStyle, LlmConfig};
use crate::error::UpstreamError;
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;

/// Name of the JSON schema sent to schema-enforcing call styles.
pub const INVENTORY_SCHEMA_NAME: &str = "inventory_schema";

const SYSTEM_PROMPT: &str = "You are an expert in visual stock-taking for retail stores.";

const INVENTORY_PROMPT: &str = "\
You receive a photo of a store shelf (wide view).

Goal:
- Identify the main products visible.
- For each kind of product, return:
  - \"label\": product name or short description in plain words.
  - \"brand\": brand if visible (otherwise an empty string).
  - \"estimated_quantity\": estimated number of visible units (integer, even if approximate).
  - \"position\": position on the shelf (e.g. \"top left\", \"middle center\", \"bottom right\").
  - \"confidence\": confidence between 0 and 1 (e.g. 0.82).

Answer STRICTLY with this JSON format:
{
  \"inventory\": [
    {
      \"label\": \"...\",
      \"brand\": \"...\",
      \"estimated_quantity\": 0,
      \"position\": \"...\",
      \"confidence\": 0.0
    }
  ]
}
No text outside the JSON.";

/// Base64-encoded image ready to send to a model API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
    /// Size of the original bytes, for logging
    pub size_bytes: usize,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and a content type or format name.
    ///
    /// Accepts either a MIME type ("image/png") or a bare format ("png").
    pub fn from_bytes(bytes: &[u8], content_type: &str) -> Self {
        let format = content_type
            .trim()
            .to_lowercase()
            .trim_start_matches("image/")
            .to_string();
        let media_type = match format.as_str() {
            "jpeg" | "jpg" | "pjpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image type '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
            size_bytes: bytes.len(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to extract an inventory from one image.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// The shelf photo
    pub image: ImageInput,
    /// System message setting the model's role
    pub system_prompt: String,
    /// Task prompt sent alongside the image
    pub prompt: String,
    /// JSON schema describing the expected answer
    pub schema: Value,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ExtractionRequest {
    /// Build the shelf inventory request for an image.
    pub fn inventory(image: ImageInput, config: &LlmConfig) -> Self {
        Self {
            image,
            system_prompt: SYSTEM_PROMPT.to_string(),
            prompt: INVENTORY_PROMPT.to_string(),
            schema: inventory_schema(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// JSON schema of the `{"inventory": [...]}` answer.
pub fn inventory_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "inventory": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "brand": { "type": "string" },
                        "estimated_quantity": { "type": "integer" },
                        "position": { "type": "string" },
                        "confidence": { "type": "number" }
                    },
                    "required": ["label", "brand", "estimated_quantity", "position", "confidence"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["inventory"],
        "additionalProperties": false
    })
}

/// The raw reply of one upstream call, already classified by envelope shape.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    /// Classified envelope
    pub response: UpstreamResponse,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that every upstream call style implements.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn VisionProvider>` for dynamic dispatch).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai-chat").
    fn name(&self) -> &str;

    /// Check whether the provider is configured.
    async fn is_available(&self) -> bool;

    /// Send the image once and return the classified envelope.
    async fn extract(&self, request: &ExtractionRequest) -> Result<UpstreamReply, UpstreamError>;

    /// Per-request timeout, if one is configured.
    fn timeout(&self) -> Option<Duration>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the provider matching the configured call style.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the provider for `config.style`.
    ///
    /// A missing API key is not an error here: the service still starts and
    /// every extraction fails with [`UpstreamError::MissingApiKey`].
    pub fn create(config: &LlmConfig) -> Box<dyn VisionProvider> {
        let api_key = resolve_env_var(&config.api_key);
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; /analyze will fail until it is configured");
        }
        let timeout = config.timeout_ms.map(Duration::from_millis);

        match config.style {
            CallStyle::ChatSchema | CallStyle::ChatJsonObject => {
                Box::new(super::openai::ChatProvider::new(
                    &config.endpoint,
                    api_key,
                    &config.model,
                    config.style,
                    timeout,
                ))
            }
            CallStyle::Responses => Box::new(super::responses::ResponsesProvider::new(
                &config.endpoint,
                api_key,
                &config.model,
                timeout,
            )),
        }
    }
}
