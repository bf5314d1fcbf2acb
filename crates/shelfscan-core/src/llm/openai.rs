//! OpenAI provider using the Chat Completions API.
//!
//! Sends the image via data URL in the user message content array and asks
//! for either a schema-constrained answer (`json_schema`) or a freeform JSON
//! object (`json_object`).

use super::envelope::UpstreamResponse;
use super::provider::{ExtractionRequest, UpstreamReply, VisionProvider, INVENTORY_SCHEMA_NAME};
use crate::config::CallStyle;
use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Chat Completions provider, in schema or json-object mode.
pub struct ChatProvider {
    api_key: Option<String>,
    model: String,
    style: CallStyle,
    client: reqwest::Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl ChatProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        style: CallStyle,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            api_key,
            model: model.to_string(),
            style,
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    fn body(&self, request: &ExtractionRequest) -> ChatRequest {
        let response_format = if self.style.schema_enforced() {
            ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: INVENTORY_SCHEMA_NAME.to_string(),
                    schema: request.schema.clone(),
                    strict: true,
                },
            }
        } else {
            ResponseFormat::JsonObject
        };

        ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(request.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Parts(vec![
                        ChatContent::Text {
                            text: request.prompt.clone(),
                        },
                        ChatContent::ImageUrl {
                            image_url: ImageUrl {
                                url: request.image.data_url(),
                            },
                        },
                    ]),
                },
            ],
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ChatContent>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonSchema { json_schema: JsonSchemaFormat },
    JsonObject,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: Value,
    strict: bool,
}

/// POST a JSON body and return the decoded JSON answer.
///
/// Transport failures, non-2xx statuses and non-JSON bodies are all
/// [`UpstreamError`]s: they abort the request. Whether the JSON is a usable
/// envelope is decided later, by the caller's classification.
pub(super) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    provider: &str,
    endpoint: &str,
    api_key: Option<&str>,
    body: &B,
    timeout: Option<Duration>,
) -> Result<Value, UpstreamError> {
    let api_key = api_key.ok_or_else(|| UpstreamError::MissingApiKey {
        provider: provider.to_string(),
    })?;

    let mut builder = client.post(endpoint).bearer_auth(api_key).json(body);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let resp = builder
        .send()
        .await
        .map_err(|e| UpstreamError::Request {
            provider: provider.to_string(),
            message: e.to_string(),
        })?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(UpstreamError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    resp.json().await.map_err(|e| UpstreamError::InvalidBody {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Read `model` and `usage` from any OpenAI-style body.
pub(super) fn model_and_usage(body: &Value, fallback_model: &str) -> (String, Option<u32>) {
    let model = body
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(fallback_model)
        .to_string();
    let tokens = body
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(Value::as_u64)
        .map(|t| t.min(u32::MAX as u64) as u32);
    (model, tokens)
}

#[async_trait]
impl VisionProvider for ChatProvider {
    fn name(&self) -> &str {
        "openai-chat"
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<UpstreamReply, UpstreamError> {
        let start = Instant::now();
        tracing::debug!(
            style = %self.style,
            model = %self.model,
            image_bytes = request.image.size_bytes,
            "Sending chat completion request"
        );

        let body = post_json(
            &self.client,
            self.name(),
            &self.endpoint,
            self.api_key.as_deref(),
            &self.body(request),
            self.timeout(),
        )
        .await?;

        let (model, tokens_used) = model_and_usage(&body, &self.model);
        Ok(UpstreamReply {
            response: UpstreamResponse::from_chat_body(body, self.style.schema_enforced()),
            model,
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
