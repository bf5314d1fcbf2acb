//! OpenAI provider using the Responses API.
//!
//! The image goes in as an `input_image` block and the answer is constrained
//! with a `json_schema` text format. The reply is an output array of typed
//! blocks rather than a single message.

use super::envelope::UpstreamResponse;
use super::openai::{model_and_usage, post_json};
use super::provider::{ExtractionRequest, UpstreamReply, VisionProvider, INVENTORY_SCHEMA_NAME};
use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Responses API provider.
pub struct ResponsesProvider {
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl ResponsesProvider {
    pub fn new(base_url: &str, api_key: Option<String>, model: &str, timeout: Option<Duration>) -> Self {
        Self {
            api_key,
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: format!("{}/responses", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    fn body(&self, request: &ExtractionRequest) -> ResponsesRequest {
        ResponsesRequest {
            model: self.model.clone(),
            instructions: request.system_prompt.clone(),
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            input: vec![InputMessage {
                role: "user".to_string(),
                content: vec![
                    InputContent::InputText {
                        text: request.prompt.clone(),
                    },
                    InputContent::InputImage {
                        image_url: request.image.data_url(),
                    },
                ],
            }],
            text: TextOptions {
                format: TextFormat {
                    kind: "json_schema".to_string(),
                    name: INVENTORY_SCHEMA_NAME.to_string(),
                    schema: request.schema.clone(),
                    strict: true,
                },
            },
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ResponsesRequest {
    model: String,
    instructions: String,
    input: Vec<InputMessage>,
    max_output_tokens: u32,
    temperature: f32,
    text: TextOptions,
}

#[derive(Serialize)]
struct InputMessage {
    role: String,
    content: Vec<InputContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Serialize)]
struct TextOptions {
    format: TextFormat,
}

#[derive(Serialize)]
struct TextFormat {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    schema: Value,
    strict: bool,
}

#[async_trait]
impl VisionProvider for ResponsesProvider {
    fn name(&self) -> &str {
        "openai-responses"
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<UpstreamReply, UpstreamError> {
        let start = Instant::now();
        tracing::debug!(
            model = %self.model,
            image_bytes = request.image.size_bytes,
            "Sending responses API request"
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
            response: UpstreamResponse::from_responses_body(body, true),
            model,
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
