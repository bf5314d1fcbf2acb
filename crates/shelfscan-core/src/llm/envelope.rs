//! Upstream envelope shapes.
//!
//! Each call style returns a differently shaped JSON body. Providers classify
//! the body into one [`UpstreamResponse`] variant right after the HTTP call,
//! so the normalizer has exactly one decode path per known shape and an
//! explicit fallback for anything else.

use serde_json::Value;

/// A classified upstream response body.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamResponse {
    /// Chat Completions: a single message whose content should hold JSON.
    ChatCompletion {
        /// `choices[0].message.content`, `None` when absent or null
        content: Option<String>,
        /// `choices[0].message.refusal`, when the model declined
        refusal: Option<String>,
        /// Whether the request constrained the answer with a JSON schema
        schema_enforced: bool,
    },

    /// Responses API: an output array of typed blocks.
    Responses {
        /// Content blocks in output order, message wrappers flattened
        output: Vec<OutputBlock>,
        /// Whether the request constrained the answer with a JSON schema
        schema_enforced: bool,
    },

    /// A body that matches none of the known envelopes.
    Unknown {
        /// The body as received
        raw: String,
    },
}

/// One content block of a Responses API output array.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputBlock {
    /// `output_text`: JSON carried as text
    Text(String),
    /// `output_json` (or a block with `parsed`): JSON already decoded upstream
    Json(Value),
    /// `refusal`: the model declined
    Refusal(String),
    /// Any other block type (reasoning, tool calls, ...), by type name
    Other(String),
}

impl UpstreamResponse {
    /// Classify a Chat Completions body.
    pub fn from_chat_body(body: Value, schema_enforced: bool) -> Self {
        let Some(message) = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .filter(|message| message.is_object())
        else {
            return Self::Unknown {
                raw: body.to_string(),
            };
        };

        let content = match message.get("content") {
            Some(Value::String(text)) => Some(text.clone()),
            // Some compatible servers send content as an array of text parts
            Some(Value::Array(parts)) => {
                let text: String = parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect();
                Some(text).filter(|t| !t.is_empty())
            }
            _ => None,
        };
        let refusal = message
            .get("refusal")
            .and_then(Value::as_str)
            .map(String::from);

        Self::ChatCompletion {
            content,
            refusal,
            schema_enforced,
        }
    }

    /// Classify a Responses API body.
    pub fn from_responses_body(body: Value, schema_enforced: bool) -> Self {
        let Some(items) = body.get("output").and_then(Value::as_array) else {
            return Self::Unknown {
                raw: body.to_string(),
            };
        };

        let mut output = Vec::new();
        for item in items {
            match item.get("type").and_then(Value::as_str) {
                Some("message") => {
                    let blocks = item
                        .get("content")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    output.extend(blocks.iter().map(OutputBlock::classify));
                }
                _ => output.push(OutputBlock::classify(item)),
            }
        }

        Self::Responses {
            output,
            schema_enforced,
        }
    }

    /// Short shape name for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::ChatCompletion { .. } => "chat_completion",
            Self::Responses { .. } => "responses",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl OutputBlock {
    fn classify(block: &Value) -> Self {
        if let Some(parsed) = block.get("parsed").filter(|p| !p.is_null()) {
            return Self::Json(parsed.clone());
        }

        let kind = block.get("type").and_then(Value::as_str).unwrap_or("");
        match kind {
            "output_text" | "text" => match block.get("text") {
                Some(Value::String(text)) => Self::Text(text.clone()),
                _ => Self::Other(kind.to_string()),
            },
            "output_json" | "json" => match block.get("json").or_else(|| block.get("data")) {
                Some(value) => Self::Json(value.clone()),
                None => Self::Other(kind.to_string()),
            },
            "refusal" => Self::Refusal(
                block
                    .get("refusal")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this block carries the answer (as text or decoded JSON).
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Json(_) | Self::Refusal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_body_with_content() {
        let body = json!({
            "model": "gpt-4o-mini",
            "choices": [{ "message": { "role": "assistant", "content": "{\"inventory\":[]}" } }]
        });
        let response = UpstreamResponse::from_chat_body(body, true);
        assert_eq!(
            response,
            UpstreamResponse::ChatCompletion {
                content: Some("{\"inventory\":[]}".into()),
                refusal: None,
                schema_enforced: true,
            }
        );
    }

    #[test]
    fn test_chat_body_with_null_content_and_refusal() {
        let body = json!({
            "choices": [{ "message": { "content": null, "refusal": "I can't help with that." } }]
        });
        match UpstreamResponse::from_chat_body(body, true) {
            UpstreamResponse::ChatCompletion {
                content, refusal, ..
            } => {
                assert_eq!(content, None);
                assert_eq!(refusal.as_deref(), Some("I can't help with that."));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_chat_body_joins_text_parts() {
        let body = json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "{\"inventory\":" },
                { "type": "text", "text": "[]}" }
            ] } }]
        });
        match UpstreamResponse::from_chat_body(body, false) {
            UpstreamResponse::ChatCompletion { content, .. } => {
                assert_eq!(content.as_deref(), Some("{\"inventory\":[]}"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_chat_body_without_choices_is_unknown() {
        let body = json!({ "choices": [] });
        let response = UpstreamResponse::from_chat_body(body, true);
        assert_eq!(response.shape(), "unknown");
    }

    #[test]
    fn test_responses_body_flattens_messages() {
        let body = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "role": "assistant", "content": [
                    { "type": "output_text", "text": "{\"inventory\":[]}", "annotations": [] }
                ] }
            ]
        });
        match UpstreamResponse::from_responses_body(body, true) {
            UpstreamResponse::Responses { output, .. } => {
                assert_eq!(
                    output,
                    vec![
                        OutputBlock::Other("reasoning".into()),
                        OutputBlock::Text("{\"inventory\":[]}".into()),
                    ]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_responses_body_recognizes_decoded_json() {
        let body = json!({
            "output": [{ "type": "message", "content": [
                { "type": "output_json", "json": { "inventory": [] } }
            ] }]
        });
        match UpstreamResponse::from_responses_body(body, true) {
            UpstreamResponse::Responses { output, .. } => {
                assert_eq!(output, vec![OutputBlock::Json(json!({ "inventory": [] }))]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_responses_body_without_output_is_unknown() {
        let body = json!({ "error": { "message": "boom" } });
        match UpstreamResponse::from_responses_body(body, true) {
            UpstreamResponse::Unknown { raw } => assert!(raw.contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
