//! Extraction normalizer: upstream envelope in, inventory or diagnostic out.
//!
//! Nothing in this module fails. A model answer that cannot be read becomes
//! an [`UnparsableResult`] carrying the raw text, which callers return as data.
//!
//! Two decoding policies exist:
//!
//! - **strict**, for call styles where the upstream enforced the inventory
//!   schema: the text must be exactly `{"inventory": [...]}` and is trusted
//!   as is;
//! - **lenient**, for freeform JSON-object answers: code fences and
//!   surrounding prose are stripped, a bare array or an `items` key is
//!   accepted, and items without a label are dropped.

use crate::llm::{ImageInput, OutputBlock, UpstreamResponse};
use crate::types::{Extraction, InventoryItem, InventoryResult, UnparsableKind, UnparsableResult};
use serde::Deserialize;
use serde_json::Value;

/// The schema-enforced answer shape.
#[derive(Deserialize)]
struct InventoryPayload {
    inventory: Vec<InventoryItem>,
}

/// Normalize one upstream response into an [`Extraction`].
///
/// `image` is only used to correlate log lines with the upload.
pub fn normalize(response: &UpstreamResponse, image: &ImageInput) -> Extraction {
    let outcome = match response {
        UpstreamResponse::ChatCompletion {
            content: Some(text),
            schema_enforced,
            ..
        } => decode(text, *schema_enforced),

        UpstreamResponse::ChatCompletion {
            content: None,
            refusal: Some(refusal),
            ..
        } => Err(UnparsableResult::new(UnparsableKind::Refusal, refusal.as_str())),

        UpstreamResponse::ChatCompletion {
            content: None,
            refusal: None,
            ..
        } => Err(UnparsableResult::new(UnparsableKind::MissingContent, "")
            .with_detail("choices[0].message.content is missing or null")),

        UpstreamResponse::Responses {
            output,
            schema_enforced,
        } => match output.iter().find(|block| block.is_answer()) {
            Some(OutputBlock::Text(text)) => decode(text, *schema_enforced),
            Some(OutputBlock::Json(value)) => decode_value(value.clone(), &value.to_string()),
            Some(OutputBlock::Refusal(refusal)) => {
                Err(UnparsableResult::new(UnparsableKind::Refusal, refusal.as_str()))
            }
            Some(OutputBlock::Other(_)) | None => {
                let kinds: Vec<String> = output
                    .iter()
                    .map(|block| match block {
                        OutputBlock::Other(kind) => kind.clone(),
                        _ => "answer".to_string(),
                    })
                    .collect();
                Err(UnparsableResult::new(UnparsableKind::MissingContent, "").with_detail(
                    format!(
                        "no output_text or output_json block in output [{}]",
                        kinds.join(", ")
                    ),
                ))
            }
        },

        UpstreamResponse::Unknown { raw } => Err(UnparsableResult::new(
            UnparsableKind::UnknownEnvelope,
            raw.as_str(),
        )
        .with_detail("response body matches no known envelope")),
    };

    match outcome {
        Ok(result) => {
            tracing::debug!(
                shape = response.shape(),
                items = result.len(),
                image_bytes = image.size_bytes,
                media_type = %image.media_type,
                "Normalized inventory"
            );
            Extraction::Inventory(result)
        }
        Err(diagnostic) => {
            tracing::warn!(
                shape = response.shape(),
                error = %diagnostic.error,
                detail = diagnostic.detail.as_deref().unwrap_or(""),
                image_bytes = image.size_bytes,
                media_type = %image.media_type,
                "Upstream answer could not be normalized"
            );
            Extraction::Unparsable(diagnostic)
        }
    }
}

fn decode(text: &str, schema_enforced: bool) -> Result<InventoryResult, UnparsableResult> {
    if schema_enforced {
        decode_strict(text)
    } else {
        decode_lenient(text)
    }
}

/// Decode a schema-constrained answer.
pub fn decode_strict(text: &str) -> Result<InventoryResult, UnparsableResult> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        UnparsableResult::new(UnparsableKind::InvalidJson, text).with_detail(e.to_string())
    })?;
    decode_value(value, text)
}

fn decode_value(value: Value, raw_text: &str) -> Result<InventoryResult, UnparsableResult> {
    serde_json::from_value::<InventoryPayload>(value)
        .map(|payload| InventoryResult::new(payload.inventory))
        .map_err(|e| {
            UnparsableResult::new(UnparsableKind::UnexpectedShape, raw_text)
                .with_detail(e.to_string())
        })
}

/// Decode a freeform answer that is expected, but not guaranteed, to hold JSON.
pub fn decode_lenient(text: &str) -> Result<InventoryResult, UnparsableResult> {
    let candidate = strip_code_fence(text);
    let value = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(first_err) => embedded_json(candidate).ok_or_else(|| {
            UnparsableResult::new(UnparsableKind::InvalidJson, text)
                .with_detail(first_err.to_string())
        })?,
    };

    let entries = match &value {
        Value::Array(entries) => entries,
        Value::Object(obj) => match obj.get("inventory").or_else(|| obj.get("items")) {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(UnparsableResult::new(UnparsableKind::UnexpectedShape, text)
                    .with_detail("expected an \"inventory\" array"))
            }
        },
        _ => {
            return Err(UnparsableResult::new(UnparsableKind::UnexpectedShape, text)
                .with_detail("expected a JSON object or array"))
        }
    };

    let items: Vec<InventoryItem> = entries.iter().filter_map(InventoryItem::from_value).collect();
    let dropped = entries.len() - items.len();
    if dropped > 0 {
        tracing::debug!(dropped, "Dropped inventory entries without a label");
    }
    Ok(InventoryResult::new(items))
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the outermost `{...}` block of a text that has prose around it.
fn embedded_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
