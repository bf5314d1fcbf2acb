//! Core data types for Shelfscan.
//!
//! These types represent what a shelf photo turns into once the model's
//! answer has been normalized.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// One kind of product spotted on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Product name or short description (always present)
    pub label: String,

    /// Brand if visible, empty otherwise
    #[serde(default, deserialize_with = "lenient_text")]
    pub brand: String,

    /// Best-effort count of visible units
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub estimated_quantity: u32,

    /// Spatial descriptor on the shelf (e.g. "top left")
    #[serde(
        default,
        deserialize_with = "lenient_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<String>,

    /// Model confidence from 0.0 to 1.0
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
}

impl InventoryItem {
    /// Create an item with only a label; every other field takes its sentinel.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            brand: String::new(),
            estimated_quantity: 0,
            position: None,
            confidence: 0.0,
        }
    }

    /// Build an item from an untyped JSON object.
    ///
    /// Returns `None` when there is no usable string `label`. Every other
    /// field falls back to its sentinel instead of rejecting the item.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let label = obj.get("label")?.as_str()?.trim();
        if label.is_empty() {
            return None;
        }

        Some(Self {
            label: label.to_string(),
            brand: obj.get("brand").map(text_from_value).unwrap_or_default(),
            estimated_quantity: obj
                .get("estimated_quantity")
                .map(quantity_from_value)
                .unwrap_or(0),
            position: obj
                .get("position")
                .map(text_from_value)
                .filter(|p| !p.is_empty()),
            confidence: obj
                .get("confidence")
                .map(confidence_from_value)
                .unwrap_or(0.0),
        })
    }
}

/// Ordered list of items, in the order the model reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryResult {
    pub items: Vec<InventoryItem>,
}

impl InventoryResult {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InventoryItem> {
        self.items.iter()
    }
}

/// Why a model answer could not be turned into an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsableKind {
    /// The text was not valid JSON
    InvalidJson,
    /// Valid JSON, but not an inventory payload
    UnexpectedShape,
    /// The envelope had no text-bearing content where one was expected
    MissingContent,
    /// The model declined to answer
    Refusal,
    /// The envelope itself matched none of the known call styles
    UnknownEnvelope,
}

impl UnparsableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::UnexpectedShape => "unexpected_shape",
            Self::MissingContent => "missing_content",
            Self::Refusal => "refusal",
            Self::UnknownEnvelope => "unknown_envelope",
        }
    }
}

impl fmt::Display for UnparsableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic returned instead of an inventory when the model's answer is unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnparsableResult {
    /// Error tag
    pub error: UnparsableKind,

    /// The offending upstream text, untouched
    pub raw_text: String,

    /// Decoder message, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl UnparsableResult {
    pub fn new(error: UnparsableKind, raw_text: impl Into<String>) -> Self {
        Self {
            error,
            raw_text: raw_text.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of normalizing one upstream answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Inventory(InventoryResult),
    Unparsable(UnparsableResult),
}

impl Extraction {
    pub fn inventory(&self) -> Option<&InventoryResult> {
        match self {
            Self::Inventory(result) => Some(result),
            Self::Unparsable(_) => None,
        }
    }

    pub fn is_unparsable(&self) -> bool {
        matches!(self, Self::Unparsable(_))
    }
}

/// Everything the service knows after analyzing one image.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Normalized model answer
    pub extraction: Extraction,

    /// Where the CSV export landed, if export is enabled and succeeded
    pub csv_path: Option<PathBuf>,

    /// Model identifier reported by the provider
    pub model: String,

    /// Round-trip latency of the upstream call in milliseconds
    pub latency_ms: u64,
}

// --- Lenient field decoding ---

fn text_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn quantity_from_value(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(q) if q.is_finite() && q > 0.0 => q.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn confidence_from_value(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_from_value(&Value::deserialize(deserializer)?))
}

fn lenient_position<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let text = text_from_value(&Value::deserialize(deserializer)?);
    Ok(Some(text).filter(|t| !t.is_empty()))
}

fn lenient_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(quantity_from_value(&Value::deserialize(deserializer)?))
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(confidence_from_value(&Value::deserialize(deserializer)?))
}
