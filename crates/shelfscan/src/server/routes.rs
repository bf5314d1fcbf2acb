//! HTTP handlers: health, the static page, and image analysis.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use shelfscan_core::{Analysis, Extraction, InventoryItem, ShelfscanError, UnparsableResult};

use super::errors::{bad_request, internal_error, json_error};
use super::AppState;

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// `GET /health`: liveness only, never touches the upstream provider.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /`: the upload page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Body of a 200 answer from `/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Normalized items (empty when the answer was unparsable)
    pub inventory: Vec<InventoryItem>,

    /// Diagnostic with the raw model text, when the answer was unusable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unparsable: Option<UnparsableResult>,

    /// Where the CSV export was written, if enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
}

impl From<Analysis> for AnalyzeResponse {
    fn from(analysis: Analysis) -> Self {
        let csv_path = analysis.csv_path.map(|p| p.display().to_string());
        match analysis.extraction {
            Extraction::Inventory(result) => Self {
                inventory: result.items,
                unparsable: None,
                csv_path,
            },
            Extraction::Unparsable(diagnostic) => Self {
                inventory: Vec::new(),
                unparsable: Some(diagnostic),
                csv_path,
            },
        }
    }
}

/// An image pulled out of the multipart body.
struct ImageField {
    bytes: Vec<u8>,
    content_type: String,
}

/// `POST /analyze`: multipart upload with a `file` field.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected non-multipart analyze request");
            return bad_request(format!("Expected a multipart/form-data upload: {rejection}"));
        }
    };

    let image = match read_image_field(&mut multipart).await {
        Ok(Some(image)) => image,
        Ok(None) => return bad_request("No image received."),
        Err(e) => return multipart_error(e),
    };

    let outcome = state
        .analyzer
        .analyze_bytes(&state.upload_dir, &image.bytes, &image.content_type)
        .await;

    match outcome {
        Ok(analysis) => (StatusCode::OK, Json(AnalyzeResponse::from(analysis))).into_response(),
        Err(ShelfscanError::Upstream(e)) => {
            tracing::error!(
                provider = state.analyzer.provider_name(),
                status = e.status_code(),
                error = %e,
                "Upstream call failed"
            );
            internal_error("Upstream model call failed.")
        }
        Err(e) => {
            tracing::error!(dir = %state.upload_dir.display(), error = %e, "Failed to store upload");
            internal_error("Failed to store the uploaded image.")
        }
    }
}

/// Reading the body failed: too large (413) or malformed (400).
fn multipart_error(e: MultipartError) -> Response {
    let status = e.status();
    tracing::debug!(status = status.as_u16(), error = %e, "Rejected multipart body");
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        json_error(status, "Image is too large.")
    } else {
        bad_request(format!("Malformed upload: {e}"))
    }
}

/// Find the `file` field; other fields are skipped.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<ImageField>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .filter(|ct| ct.starts_with("image/"))
            .map(String::from)
            .or_else(|| field.file_name().and_then(guess_content_type))
            .unwrap_or_else(|| "image/jpeg".to_string());
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(ImageField {
            bytes: bytes.to_vec(),
            content_type,
        }));
    }
    Ok(None)
}

/// Guess an image content type from a file name extension.
fn guess_content_type(file_name: &str) -> Option<String> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime.to_string())
}
