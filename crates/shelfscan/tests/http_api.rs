//! Black-box tests of the HTTP surface, with a stub upstream provider.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use shelfscan::server::{self, AppState};
use shelfscan_core::{
    Analyzer, Config, ExtractionRequest, UpstreamError, UpstreamReply, UpstreamResponse,
    VisionProvider,
};
use tower::ServiceExt;

const BOUNDARY: &str = "shelfscan-test-boundary";

const COLA: &str = r#"{"inventory":[{"label":"Cola","brand":"","estimated_quantity":12,"position":"haut gauche","confidence":0.9}]}"#;

/// What the stub answers with.
enum Answer {
    Content(String),
    Failure,
}

/// Upstream stand-in that also counts files present in the upload dir
/// while the call is in flight.
struct StubProvider {
    answer: Answer,
    upload_dir: PathBuf,
    files_during_call: Arc<AtomicUsize>,
}

#[async_trait]
impl VisionProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<UpstreamReply, UpstreamError> {
        assert!(request.image.size_bytes > 0);
        self.files_during_call
            .store(count_files(&self.upload_dir), Ordering::SeqCst);

        match &self.answer {
            Answer::Content(content) => Ok(UpstreamReply {
                response: UpstreamResponse::ChatCompletion {
                    content: Some(content.clone()),
                    refusal: None,
                    schema_enforced: true,
                },
                model: "stub-model".into(),
                tokens_used: Some(42),
                latency_ms: 1,
            }),
            Answer::Failure => Err(UpstreamError::Status {
                provider: "stub".into(),
                status: 429,
                body: "insufficient_quota".into(),
            }),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }
}

struct TestApp {
    router: Router,
    upload_dir: PathBuf,
    export_dir: PathBuf,
    files_during_call: Arc<AtomicUsize>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    fn new(answer: Answer, export_csv: bool) -> Self {
        Self::with_config(answer, |config| config.export.enabled = export_csv)
    }

    fn with_config(answer: Answer, configure: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let export_dir = dir.path().join("exports");

        let mut config = Config::default();
        config.upload.dir = upload_dir.clone();
        config.export.dir = export_dir.clone();
        configure(&mut config);

        let files_during_call = Arc::new(AtomicUsize::new(0));
        let provider = StubProvider {
            answer,
            upload_dir: upload_dir.clone(),
            files_during_call: files_during_call.clone(),
        };
        let analyzer = Analyzer::new(config, Box::new(provider));

        Self {
            router: server::router(AppState::new(analyzer)),
            upload_dir,
            export_dir,
            files_during_call,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// Build a multipart body from (field name, optional file name, content type, bytes).
fn multipart(parts: &[(&str, Option<&str>, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => {
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn image_upload() -> Request<Body> {
    multipart(&[("file", Some("shelf.jpg"), "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0])])
}

#[tokio::test]
async fn health_is_ok_even_when_upstream_fails() {
    let app = TestApp::new(Answer::Failure, false);
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn index_serves_html() {
    let app = TestApp::new(Answer::Failure, false);
    let request = Request::get("/").body(Body::empty()).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/analyze"));
}

#[tokio::test]
async fn analyze_without_file_field_is_400() {
    let app = TestApp::new(Answer::Content(COLA.into()), false);
    let request = multipart(&[("note", None, "text/plain", b"hello")]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(count_files(&app.upload_dir), 0);
}

#[tokio::test]
async fn analyze_with_empty_file_is_400() {
    let app = TestApp::new(Answer::Content(COLA.into()), false);
    let request = multipart(&[("file", Some(""), "application/octet-stream", b"")]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn analyze_without_multipart_body_is_400() {
    let app = TestApp::new(Answer::Content(COLA.into()), false);
    let request = Request::post("/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn analyze_oversized_upload_is_413() {
    let app = TestApp::with_config(Answer::Content(COLA.into()), |config| {
        config.server.max_upload_mb = 1
    });
    let image = vec![0xFF; 2 * 1024 * 1024];
    let request = multipart(&[("file", Some("shelf.jpg"), "image/jpeg", image.as_slice())]);

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
    assert_eq!(app.files_during_call.load(Ordering::SeqCst), 0);
    assert_eq!(count_files(&app.upload_dir), 0);
}

#[tokio::test]
async fn analyze_returns_inventory_and_cleans_up() {
    let app = TestApp::new(Answer::Content(COLA.into()), false);

    let (status, body) = app.send(image_upload()).await;
    assert_eq!(status, StatusCode::OK);

    let inventory = body["inventory"].as_array().unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0]["label"], "Cola");
    assert_eq!(inventory[0]["brand"], "");
    assert_eq!(inventory[0]["estimated_quantity"], 12);
    assert_eq!(inventory[0]["position"], "haut gauche");
    assert_eq!(inventory[0]["confidence"], 0.9);
    assert!(body.get("unparsable").is_none());
    assert!(body.get("csv_path").is_none());

    assert_eq!(app.files_during_call.load(Ordering::SeqCst), 1);
    assert_eq!(count_files(&app.upload_dir), 0);
}

#[tokio::test]
async fn analyze_unparsable_answer_is_200_diagnostic() {
    let app = TestApp::new(Answer::Content("Sorry, I cannot process this.".into()), true);

    let (status, body) = app.send(image_upload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory"], serde_json::json!([]));
    assert_eq!(body["unparsable"]["error"], "invalid_json");
    assert_eq!(body["unparsable"]["raw_text"], "Sorry, I cannot process this.");

    assert_eq!(count_files(&app.upload_dir), 0);
    assert_eq!(count_files(&app.export_dir), 0);
}

#[tokio::test]
async fn analyze_upstream_failure_is_500_and_cleans_up() {
    let app = TestApp::new(Answer::Failure, false);

    let (status, body) = app.send(image_upload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(!error.contains("insufficient_quota"));

    assert_eq!(app.files_during_call.load(Ordering::SeqCst), 1);
    assert_eq!(count_files(&app.upload_dir), 0);
}

#[tokio::test]
async fn analyze_exports_csv_with_substituted_delimiters() {
    let answer = r#"{"inventory":[{"label":"Pack, 6x","brand":"Acme","estimated_quantity":3,"position":"bottom right","confidence":0.8}]}"#;
    let app = TestApp::new(Answer::Content(answer.into()), true);

    let (status, body) = app.send(image_upload()).await;
    assert_eq!(status, StatusCode::OK);
    // The JSON answer keeps the label untouched
    assert_eq!(body["inventory"][0]["label"], "Pack, 6x");

    let csv_path = PathBuf::from(body["csv_path"].as_str().unwrap());
    assert!(csv_path.starts_with(&app.export_dir));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "label,brand,estimated_quantity,position,confidence");
    assert_eq!(lines[1], "Pack; 6x,Acme,3,bottom right,0.8");
    assert!(lines.iter().all(|line| line.split(',').count() == 5));
}

#[tokio::test]
async fn preflight_gets_cors_headers() {
    let app = TestApp::new(Answer::Failure, false);
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/analyze")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type, x-requested-with")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
}

#[tokio::test]
async fn simple_requests_carry_allow_origin() {
    let app = TestApp::new(Answer::Failure, false);
    let request = Request::get("/health")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
