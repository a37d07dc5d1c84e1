//! Concurrency-limit behavior. Lives in its own test binary because the
//! request semaphore is process-global.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use distill::handlers::{app, AppState};
use distill::middleware::rate_limit::REQUEST_SEMAPHORE;
use distill::models::ConversionOptions;
use distill::services::engine::{
    ConversionEngine, ConversionMetadata, ConversionOutput, EngineError,
};

struct IdleEngine;

impl ConversionEngine for IdleEngine {
    fn convert(
        &self,
        _document: &Path,
        _options: &ConversionOptions,
    ) -> Result<ConversionOutput, EngineError> {
        Ok(ConversionOutput {
            markdown: String::new(),
            images: HashMap::new(),
            metadata: ConversionMetadata {
                page_count: 0,
                title: None,
                author: None,
                ocr_used: false,
            },
        })
    }
}

fn pdf_upload() -> Request<Body> {
    let boundary = "rate-limit-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"sample.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         %PDF-1.4\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn saturated_service_rejects_with_the_envelope_shape() {
    // Must run before the semaphore is first touched in this process.
    env::set_var("MAX_CONCURRENT_REQUESTS", "1");

    let staging = tempfile::tempdir().unwrap();
    let state = AppState {
        engine: Arc::new(IdleEngine),
        staging_root: staging.path().to_path_buf(),
    };
    let app = app(state, 10 * 1024 * 1024);

    let permit = REQUEST_SEMAPHORE.acquire().await.unwrap();

    let response = app.clone().oneshot(pdf_upload()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Too many concurrent requests");
    assert_eq!(body["markdown"], "");
    assert_eq!(body["page_count"], 0);

    // Health probes bypass the limiter even when saturated.
    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(health).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    drop(permit);

    let response = app.oneshot(pdf_upload()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
