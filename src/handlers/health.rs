use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::middleware::rate_limit::get_rate_limit_metrics;
use crate::services::OcrService;

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let engine_available = state.engine.is_available();
    let ocr_available = OcrService::tesseract_available();
    let (total_requests, rejected_requests, available_permits) = get_rate_limit_metrics();

    let status = if engine_available { "healthy" } else { "degraded" };

    Ok(Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "conversion_engine": engine_available,
            "ocr": ocr_available,
        },
        "rate_limiting": {
            "total_requests": total_requests,
            "rejected_requests": rejected_requests,
            "available_permits": available_permits,
        },
    })))
}

/// Readiness check endpoint (for container orchestrators)
pub async fn ready_handler(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    if state.engine.is_available() {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
