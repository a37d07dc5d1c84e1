pub mod convert;
pub mod health;

pub use convert::*;
pub use health::*;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{logging_middleware, rate_limit_middleware};
use crate::services::engine::ConversionEngine;

/// Process-wide state handed to every request: the once-loaded conversion
/// engine (read-only after startup) and the root under which staging scopes
/// are created.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ConversionEngine>,
    pub staging_root: PathBuf,
}

pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/convert", post(convert_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_body_bytes))
                .layer(axum::middleware::from_fn(logging_middleware))
                .layer(axum::middleware::from_fn(rate_limit_middleware)),
        )
        .with_state(state)
}
