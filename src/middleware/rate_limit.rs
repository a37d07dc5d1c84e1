use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::AppError;

static TOTAL_REQUESTS: AtomicU64 = AtomicU64::new(0);
static REJECTED_REQUESTS: AtomicU64 = AtomicU64::new(0);

/// Global semaphore bounding in-flight conversions. Conversion calls can
/// block for long, unbounded durations, so the bound is applied here, in
/// front of the orchestration logic, rather than inside it.
pub static REQUEST_SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| {
    let max_requests = std::env::var("MAX_CONCURRENT_REQUESTS")
        .unwrap_or_else(|_| "100".to_string())
        .parse::<usize>()
        .unwrap_or(100);

    info!(
        max_concurrent_requests = max_requests,
        "Initializing request semaphore"
    );
    Semaphore::new(max_requests)
});

pub async fn rate_limit_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    // Health probes must answer even when conversions are saturated.
    if path == "/health" || path == "/ready" {
        return Ok(next.run(request).await);
    }

    let total_requests = TOTAL_REQUESTS.fetch_add(1, Ordering::Relaxed) + 1;

    let _permit = REQUEST_SEMAPHORE.try_acquire().map_err(|_| {
        let rejected = REJECTED_REQUESTS.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            path = path,
            total_requests = total_requests,
            rejected_requests = rejected,
            available_permits = REQUEST_SEMAPHORE.available_permits(),
            "rejecting request, concurrency limit reached"
        );
        AppError::RateLimited
    })?;

    debug!(
        path = path,
        available_permits = REQUEST_SEMAPHORE.available_permits(),
        "request permit acquired"
    );

    Ok(next.run(request).await)
}

/// (total, rejected, available permits) counters for the health report.
pub fn get_rate_limit_metrics() -> (u64, u64, usize) {
    let total = TOTAL_REQUESTS.load(Ordering::Relaxed);
    let rejected = REJECTED_REQUESTS.load(Ordering::Relaxed);
    let available = REQUEST_SEMAPHORE.available_permits();
    (total, rejected, available)
}
