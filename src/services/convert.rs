use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use crate::error::{AppError, AppResult};
use crate::models::ConversionOptions;
use crate::services::engine::{ConversionEngine, ConversionOutput};

/// Invoke the conversion engine for one staged document.
///
/// The engine is synchronous and may block for an unbounded time, so the
/// call runs on the blocking pool. Conversion is not retried, and no engine
/// error type crosses this boundary: every failure, including a panic
/// inside the engine, becomes a request-level conversion error with a
/// human-readable message.
pub async fn run(
    engine: Arc<dyn ConversionEngine>,
    document: PathBuf,
    options: ConversionOptions,
) -> AppResult<ConversionOutput> {
    let joined =
        tokio::task::spawn_blocking(move || engine.convert(&document, &options)).await;

    match joined {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(AppError::conversion(err.to_string())),
        Err(join_err) => {
            error!(error = %join_err, "conversion task did not complete");
            Err(AppError::conversion("conversion task did not complete"))
        }
    }
}
