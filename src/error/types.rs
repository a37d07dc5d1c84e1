use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ConvertResponse;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a request can end with. Exactly one variant determines the
/// response for a given request; cleanup failures are logged, never raised.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file part in the request")]
    MissingFile,

    #[error("No file selected for uploading")]
    EmptyFilename,

    #[error("Allowed file types are PDF")]
    UnsupportedFileType,

    #[error("Invalid upload: {message}")]
    Upload { message: String },

    #[error("Conversion failed: {message}")]
    Conversion { message: String },

    #[error("Asset encoding failed: {message}")]
    Encoding { message: String },

    #[error("Staging failed: {message}")]
    Staging { message: String },

    #[error("Too many concurrent requests")]
    RateLimited,
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingFile => "MISSING_FILE",
            AppError::EmptyFilename => "EMPTY_FILENAME",
            AppError::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            AppError::Upload { .. } => "INVALID_UPLOAD",
            AppError::Conversion { .. } => "CONVERSION_FAILED",
            AppError::Encoding { .. } => "ENCODING_FAILED",
            AppError::Staging { .. } => "STAGING_FAILED",
            AppError::RateLimited => "RATE_LIMIT_EXCEEDED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingFile
            | AppError::EmptyFilename
            | AppError::UnsupportedFileType
            | AppError::Upload { .. } => StatusCode::BAD_REQUEST,
            AppError::Conversion { .. }
            | AppError::Encoding { .. }
            | AppError::Staging { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// The `error` field of the envelope. Encoding and staging failures are
    /// folded into the same `Conversion failed:` template as engine failures
    /// since the client cannot act differently on them.
    pub fn envelope_message(&self) -> String {
        match self {
            AppError::Encoding { message } | AppError::Staging { message } => {
                format!("Conversion failed: {}", message)
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.envelope_message();

        tracing::error!(
            error_code = self.error_code(),
            status_code = %status,
            error_message = %message,
            "request failed"
        );

        (status, Json(ConvertResponse::error(message))).into_response()
    }
}

impl AppError {
    pub fn upload(message: impl Into<String>) -> Self {
        AppError::Upload {
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        AppError::Conversion {
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        AppError::Encoding {
            message: message.into(),
        }
    }

    pub fn staging(message: impl Into<String>) -> Self {
        AppError::Staging {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Staging {
            message: err.to_string(),
        }
    }
}
