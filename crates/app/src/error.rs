use ingest::IngestError;
use pulse_core::WindowError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("db error: {0}")]
    Db(#[from] pulse_db::DbError),
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("invalid window: {0}")]
    InvalidWindow(#[from] WindowError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// What a request-routing layer hands back to its caller.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub retryable: bool,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, code, retryable) = match &err {
            AppError::InvalidWindow(_) | AppError::Ingest(IngestError::InvalidWindow(_)) => {
                (400, Some("invalid_window"), false)
            }
            AppError::InvalidInput(_) => (400, Some("invalid_input"), false),
            AppError::Ingest(IngestError::RateLimitExceeded) => (503, Some("rate_limited"), true),
            AppError::Ingest(IngestError::Transport(_)) => (503, Some("upstream_unavailable"), true),
            AppError::Ingest(IngestError::Protocol(_) | IngestError::Db(_))
            | AppError::Db(_)
            | AppError::Io(_)
            | AppError::Serde(_)
            | AppError::Config(_) => (500, None, false),
        };
        Self {
            status,
            message: err.to_string(),
            code: code.map(str::to_string),
            retryable,
        }
    }
}
