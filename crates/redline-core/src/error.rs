//! Shared error type across redline crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// No route or resource matched.
    NotFound,
    /// Invalid startup configuration.
    Config,
    /// Metric registration or recording failed.
    Metrics,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Config => "CONFIG",
            ClientCode::Metrics => "METRICS",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RedlineError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum RedlineError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("invalid value {value} for metric {metric}")]
    InvalidValue { metric: String, value: String },
    #[error("invalid buckets for metric {metric}: {reason}")]
    InvalidBuckets { metric: String, reason: String },
    #[error("metric {metric} expects {expected} label values, got {got}")]
    LabelMismatch {
        metric: String,
        expected: usize,
        got: usize,
    },
    #[error("render failed: {0}")]
    Render(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RedlineError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RedlineError::BadRequest(_) => ClientCode::BadRequest,
            RedlineError::NotFound(_) => ClientCode::NotFound,
            RedlineError::Config(_) => ClientCode::Config,
            RedlineError::DuplicateMetric(_)
            | RedlineError::InvalidValue { .. }
            | RedlineError::InvalidBuckets { .. }
            | RedlineError::LabelMismatch { .. }
            | RedlineError::Render(_) => ClientCode::Metrics,
            RedlineError::Internal(_) => ClientCode::Internal,
        }
    }
}

impl From<std::fmt::Error> for RedlineError {
    fn from(e: std::fmt::Error) -> Self {
        RedlineError::Render(e.to_string())
    }
}
