//! HTTP-facing errors and the per-request recovery middleware.
//!
//! Every error response is JSON `{error, message, timestamp}`: [`AppError`]
//! renders it directly and [`json_error_responses`] rewrites whatever axum
//! produced on its own. In production the `message` of 5xx responses is
//! replaced with a generic string by [`redact_internal_errors`].

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    body::to_bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use serde_json::json;
use thiserror::Error;

use redline_core::RedlineError;

use crate::app_state::AppState;
use crate::clock::rfc3339_now;

pub type Result<T> = std::result::Result<T, AppError>;

/// Message shown instead of internal detail in production.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn client_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RedlineError> for AppError {
    fn from(e: RedlineError) -> Self {
        match e {
            RedlineError::BadRequest(m) => AppError::BadRequest(m),
            RedlineError::NotFound(m) => AppError::NotFound(m),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        AppError::BadRequest(r.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::BadRequest(r.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(r: BytesRejection) -> Self {
        if r.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(r.body_text())
        } else {
            AppError::BadRequest(r.body_text())
        }
    }
}

/// Marks a response as produced by [`AppError`] so later layers can rewrite it.
#[derive(Debug, Clone, Copy)]
pub struct ErrorCode(pub &'static str);

/// Marks an error response whose body must reach the client unchanged
/// (the `/metrics` text body).
#[derive(Debug, Clone, Copy)]
pub struct RawErrorBody;

fn error_body(status: StatusCode, code: &'static str, message: String) -> Response {
    let body = Json(json!({
        "error": code,
        "message": message,
        "timestamp": rfc3339_now(),
    }));
    let mut resp = (status, body).into_response();
    resp.extensions_mut().insert(ErrorCode(code));
    resp
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        error_body(status, self.client_code(), self.to_string())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Turn a panicking handler into a 500 instead of tearing down the connection.
pub async fn catch_panic(req: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => resp,
        Err(payload) => {
            let msg = panic_message(payload.as_ref()).to_string();
            AppError::Internal(format!("handler panicked: {msg}")).into_response()
        }
    }
}

/// Replace 5xx error messages with a generic string in production.
pub async fn redact_internal_errors(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    if !state.cfg().is_production() || !resp.status().is_server_error() {
        return resp;
    }
    match resp.extensions().get::<ErrorCode>().copied() {
        Some(ErrorCode(code)) => {
            error_body(resp.status(), code, GENERIC_INTERNAL_MESSAGE.to_string())
        }
        None => resp,
    }
}

/// Largest framework error body read back when rewriting it as JSON.
const MAX_REWRITTEN_BODY: usize = 64 * 1024;

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        s if s.is_server_error() => "INTERNAL",
        _ => "REQUEST_FAILED",
    }
}

/// Rewrite 4xx/5xx responses that did not come from [`AppError`] (axum
/// rejections, 405s from method routing) into the JSON error shape.
pub async fn json_error_responses(req: Request, next: Next) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if !(status.is_client_error() || status.is_server_error())
        || resp.extensions().get::<ErrorCode>().is_some()
        || resp.extensions().get::<RawErrorBody>().is_some()
    {
        return resp;
    }

    let (parts, body) = resp.into_parts();
    let text = match to_bytes(body, MAX_REWRITTEN_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        text
    };
    if status.is_server_error() {
        tracing::error!(%status, %message, "request failed");
    } else {
        tracing::debug!(%status, %message, "request rejected");
    }

    let mut out = error_body(status, code_for(status), message);
    if let Some(allow) = parts.headers.get(header::ALLOW) {
        out.headers_mut().insert(header::ALLOW, allow.clone());
    }
    out
}
