//! Example application endpoints.
//!
//! These exist to generate realistic traffic for the instrumentation layer:
//! a fast info route, a parameterised route, a deliberately slow route, a
//! route that always fails, and a body echo for request-size accounting.

use std::time::Duration;

use axum::{
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{Method, Uri},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::{AppError, Result};

pub const DEFAULT_SLOW_DELAY_MS: u64 = 1000;
pub const MAX_SLOW_DELAY_MS: u64 = 30000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        .route("/api/info", get(info))
        .route("/api/items/:id", get(item))
        .route("/api/slow", get(slow))
        .route("/api/error", get(error))
        .route("/api/echo", post(echo))
}

async fn info(State(state): State<AppState>) -> Json<Value> {
    let cfg = state.cfg();
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": cfg.deployment.version,
        "deployment": cfg.deployment.label,
        "environment": cfg.environment,
    }))
}

async fn item(path: std::result::Result<Path<String>, PathRejection>) -> Result<Json<Value>> {
    let Path(id) = path?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct SlowQuery {
    delay: Option<String>,
}

fn parse_delay(raw: Option<&str>) -> Result<u64> {
    let Some(raw) = raw else { return Ok(DEFAULT_SLOW_DELAY_MS); };
    let ms: u64 = raw.trim().parse().map_err(|_| {
        AppError::BadRequest(format!("delay must be a non-negative integer, got {raw:?}"))
    })?;
    if ms > MAX_SLOW_DELAY_MS {
        return Err(AppError::BadRequest(format!(
            "delay must be at most {MAX_SLOW_DELAY_MS} ms"
        )));
    }
    Ok(ms)
}

async fn slow(
    query: std::result::Result<Query<SlowQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(q) = query?;
    let delay = parse_delay(q.delay.as_deref())?;
    tokio::time::sleep(Duration::from_millis(delay)).await;
    Ok(Json(json!({ "message": "slow response", "delay": delay })))
}

async fn error() -> Result<Json<Value>> {
    Err(AppError::Internal("simulated failure".into()))
}

async fn echo(body: std::result::Result<Bytes, BytesRejection>) -> Result<Json<Value>> {
    let body = body?;
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?;
    Ok(Json(value))
}

pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("route {method} {} does not exist", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_parsing() {
        assert_eq!(parse_delay(None).unwrap(), DEFAULT_SLOW_DELAY_MS);
        assert_eq!(parse_delay(Some("100")).unwrap(), 100);
        assert!(parse_delay(Some("-5")).is_err());
        assert!(parse_delay(Some("abc")).is_err());
        assert!(parse_delay(Some("30001")).is_err());
    }
}
