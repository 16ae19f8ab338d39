//! Operational HTTP endpoints.
//!
//! - `/health`       : detailed snapshot (always 200 while alive)
//! - `/health/live`  : liveness
//! - `/health/ready` : readiness (503 once draining)
//! - `/metrics`      : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app_state::AppState;
use crate::clock::rfc3339_now;
use crate::error::RawErrorBody;
use crate::lifecycle::HealthReport;

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health().report())
}

pub async fn live(State(state): State<AppState>) -> impl IntoResponse {
    if state.health().is_alive() {
        (StatusCode::OK, Json(json!({ "status": "alive", "timestamp": rfc3339_now() })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "terminated", "timestamp": rfc3339_now() })),
        )
    }
}

pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    if state.health().is_ready().await {
        (StatusCode::OK, Json(json!({ "status": "ready", "timestamp": rfc3339_now() })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "timestamp": rfc3339_now() })),
        )
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.registry().render() {
        Ok(body) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "metrics collection failed");
            let mut resp = (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            resp.extensions_mut().insert(RawErrorBody);
            resp
        }
    }
}
