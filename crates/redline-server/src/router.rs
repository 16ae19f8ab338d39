//! Axum router wiring.
//!
//! Layer order, outermost first: request observer, 5xx redaction, JSON error
//! normalisation, panic recovery, then the handler. The observer therefore
//! sees the final status of every request, including recovered panics, 404
//! fallbacks and 405s from method routing.

use axum::{middleware, routing::get, Router};

use crate::{api, app_state::AppState, error, obs, ops};

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(ops::health))
        .route("/health/live", get(ops::live))
        .route("/health/ready", get(ops::ready))
        .route("/metrics", get(ops::metrics))
        .merge(api::routes());
    instrument(routes, state)
}

/// Attach the fallback and the instrumentation stack to `routes`.
pub fn instrument(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .fallback(api::not_found)
        .layer(middleware::from_fn(error::catch_panic))
        .layer(middleware::from_fn(error::json_error_responses))
        .layer(middleware::from_fn_with_state(state.clone(), error::redact_internal_errors))
        .layer(middleware::from_fn_with_state(state.clone(), obs::observe_request))
        .with_state(state)
}
