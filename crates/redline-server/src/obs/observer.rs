//! RED middleware.
//!
//! A [`RequestObservation`] is opened before the handler chain runs and closed
//! exactly once: by [`RequestObservation::finish`] when a response exists, or
//! by `Drop` when the request future is abandoned (client disconnect). Either
//! way the in-flight gauge is released.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::HttpMetrics;
use crate::app_state::AppState;

/// Status recorded for requests dropped before a response was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn response_size(resp: &Response) -> Option<u64> {
    content_length(resp.headers()).or_else(|| resp.body().size_hint().exact())
}

/// Route template when a route matched, raw path otherwise (e.g. 404s).
fn route_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

pub struct RequestObservation {
    metrics: Arc<HttpMetrics>,
    method: String,
    route: String,
    started: Instant,
    request_bytes: Option<u64>,
    done: bool,
}

impl RequestObservation {
    /// Open an observation and count the request as in flight.
    pub fn begin(
        metrics: Arc<HttpMetrics>,
        method: impl Into<String>,
        route: impl Into<String>,
        request_bytes: Option<u64>,
    ) -> Self {
        if let Err(e) = metrics.in_flight.inc(&[]) {
            tracing::warn!(error = %e, "in-flight gauge update failed");
        }
        Self {
            metrics,
            method: method.into(),
            route: route.into(),
            started: Instant::now(),
            request_bytes,
            done: false,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Close the observation with the final status.
    pub fn finish(mut self, status: u16, response_bytes: Option<u64>) {
        self.record(status, response_bytes);
    }

    fn record(&mut self, status: u16, response_bytes: Option<u64>) {
        if self.done {
            return;
        }
        self.done = true;

        let elapsed = self.started.elapsed();
        let status = status.to_string();
        let labels = [self.method.as_str(), self.route.as_str(), status.as_str()];
        let m = &self.metrics;

        let mut results = vec![
            m.requests.inc(&labels),
            m.duration.observe(&labels, elapsed.as_secs_f64()),
        ];
        if let Some(n) = self.request_bytes {
            results.push(m.request_size.observe(&labels[..2], n as f64));
        }
        if let Some(n) = response_bytes {
            results.push(m.response_size.observe(&labels, n as f64));
        }
        results.push(m.in_flight.dec(&[]));

        for e in results.into_iter().filter_map(|r| r.err()) {
            tracing::warn!(error = %e, route = %self.route, "request metric update failed");
        }

        tracing::debug!(
            method = %self.method,
            route = %self.route,
            status = %status,
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            "request completed"
        );
    }
}

impl Drop for RequestObservation {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(
                method = %self.method,
                route = %self.route,
                "request abandoned before response"
            );
            self.record(CLIENT_CLOSED_REQUEST, None);
        }
    }
}

/// axum middleware: wrap the handler chain in a [`RequestObservation`].
pub async fn observe_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let obs = RequestObservation::begin(
        state.http_metrics(),
        req.method().as_str(),
        route_label(&req),
        content_length(req.headers()),
    );

    let resp = next.run(req).await;
    obs.finish(resp.status().as_u16(), response_size(&resp));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::metrics::MetricRegistry;

    fn metrics() -> Arc<HttpMetrics> {
        let reg = MetricRegistry::new();
        Arc::new(HttpMetrics::register(&reg, &[0.1, 1.0], "0.0.0", "test").unwrap())
    }

    #[test]
    fn finish_records_once() {
        let m = metrics();
        let obs = RequestObservation::begin(m.clone(), "POST", "/api/echo", Some(12));
        assert_eq!(m.in_flight.get(&[]), 1);
        obs.finish(200, Some(30));

        assert_eq!(m.in_flight.get(&[]), 0);
        assert_eq!(m.requests.get(&["POST", "/api/echo", "200"]), 1);
        assert_eq!(m.request_size.get(&["POST", "/api/echo"]), Some((12.0, 1)));
        assert_eq!(m.response_size.get(&["POST", "/api/echo", "200"]), Some((30.0, 1)));
    }

    #[test]
    fn drop_without_finish_records_client_abort() {
        let m = metrics();
        {
            let _obs = RequestObservation::begin(m.clone(), "GET", "/api/slow", None);
            assert_eq!(m.in_flight.get(&[]), 1);
        }
        assert_eq!(m.in_flight.get(&[]), 0);
        assert_eq!(m.requests.get(&["GET", "/api/slow", "499"]), 1);
        assert!(m.request_size.get(&["GET", "/api/slow"]).is_none());
    }

    #[test]
    fn content_length_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(content_length(&h), None);
        h.insert(header::CONTENT_LENGTH, "42".parse().unwrap());
        assert_eq!(content_length(&h), Some(42));
        h.insert(header::CONTENT_LENGTH, "nope".parse().unwrap());
        assert_eq!(content_length(&h), None);
    }
}
