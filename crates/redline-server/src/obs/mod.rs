//! Request instrumentation.
//!
//! `HttpMetrics` owns handles to the RED instruments registered in the shared
//! `MetricRegistry`; `observe_request` is the axum middleware that feeds them.

pub mod http_metrics;
pub mod observer;

pub use http_metrics::HttpMetrics;
pub use observer::{observe_request, RequestObservation, CLIENT_CLOSED_REQUEST};
