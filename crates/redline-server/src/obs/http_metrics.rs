use std::sync::Arc;

use redline_core::error::Result;
use redline_core::metrics::{Counter, Gauge, Histogram, MetricRegistry, Summary};

/// Label names shared by the per-status instruments.
pub const REQUEST_LABELS: [&str; 3] = ["method", "route", "status_code"];

/// RED instruments for inbound HTTP traffic.
pub struct HttpMetrics {
    pub info: Arc<Gauge>,
    pub requests: Arc<Counter>,
    pub duration: Arc<Histogram>,
    pub request_size: Arc<Summary>,
    pub response_size: Arc<Summary>,
    pub in_flight: Arc<Gauge>,
}

impl HttpMetrics {
    /// Register every HTTP instrument and set the static `app_info` series.
    pub fn register(
        registry: &MetricRegistry,
        duration_buckets: &[f64],
        version: &str,
        deployment: &str,
    ) -> Result<Self> {
        let info = registry.gauge(
            "app_info",
            "Application build and deployment information.",
            &["version", "deployment_type"],
        )?;
        info.set(&[version, deployment], 1)?;

        let requests = registry.counter(
            "http_requests_total",
            "Total number of HTTP requests.",
            &REQUEST_LABELS,
        )?;
        let duration = registry.histogram(
            "http_request_duration_seconds",
            "Duration of HTTP requests in seconds.",
            &REQUEST_LABELS,
            duration_buckets,
        )?;
        let request_size = registry.summary(
            "http_request_size_bytes",
            "Size of HTTP request bodies in bytes.",
            &["method", "route"],
        )?;
        let response_size = registry.summary(
            "http_response_size_bytes",
            "Size of HTTP response bodies in bytes.",
            &REQUEST_LABELS,
        )?;
        let in_flight = registry.gauge(
            "http_active_connections",
            "Number of HTTP requests currently being processed.",
            &[],
        )?;

        Ok(Self {
            info,
            requests,
            duration,
            request_size,
            response_size,
            in_flight,
        })
    }
}
