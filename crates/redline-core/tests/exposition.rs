//! Exposition format tests for the metric registry.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use redline_core::metrics::{process, GaugeFn, MetricRegistry};
use redline_core::RedlineError;

fn populated() -> MetricRegistry {
    let reg = MetricRegistry::new();
    let info = reg.gauge("app_info", "Build info.", &["version", "deployment_type"]).unwrap();
    info.set(&["1.2.3", "blue"], 1).unwrap();

    let reqs = reg
        .counter("http_requests_total", "Total requests.", &["method", "route", "status_code"])
        .unwrap();
    reqs.inc(&["GET", "/health", "200"]).unwrap();
    reqs.inc(&["GET", "/health", "200"]).unwrap();
    reqs.inc(&["GET", "/api/error", "500"]).unwrap();

    let dur = reg
        .histogram(
            "http_request_duration_seconds",
            "Request duration.",
            &["method", "route", "status_code"],
            &[0.01, 0.1, 1.0],
        )
        .unwrap();
    dur.observe(&["GET", "/health", "200"], 0.002).unwrap();
    dur.observe(&["GET", "/health", "200"], 0.3).unwrap();

    let size = reg
        .summary("http_request_size_bytes", "Request size.", &["method", "route"])
        .unwrap();
    size.observe(&["POST", "/api/echo"], 17.0).unwrap();

    reg.gauge("http_active_connections", "In flight.", &[]).unwrap();
    reg
}

#[test]
fn one_type_line_per_instrument() {
    let reg = populated();
    let body = reg.render().unwrap();
    for (name, kind) in [
        ("app_info", "gauge"),
        ("http_requests_total", "counter"),
        ("http_request_duration_seconds", "histogram"),
        ("http_request_size_bytes", "summary"),
        ("http_active_connections", "gauge"),
    ] {
        let type_line = format!("# TYPE {name} {kind}");
        assert_eq!(body.matches(&type_line).count(), 1, "{type_line}");
        assert!(body.contains(&format!("# HELP {name} ")));
    }
}

#[test]
fn families_render_in_registration_order() {
    let body = populated().render().unwrap();
    let types: Vec<&str> = body
        .lines()
        .filter_map(|l| l.strip_prefix("# TYPE "))
        .map(|l| l.split(' ').next().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "app_info",
            "http_requests_total",
            "http_request_duration_seconds",
            "http_request_size_bytes",
            "http_active_connections",
        ]
    );
}

#[test]
fn data_lines_have_expected_shape() {
    let body = populated().render().unwrap();
    assert!(body.contains("app_info{version=\"1.2.3\",deployment_type=\"blue\"} 1\n"));
    assert!(body.contains(
        "http_requests_total{method=\"GET\",route=\"/health\",status_code=\"200\"} 2\n"
    ));
    assert!(body.contains(
        "http_requests_total{method=\"GET\",route=\"/api/error\",status_code=\"500\"} 1\n"
    ));
    assert!(body.contains(
        "http_request_duration_seconds_bucket{method=\"GET\",route=\"/health\",status_code=\"200\",le=\"0.01\"} 1\n"
    ));
    assert!(body.contains(
        "http_request_duration_seconds_bucket{method=\"GET\",route=\"/health\",status_code=\"200\",le=\"+Inf\"} 2\n"
    ));
    assert!(body.contains(
        "http_request_duration_seconds_count{method=\"GET\",route=\"/health\",status_code=\"200\"} 2\n"
    ));
    assert!(body.contains("http_request_size_bytes_sum{method=\"POST\",route=\"/api/echo\"} 17\n"));
    assert!(
        body.contains("http_request_size_bytes_count{method=\"POST\",route=\"/api/echo\"} 1\n")
    );
    assert!(body.contains("http_active_connections 0\n"));
}

#[test]
fn rescrape_without_traffic_is_identical() {
    let reg = populated();
    let first = reg.render().unwrap();
    let second = reg.render().unwrap();
    assert_eq!(first, second);
}

#[test]
fn bucket_counts_never_decrease() {
    let reg = MetricRegistry::new();
    let bounds = [0.001, 0.01, 0.1, 1.0, 10.0];
    let h = reg.histogram("op_seconds", "ops", &["op"], &bounds).unwrap();

    let mut total = 0u64;
    for i in 0..500u32 {
        let v = f64::from(i % 97) * 0.0137 + f64::from(i % 7) * 0.9;
        h.observe(&["x"], v).unwrap();
        total += 1;
    }

    let snap = h.snapshot(&["x"]).unwrap();
    let counts: Vec<u64> = snap.buckets.iter().map(|(_, c)| *c).collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    assert!(counts.last().copied().unwrap() <= snap.count);
    assert_eq!(snap.count, total);

    let body = reg.render().unwrap();
    assert!(body.contains(&format!("op_seconds_bucket{{op=\"x\",le=\"+Inf\"}} {total}\n")));
    assert!(body.contains(&format!("op_seconds_count{{op=\"x\"}} {total}\n")));
}

#[test]
fn registration_errors_are_metrics_errors() {
    let reg = MetricRegistry::new();
    reg.counter("dup_total", "x", &[]).unwrap();
    let err = reg.counter("dup_total", "x", &[]).unwrap_err();
    assert_eq!(err.client_code().as_str(), "METRICS");

    let err = reg
        .histogram("bad_seconds", "x", &[], &[1.0, 1.0])
        .unwrap_err();
    assert!(matches!(err, RedlineError::InvalidBuckets { .. }));
}

#[test]
fn process_collector_registers_two_gauges() {
    let reg = MetricRegistry::new();
    process::register_process_metrics(&reg, 1_700_000_000.0).unwrap();
    let body = reg.render().unwrap();
    assert!(body.contains("# TYPE process_resident_memory_bytes gauge"));
    assert!(body.contains("process_start_time_seconds 1700000000\n"));

    let again = process::register_process_metrics(&reg, 0.0).unwrap_err();
    assert!(matches!(again, RedlineError::DuplicateMetric(_)));
}

#[test]
fn help_text_is_escaped() {
    let reg = MetricRegistry::new();
    reg.register(Arc::new(GaugeFn::new("weird", "line one\nline \\ two", || 1.0).unwrap()))
        .unwrap();
    let body = reg.render().unwrap();
    assert!(body.starts_with("# HELP weird line one\\nline \\\\ two\n"));
}
