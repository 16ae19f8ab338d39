//! In-process metric instruments and the registry that exposes them.
//!
//! Instruments are stored as atomics behind a `DashMap` keyed by the ordered
//! tuple of label values, so writers on different series never contend and a
//! scrape only takes short shard read locks. Rendering follows the Prometheus
//! text exposition format (version 0.0.4).

mod atomic;
pub mod counter;
pub mod desc;
pub mod gauge;
pub mod histogram;
pub mod process;
pub mod registry;
pub mod summary;

use std::fmt;

pub use counter::Counter;
pub use desc::Desc;
pub use gauge::{Gauge, GaugeFn};
pub use histogram::{Histogram, DEFAULT_DURATION_BUCKETS};
pub use registry::{Collect, MetricRegistry};
pub use summary::Summary;

/// Exposition type of a metric family (`# TYPE` line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric family the registry can expose.
///
/// Implementations render only their data lines; the registry writes the
/// `# HELP` / `# TYPE` header. Rendering must not mutate recorded values.
pub trait Metric: Send + Sync {
    fn desc(&self) -> &Desc;
    fn kind(&self) -> MetricKind;
    fn render_series(&self, out: &mut String) -> fmt::Result;
}

/// Format a sample value the way Prometheus parsers expect.
pub(crate) fn write_value(out: &mut String, v: f64) -> fmt::Result {
    use fmt::Write;
    if v.is_nan() {
        out.write_str("NaN")
    } else if v.is_infinite() {
        out.write_str(if v > 0.0 { "+Inf" } else { "-Inf" })
    } else {
        write!(out, "{v}")
    }
}
