//! Cumulative histogram with fixed bucket boundaries.
//!
//! Each series stores one non-cumulative count per bucket plus an overflow
//! slot. `observe` finds the target bucket with a binary search; the render
//! path folds the counts into the cumulative `le` view. Because `+Inf` and
//! `_count` are derived from the same fold, a scrape that races with writers
//! still yields non-decreasing buckets and `+Inf == _count`.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::atomic::AtomicF64;
use super::{write_value, Desc, Metric, MetricKind};
use crate::error::{RedlineError, Result};

/// Default request-duration boundaries in seconds.
pub const DEFAULT_DURATION_BUCKETS: [f64; 11] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

#[derive(Debug)]
struct Series {
    // len = bounds.len() + 1, last slot is (bound_max, +Inf)
    counts: Box<[AtomicU64]>,
    sum: AtomicF64,
}

impl Series {
    fn new(n_bounds: usize) -> Self {
        Self {
            counts: (0..=n_bounds).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::default(),
        }
    }
}

/// Snapshot of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper_bound, cumulative_count)`, excluding `+Inf`.
    pub buckets: Vec<(f64, u64)>,
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug)]
pub struct Histogram {
    desc: Desc,
    bounds: Vec<f64>,
    map: DashMap<Vec<String>, Series>,
}

impl Histogram {
    pub fn new(name: &str, help: &str, label_names: &[&str], bounds: &[f64]) -> Result<Self> {
        let desc = Desc::new(name, help, label_names)?;
        validate_bounds(name, bounds)?;
        if label_names.iter().any(|l| *l == "le") {
            return Err(RedlineError::Config(format!(
                "histogram {name} must not declare an `le` label"
            )));
        }
        let map = DashMap::new();
        if label_names.is_empty() {
            map.insert(Vec::new(), Series::new(bounds.len()));
        }
        Ok(Self {
            desc,
            bounds: bounds.to_vec(),
            map,
        })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one observation.
    pub fn observe(&self, labels: &[&str], value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(RedlineError::InvalidValue {
                metric: self.desc.name().to_string(),
                value: value.to_string(),
            });
        }
        let key = self.desc.key(labels)?;
        let n = self.bounds.len();
        let series = self.map.entry(key).or_insert_with(|| Series::new(n));

        // first bound >= value; n means overflow
        let idx = self.bounds.partition_point(|b| *b < value);
        series.counts[idx].fetch_add(1, Ordering::Relaxed);
        series.sum.add(value);
        Ok(())
    }

    pub fn snapshot(&self, labels: &[&str]) -> Option<HistogramSnapshot> {
        let key: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        self.map.get(&key).map(|s| self.fold(&s))
    }

    fn fold(&self, series: &Series) -> HistogramSnapshot {
        let mut running = 0u64;
        let mut buckets = Vec::with_capacity(self.bounds.len());
        for (i, &le) in self.bounds.iter().enumerate() {
            running += series.counts[i].load(Ordering::Relaxed);
            buckets.push((le, running));
        }
        running += series.counts[self.bounds.len()].load(Ordering::Relaxed);
        HistogramSnapshot {
            buckets,
            count: running,
            sum: series.sum.get(),
        }
    }
}

fn validate_bounds(name: &str, bounds: &[f64]) -> Result<()> {
    let invalid = |reason: &str| RedlineError::InvalidBuckets {
        metric: name.to_string(),
        reason: reason.to_string(),
    };
    if bounds.is_empty() {
        return Err(invalid("at least one bucket is required"));
    }
    if bounds.iter().any(|b| !b.is_finite()) {
        return Err(invalid("bucket bounds must be finite (+Inf is implicit)"));
    }
    if bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid("bucket bounds must be strictly ascending"));
    }
    Ok(())
}

impl Metric for Histogram {
    fn desc(&self) -> &Desc {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Histogram
    }

    fn render_series(&self, out: &mut String) -> fmt::Result {
        let mut rows: Vec<(Vec<String>, HistogramSnapshot)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), self.fold(r.value())))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let name = self.desc.name();
        for (key, snap) in rows {
            for (le, count) in &snap.buckets {
                let mut le_str = String::new();
                write_value(&mut le_str, *le)?;
                write!(out, "{name}_bucket")?;
                self.desc.write_labels(out, &key, Some(("le", &le_str)))?;
                writeln!(out, " {count}")?;
            }
            write!(out, "{name}_bucket")?;
            self.desc.write_labels(out, &key, Some(("le", "+Inf")))?;
            writeln!(out, " {}", snap.count)?;

            write!(out, "{name}_sum")?;
            self.desc.write_labels(out, &key, None)?;
            out.push(' ');
            write_value(out, snap.sum)?;
            out.push('\n');

            write!(out, "{name}_count")?;
            self.desc.write_labels(out, &key, None)?;
            writeln!(out, " {}", snap.count)?;
        }
        Ok(())
    }
}
