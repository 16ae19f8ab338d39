use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{Desc, Metric, MetricKind};
use crate::error::{RedlineError, Result};

/// Monotonic counter, one `u64` per label series.
#[derive(Debug)]
pub struct Counter {
    desc: Desc,
    map: DashMap<Vec<String>, AtomicU64>,
}

impl Counter {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = Desc::new(name, help, label_names)?;
        let map = DashMap::new();
        if label_names.is_empty() {
            map.insert(Vec::new(), AtomicU64::new(0));
        }
        Ok(Self { desc, map })
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[&str]) -> Result<()> {
        self.add(labels, 1)
    }

    /// Increment by `delta`. Negative deltas are rejected.
    pub fn inc_by(&self, labels: &[&str], delta: i64) -> Result<()> {
        let v = u64::try_from(delta).map_err(|_| RedlineError::InvalidValue {
            metric: self.desc.name().to_string(),
            value: delta.to_string(),
        })?;
        self.add(labels, v)
    }

    fn add(&self, labels: &[&str], v: u64) -> Result<()> {
        let key = self.desc.key(labels)?;
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
        Ok(())
    }

    /// Current value of a series (0 if it was never touched).
    pub fn get(&self, labels: &[&str]) -> u64 {
        let key: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        self.map
            .get(&key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl Metric for Counter {
    fn desc(&self) -> &Desc {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Counter
    }

    fn render_series(&self, out: &mut String) -> fmt::Result {
        let mut rows: Vec<(Vec<String>, u64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, val) in rows {
            out.push_str(self.desc.name());
            self.desc.write_labels(out, &key, None)?;
            writeln!(out, " {val}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn negative_delta_is_rejected() {
        let c = Counter::new("jobs_total", "jobs", &["kind"]).unwrap();
        c.inc_by(&["a"], 3).unwrap();
        let err = c.inc_by(&["a"], -1).unwrap_err();
        assert!(matches!(err, RedlineError::InvalidValue { .. }));
        assert_eq!(c.get(&["a"]), 3);
    }

    #[test]
    fn series_created_on_first_touch() {
        let c = Counter::new("jobs_total", "jobs", &["kind"]).unwrap();
        assert_eq!(c.get(&["b"]), 0);
        c.inc(&["b"]).unwrap();
        c.inc(&["b"]).unwrap();
        assert_eq!(c.get(&["b"]), 2);

        let mut out = String::new();
        c.render_series(&mut out).unwrap();
        assert_eq!(out, "jobs_total{kind=\"b\"} 2\n");
    }

    #[test]
    fn unlabeled_counter_renders_zero() {
        let c = Counter::new("restarts_total", "restarts", &[]).unwrap();
        let mut out = String::new();
        c.render_series(&mut out).unwrap();
        assert_eq!(out, "restarts_total 0\n");
    }
}
