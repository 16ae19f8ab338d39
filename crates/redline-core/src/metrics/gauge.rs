use std::fmt::{self, Write};
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

use super::{write_value, Desc, Metric, MetricKind};
use crate::error::Result;

/// Up/down gauge, one `i64` per label series.
#[derive(Debug)]
pub struct Gauge {
    desc: Desc,
    map: DashMap<Vec<String>, AtomicI64>,
}

impl Gauge {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = Desc::new(name, help, label_names)?;
        let map = DashMap::new();
        if label_names.is_empty() {
            map.insert(Vec::new(), AtomicI64::new(0));
        }
        Ok(Self { desc, map })
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[&str]) -> Result<()> {
        self.add(labels, 1)
    }

    /// Decrement by 1.
    pub fn dec(&self, labels: &[&str]) -> Result<()> {
        self.add(labels, -1)
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[&str], v: i64) -> Result<()> {
        let key = self.desc.key(labels)?;
        let gauge = self.map.entry(key).or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
        Ok(())
    }

    /// Overwrite the series value.
    pub fn set(&self, labels: &[&str], v: i64) -> Result<()> {
        let key = self.desc.key(labels)?;
        let gauge = self.map.entry(key).or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
        Ok(())
    }

    pub fn get(&self, labels: &[&str]) -> i64 {
        let key: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        self.map
            .get(&key)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl Metric for Gauge {
    fn desc(&self) -> &Desc {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn render_series(&self, out: &mut String) -> fmt::Result {
        let mut rows: Vec<(Vec<String>, i64)> = self
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

type Sampler = Box<dyn Fn() -> f64 + Send + Sync>;

/// Unlabeled gauge whose value is sampled at scrape time.
pub struct GaugeFn {
    desc: Desc,
    sample: Sampler,
}

impl GaugeFn {
    pub fn new<F>(name: &str, help: &str, sample: F) -> Result<Self>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Ok(Self {
            desc: Desc::new(name, help, &[])?,
            sample: Box::new(sample),
        })
    }
}

impl Metric for GaugeFn {
    fn desc(&self) -> &Desc {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn render_series(&self, out: &mut String) -> fmt::Result {
        write!(out, "{} ", self.desc.name())?;
        write_value(out, (self.sample)())?;
        out.push('\n');
        Ok(())
    }
}
