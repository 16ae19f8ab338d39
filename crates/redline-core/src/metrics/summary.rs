use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::atomic::AtomicF64;
use super::{write_value, Desc, Metric, MetricKind};
use crate::error::{RedlineError, Result};

#[derive(Debug, Default)]
struct Series {
    sum: AtomicF64,
    count: AtomicU64,
}

/// Running sum/count per label series (no quantiles).
#[derive(Debug)]
pub struct Summary {
    desc: Desc,
    map: DashMap<Vec<String>, Series>,
}

impl Summary {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = Desc::new(name, help, label_names)?;
        let map = DashMap::new();
        if label_names.is_empty() {
            map.insert(Vec::new(), Series::default());
        }
        Ok(Self { desc, map })
    }

    pub fn observe(&self, labels: &[&str], value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(RedlineError::InvalidValue {
                metric: self.desc.name().to_string(),
                value: value.to_string(),
            });
        }
        let key = self.desc.key(labels)?;
        let series = self.map.entry(key).or_insert_with(Series::default);
        series.sum.add(value);
        series.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// `(sum, count)` for a series.
    pub fn get(&self, labels: &[&str]) -> Option<(f64, u64)> {
        let key: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        self.map
            .get(&key)
            .map(|s| (s.sum.get(), s.count.load(Ordering::Relaxed)))
    }
}

impl Metric for Summary {
    fn desc(&self) -> &Desc {
        &self.desc
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Summary
    }

    fn render_series(&self, out: &mut String) -> fmt::Result {
        let mut rows: Vec<(Vec<String>, f64, u64)> = self
            .map
            .iter()
            .map(|r| {
                let s = r.value();
                (r.key().clone(), s.sum.get(), s.count.load(Ordering::Relaxed))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let name = self.desc.name();
        for (key, sum, count) in rows {
            write!(out, "{name}_sum")?;
            self.desc.write_labels(out, &key, None)?;
            out.push(' ');
            write_value(out, sum)?;
            out.push('\n');

            write!(out, "{name}_count")?;
            self.desc.write_labels(out, &key, None)?;
            writeln!(out, " {count}")?;
        }
        Ok(())
    }
}
