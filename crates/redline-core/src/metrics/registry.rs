//! Metric registry: ordered, name-unique set of metric families.
//!
//! Registration normally happens once at startup, so the family list sits
//! behind a `RwLock`; scrapes clone the `Arc`s out and render without holding
//! the lock. Values themselves live in per-series atomics inside each
//! instrument, which keeps concurrent scrapes and writers from corrupting one
//! another (reads may be slightly stale, never torn).

use std::sync::{Arc, PoisonError, RwLock};

use super::{Counter, Gauge, Histogram, Metric, Summary};
use crate::error::{RedlineError, Result};

#[derive(Default)]
pub struct MetricRegistry {
    metrics: RwLock<Vec<Arc<dyn Metric>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric family. Names must be unique.
    pub fn register(&self, metric: Arc<dyn Metric>) -> Result<()> {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let name = metric.desc().name();
        if metrics.iter().any(|m| m.desc().name() == name) {
            return Err(RedlineError::DuplicateMetric(name.to_string()));
        }
        tracing::debug!(metric = name, kind = %metric.kind(), "metric registered");
        metrics.push(metric);
        Ok(())
    }

    pub fn counter(&self, name: &str, help: &str, labels: &[&str]) -> Result<Arc<Counter>> {
        let c = Arc::new(Counter::new(name, help, labels)?);
        self.register(c.clone())?;
        Ok(c)
    }

    pub fn gauge(&self, name: &str, help: &str, labels: &[&str]) -> Result<Arc<Gauge>> {
        let g = Arc::new(Gauge::new(name, help, labels)?);
        self.register(g.clone())?;
        Ok(g)
    }

    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        bounds: &[f64],
    ) -> Result<Arc<Histogram>> {
        let h = Arc::new(Histogram::new(name, help, labels, bounds)?);
        self.register(h.clone())?;
        Ok(h)
    }

    pub fn summary(&self, name: &str, help: &str, labels: &[&str]) -> Result<Arc<Summary>> {
        let s = Arc::new(Summary::new(name, help, labels)?);
        self.register(s.clone())?;
        Ok(s)
    }

    pub fn len(&self) -> usize {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily yield exposition lines (without trailing newline), one metric
    /// family at a time, in registration order.
    pub fn collect(&self) -> Collect {
        let families = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Collect {
            families: families.into_iter(),
            pending: Vec::new().into_iter(),
        }
    }

    /// Render every family into one exposition body.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        for line in self.collect() {
            out.push_str(&line?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Iterator returned by [`MetricRegistry::collect`].
pub struct Collect {
    families: std::vec::IntoIter<Arc<dyn Metric>>,
    pending: std::vec::IntoIter<String>,
}

impl Iterator for Collect {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.next() {
                return Some(Ok(line));
            }
            let metric = self.families.next()?;
            let mut buf = String::new();
            let rendered = metric
                .desc()
                .write_header(metric.kind().as_str(), &mut buf)
                .and_then(|_| metric.render_series(&mut buf));
            if let Err(e) = rendered {
                return Some(Err(RedlineError::Render(format!(
                    "{}: {e}",
                    metric.desc().name()
                ))));
            }
            let lines: Vec<String> = buf.lines().map(str::to_string).collect();
            self.pending = lines.into_iter();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let reg = MetricRegistry::new();
        reg.counter("requests_total", "a", &[]).unwrap();
        let err = reg.gauge("requests_total", "b", &[]).unwrap_err();
        assert!(matches!(err, RedlineError::DuplicateMetric(ref n) if n == "requests_total"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn collect_is_lazy_and_ordered() {
        let reg = MetricRegistry::new();
        reg.gauge("b_gauge", "second", &[]).unwrap();
        reg.counter("a_total", "first", &[]).unwrap();

        let mut lines = reg.collect();
        assert_eq!(lines.next().unwrap().unwrap(), "# HELP b_gauge second");
        assert_eq!(lines.next().unwrap().unwrap(), "# TYPE b_gauge gauge");
        assert_eq!(lines.next().unwrap().unwrap(), "b_gauge 0");
        assert_eq!(lines.next().unwrap().unwrap(), "# HELP a_total first");
    }
}
