//! Shared application state for the redline server.
//!
//! Everything that used to be process-global (metric registry, lifecycle,
//! health) is built once here and handed to handlers and middleware through
//! axum's `State`.

use std::sync::Arc;

use redline_core::error::Result;
use redline_core::metrics::{process, MetricRegistry};

use crate::config::ServerConfig;
use crate::lifecycle::{AlwaysReady, HealthState, Lifecycle, ReadinessCheck};
use crate::obs::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    registry: Arc<MetricRegistry>,
    http: Arc<HttpMetrics>,
    lifecycle: Arc<Lifecycle>,
    health: HealthState,
}

impl AppState {
    /// Build application state with the default readiness check.
    /// Returns Result so main can exit non-zero before binding on bad config.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        Self::with_readiness(cfg, Arc::new(AlwaysReady))
    }

    pub fn with_readiness(cfg: ServerConfig, readiness: Arc<dyn ReadinessCheck>) -> Result<Self> {
        // 1) Metrics, in exposition order
        let registry = Arc::new(MetricRegistry::new());
        let http = HttpMetrics::register(
            &registry,
            &cfg.metrics.duration_buckets,
            &cfg.deployment.version,
            &cfg.deployment.label,
        )?;
        process::register_process_metrics(&registry, process::unix_now_secs())?;

        // 2) Lifecycle + probes
        let lifecycle = Arc::new(Lifecycle::new());
        let health = HealthState::new(
            Arc::clone(&lifecycle),
            readiness,
            cfg.deployment.version.clone(),
            cfg.environment.clone(),
        );

        tracing::debug!(instruments = registry.len(), "metric registry ready");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                http: Arc::new(http),
                lifecycle,
                health,
            }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn http_metrics(&self) -> Arc<HttpMetrics> {
        Arc::clone(&self.inner.http)
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.inner.lifecycle)
    }

    pub fn health(&self) -> &HealthState {
        &self.inner.health
    }
}
