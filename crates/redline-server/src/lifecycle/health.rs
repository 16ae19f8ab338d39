//! Liveness, readiness, and the detailed health snapshot.
//!
//! Probes only read state. Moving to `Draining` is the shutdown controller's
//! job; readiness simply reports failure from then on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

use redline_core::metrics::process;

use super::{Lifecycle, ShutdownState};
use crate::clock::{format_uptime, rfc3339_now};

/// Dependency check consulted by the readiness probe while running.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    async fn ready(&self) -> bool;
}

/// Default check: no external dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

#[async_trait]
impl ReadinessCheck for AlwaysReady {
    async fn ready(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Uptime {
    pub seconds: u64,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: &'static str,
    pub arch: &'static str,
    pub runtime_version: &'static str,
    pub hostname: String,
    pub total_memory: u64,
    pub free_memory: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfo {
    pub rss: u64,
    pub heap_total: u64,
    pub heap_used: u64,
    pub external: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub memory: MemoryInfo,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub version: String,
    pub uptime: Uptime,
    pub system: SystemInfo,
    pub process: ProcessInfo,
    pub environment: String,
}

fn runtime_version() -> &'static str {
    match option_env!("CARGO_PKG_RUST_VERSION") {
        Some(v) if !v.is_empty() => v,
        _ => "unknown",
    }
}

pub struct HealthState {
    started_at: Instant,
    lifecycle: Arc<Lifecycle>,
    readiness: Arc<dyn ReadinessCheck>,
    version: String,
    environment: String,
}

impl HealthState {
    pub fn new(
        lifecycle: Arc<Lifecycle>,
        readiness: Arc<dyn ReadinessCheck>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            lifecycle,
            readiness,
            version: version.into(),
            environment: environment.into(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Alive from start until the process has finished shutting down.
    pub fn is_alive(&self) -> bool {
        self.lifecycle.state() != ShutdownState::Terminated
    }

    /// Ready only while running and the dependency check passes.
    pub async fn is_ready(&self) -> bool {
        if !self.lifecycle.is_running() {
            return false;
        }
        let ok = self.readiness.ready().await;
        // draining may have started while the check was pending
        ok && self.lifecycle.is_running()
    }

    pub fn report(&self) -> HealthReport {
        let uptime = self.uptime();
        let mem = process::process_memory();
        let sys = process::system_memory();
        HealthReport {
            status: "healthy",
            timestamp: rfc3339_now(),
            version: self.version.clone(),
            uptime: Uptime {
                seconds: uptime.as_secs(),
                formatted: format_uptime(uptime),
            },
            system: SystemInfo {
                platform: std::env::consts::OS,
                arch: std::env::consts::ARCH,
                runtime_version: runtime_version(),
                hostname: process::hostname(),
                total_memory: sys.total,
                free_memory: sys.available,
            },
            process: ProcessInfo {
                pid: std::process::id(),
                memory: MemoryInfo {
                    rss: mem.rss,
                    heap_total: mem.vm_data,
                    heap_used: mem.rss_anon,
                    external: mem.rss_file,
                },
            },
            environment: self.environment.clone(),
        }
    }
}
