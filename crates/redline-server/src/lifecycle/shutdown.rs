//! Shutdown controller: signal handling, connection draining, telemetry flush.
//!
//! Sequence once triggered:
//! 1. state -> `Draining` (readiness fails from this instant)
//! 2. the listener's graceful-shutdown future resolves, new connections stop
//! 3. wait for the server to finish in-flight work, bounded by the drain ceiling
//! 4. run telemetry flushers, bounded by the flush timeout
//! 5. state -> `Terminated`
//!
//! Missing the drain ceiling skips the flush and yields [`ShutdownOutcome::Forced`].

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use redline_core::error::{RedlineError, Result};
use redline_core::metrics::{Gauge, MetricRegistry};

use super::{Lifecycle, ShutdownState};
use crate::config::ShutdownSection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    /// Unrecoverable process-level fault (e.g. the server task died).
    Fault(String),
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
            Self::Fault(msg) => write!(f, "fault: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Drained and flushed after a signal.
    Clean,
    /// Drained and flushed after a process fault.
    Fault,
    /// Drain ceiling exceeded; in-flight work abandoned.
    Forced { in_flight: i64 },
}

impl ShutdownOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Fault | Self::Forced { .. } => 1,
        }
    }
}

/// Best-effort sink for buffered telemetry, run once during shutdown.
#[async_trait]
pub trait TelemetryFlusher: Send + Sync {
    fn name(&self) -> &'static str;
    async fn flush(&self) -> Result<()>;
}

/// Writes the final exposition snapshot to a file (or just logs its size).
pub struct SnapshotFlusher {
    registry: Arc<MetricRegistry>,
    path: Option<PathBuf>,
}

impl SnapshotFlusher {
    pub fn new(registry: Arc<MetricRegistry>, path: Option<PathBuf>) -> Self {
        Self { registry, path }
    }
}

#[async_trait]
impl TelemetryFlusher for SnapshotFlusher {
    fn name(&self) -> &'static str {
        "metrics-snapshot"
    }

    async fn flush(&self) -> Result<()> {
        let body = self.registry.render()?;
        match &self.path {
            Some(path) => {
                tokio::fs::write(path, body.as_bytes()).await.map_err(|e| {
                    RedlineError::Internal(format!("write snapshot {} failed: {e}", path.display()))
                })?;
                tracing::info!(
                    path = %path.display(),
                    bytes = body.len(),
                    "metrics snapshot written"
                );
            }
            None => {
                tracing::debug!(
                    bytes = body.len(),
                    "metrics snapshot rendered (no path configured)"
                );
            }
        }
        Ok(())
    }
}

pub struct ShutdownController {
    lifecycle: Arc<Lifecycle>,
    drain_timeout: Duration,
    flush_timeout: Duration,
    flushers: Vec<Arc<dyn TelemetryFlusher>>,
    in_flight: Option<Arc<Gauge>>,
    reason: Mutex<Option<ShutdownReason>>,
}

impl ShutdownController {
    pub fn new(
        lifecycle: Arc<Lifecycle>,
        drain_timeout: Duration,
        flush_timeout: Duration,
    ) -> Self {
        Self {
            lifecycle,
            drain_timeout,
            flush_timeout,
            flushers: Vec::new(),
            in_flight: None,
            reason: Mutex::new(None),
        }
    }

    pub fn from_config(lifecycle: Arc<Lifecycle>, cfg: &ShutdownSection) -> Self {
        Self::new(
            lifecycle,
            Duration::from_millis(cfg.drain_timeout_ms),
            Duration::from_millis(cfg.flush_timeout_ms),
        )
    }

    pub fn with_flusher(mut self, flusher: Arc<dyn TelemetryFlusher>) -> Self {
        self.flushers.push(flusher);
        self
    }

    /// Gauge reported when the drain ceiling is hit.
    pub fn with_in_flight(mut self, gauge: Arc<Gauge>) -> Self {
        self.in_flight = Some(gauge);
        self
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn in_flight(&self) -> i64 {
        self.in_flight.as_ref().map(|g| g.get(&[])).unwrap_or(0)
    }

    /// Begin draining. Only the first trigger takes effect.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        {
            let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                tracing::warn!(%reason, "shutdown already in progress");
                return false;
            }
            *slot = Some(reason.clone());
        }
        match &reason {
            ShutdownReason::Fault(_) => tracing::error!(
                %reason,
                in_flight = self.in_flight(),
                "fatal fault, starting graceful shutdown"
            ),
            _ => tracing::info!(
                %reason,
                in_flight = self.in_flight(),
                "signal received, starting graceful shutdown"
            ),
        }
        // readiness flips here, before the listener is told to stop
        self.lifecycle.advance(ShutdownState::Draining)
    }

    /// Future for `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn graceful_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let lifecycle = Arc::clone(&self.lifecycle);
        async move { lifecycle.draining().await }
    }

    /// Drive `server` to completion and run the shutdown sequence.
    ///
    /// `server` must stop accepting connections once [`Self::graceful_signal`]
    /// resolves and complete when its last connection closes.
    pub async fn drive<F>(&self, server: F) -> ShutdownOutcome
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::pin!(server);

        tokio::select! {
            res = &mut server => {
                if self.lifecycle.is_running() {
                    // the server stopped without being asked to
                    let msg = match res {
                        Ok(()) => "listener closed unexpectedly".to_string(),
                        Err(e) => format!("server failed: {e}"),
                    };
                    self.trigger(ShutdownReason::Fault(msg));
                } else if let Err(e) = res {
                    tracing::error!(error = %e, "server error while draining");
                }
            }
            _ = self.lifecycle.draining() => {
                tracing::info!(
                    in_flight = self.in_flight(),
                    ceiling_ms = self.drain_timeout.as_millis() as u64,
                    "draining connections"
                );
                match tokio::time::timeout(self.drain_timeout, &mut server).await {
                    Ok(Ok(())) => tracing::info!("all connections closed"),
                    Ok(Err(e)) => tracing::error!(error = %e, "server error while draining"),
                    Err(_) => {
                        let in_flight = self.in_flight();
                        tracing::error!(
                            in_flight,
                            ceiling_ms = self.drain_timeout.as_millis() as u64,
                            "drain ceiling exceeded, forcing exit"
                        );
                        self.lifecycle.advance(ShutdownState::Terminated);
                        return ShutdownOutcome::Forced { in_flight };
                    }
                }
            }
        }

        self.flush().await;
        self.lifecycle.advance(ShutdownState::Terminated);

        match self.reason() {
            Some(ShutdownReason::Fault(_)) => ShutdownOutcome::Fault,
            _ => ShutdownOutcome::Clean,
        }
    }

    async fn flush(&self) {
        let all = async {
            for f in &self.flushers {
                if let Err(e) = f.flush().await {
                    tracing::warn!(flusher = f.name(), error = %e, "telemetry flush failed");
                }
            }
        };
        if tokio::time::timeout(self.flush_timeout, all).await.is_err() {
            tracing::warn!(
                timeout_ms = self.flush_timeout.as_millis() as u64,
                "telemetry flush timed out"
            );
        }
    }
}

/// Wait for SIGINT / SIGTERM (ctrl-c only on non-unix).
pub async fn wait_for_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownReason::Interrupt,
        _ = terminate => ShutdownReason::Terminate,
    }
}

/// Forward every received signal to the controller; repeats are logged.
pub fn spawn_signal_listener(controller: Arc<ShutdownController>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let reason = wait_for_signal().await;
            controller.trigger(reason);
        }
    })
}
