//! Process lifecycle: one-way shutdown state machine, health probes, and the
//! shutdown controller.
//!
//! ```text
//! Running -> Draining -> Terminated
//! ```
//!
//! - **Running**: serving traffic, readiness may pass.
//! - **Draining**: readiness fails, listener stops accepting, in-flight
//!   requests finish.
//! - **Terminated**: telemetry flushed, process about to exit.

use std::fmt;

use tokio::sync::watch;

pub mod health;
pub mod shutdown;

pub use health::{AlwaysReady, HealthReport, HealthState, ReadinessCheck};
pub use shutdown::{
    ShutdownController, ShutdownOutcome, ShutdownReason, SnapshotFlusher, TelemetryFlusher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownState {
    Running,
    Draining,
    Terminated,
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Process-wide shutdown state, observable by probes and the listener.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<ShutdownState>,
    // keeps the channel open so waiters never see a closed sender
    _rx: watch::Receiver<ShutdownState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(ShutdownState::Running);
        Self { tx, _rx: rx }
    }

    pub fn state(&self) -> ShutdownState {
        *self.tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ShutdownState::Running
    }

    /// Move forward to `to`. Returns `false` if the state is already at or
    /// past `to`; the state never moves backwards.
    pub fn advance(&self, to: ShutdownState) -> bool {
        let moved = self.tx.send_if_modified(|current| {
            if to > *current {
                *current = to;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::info!(state = %to, "lifecycle transition");
        }
        moved
    }

    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.tx.subscribe()
    }

    /// Resolves once the state has left `Running`.
    pub async fn draining(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| *s != ShutdownState::Running).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn transitions_are_one_way() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), ShutdownState::Running);

        assert!(lc.advance(ShutdownState::Draining));
        assert!(!lc.advance(ShutdownState::Draining));
        assert!(!lc.advance(ShutdownState::Running));
        assert_eq!(lc.state(), ShutdownState::Draining);

        assert!(lc.advance(ShutdownState::Terminated));
        assert!(!lc.advance(ShutdownState::Draining));
        assert_eq!(lc.state(), ShutdownState::Terminated);
    }

    #[tokio::test]
    async fn draining_resolves_after_transition() {
        let lc = Arc::new(Lifecycle::new());
        let waiter = {
            let lc = Arc::clone(&lc);
            tokio::spawn(async move { lc.draining().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        lc.advance(ShutdownState::Draining);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("draining future resolves")
            .expect("task joins");
    }

    #[tokio::test]
    async fn draining_resolves_immediately_when_already_past_running() {
        let lc = Lifecycle::new();
        lc.advance(ShutdownState::Terminated);
        tokio::time::timeout(Duration::from_millis(100), lc.draining())
            .await
            .expect("already draining");
    }
}
