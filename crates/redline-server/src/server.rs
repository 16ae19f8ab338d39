//! Serve loop tying the router to the shutdown controller.

use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app_state::AppState;
use crate::lifecycle::{ShutdownController, ShutdownOutcome, SnapshotFlusher};
use crate::router;

/// Controller wired to the state's lifecycle, in-flight gauge, and snapshot flusher.
pub fn controller_for(state: &AppState) -> ShutdownController {
    let cfg = &state.cfg().shutdown;
    let snapshot = SnapshotFlusher::new(
        state.registry(),
        cfg.snapshot_path.as_ref().map(Into::into),
    );
    ShutdownController::from_config(state.lifecycle(), cfg)
        .with_in_flight(Arc::clone(&state.http_metrics().in_flight))
        .with_flusher(Arc::new(snapshot))
}

/// Serve `state` on `listener` until the controller finishes shutting down.
///
/// The server runs in its own task so a panic inside it surfaces as a
/// `JoinError` and goes through the same graceful path as a signal.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    controller: Arc<ShutdownController>,
) -> ShutdownOutcome {
    let app = router::build_router(state);
    let graceful = controller.graceful_signal();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await
    });

    controller
        .drive(async move {
            match server.await {
                Ok(res) => res,
                Err(e) => Err(io::Error::new(io::ErrorKind::Other, format!("server task: {e}"))),
            }
        })
        .await
}
