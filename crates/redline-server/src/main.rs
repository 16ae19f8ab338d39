//! redline server
//!
//! - RED metrics for every request, scraped at /metrics
//! - Probes: /health, /health/live, /health/ready
//! - SIGINT/SIGTERM: flip readiness, drain, flush, exit

use std::process::ExitCode;
use std::sync::Arc;

use redline_server::{app_state, config, lifecycle, logging, server};

#[tokio::main]
async fn main() -> ExitCode {
    // Config errors are fatal before anything binds.
    let cfg = match config::load_from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            logging::init(&config::LogSection::default());
            tracing::error!(error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&cfg.log);

    let listen = match cfg.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "invalid listen address");
            return ExitCode::FAILURE;
        }
    };

    let state = match app_state::AppState::new(cfg) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(listen).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%listen, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let controller = Arc::new(server::controller_for(&state));
    lifecycle::shutdown::spawn_signal_listener(Arc::clone(&controller));

    tracing::info!(
        %listen,
        version = %state.cfg().deployment.version,
        deployment = %state.cfg().deployment.label,
        environment = %state.cfg().environment,
        "redline-server starting"
    );

    let outcome = server::run(listener, state, controller).await;
    match outcome {
        lifecycle::ShutdownOutcome::Forced { .. } => {
            // hard deadline: do not wait for abandoned connection tasks
            std::process::exit(i32::from(outcome.exit_code()));
        }
        _ => {
            tracing::info!(?outcome, "shutdown complete");
            ExitCode::from(outcome.exit_code())
        }
    }
}
