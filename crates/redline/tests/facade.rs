#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use redline::core::metrics::MetricRegistry;
use redline::server::{app_state::AppState, config::ServerConfig};

#[test]
fn facade_exposes_registry_and_server_state() {
    let reg = MetricRegistry::new();
    let hits = reg.counter("facade_hits_total", "Hits through the facade.", &[]).unwrap();
    hits.inc(&[]).unwrap();
    assert!(reg.render().unwrap().contains("facade_hits_total 1"));

    let state = AppState::new(ServerConfig::default()).unwrap();
    assert!(state.registry().len() >= 6);
    assert!(state.health().is_alive());
}
