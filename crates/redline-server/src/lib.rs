//! redline server library entry.
//!
//! This crate wires the metric registry, request observer, health probes, and
//! shutdown controller into an axum service. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod obs;
pub mod ops;
pub mod router;
pub mod server;
