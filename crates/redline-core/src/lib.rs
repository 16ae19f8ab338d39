//! redline core: transport-agnostic metric instruments, registry, and errors.
//!
//! This crate defines the in-memory time-series primitives (counter, gauge,
//! histogram, summary) and the registry that renders them in the Prometheus
//! text exposition format. It carries no HTTP or async runtime dependency so
//! the same registry can back any server.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `RedlineError`/`Result` so a bad label set or
//! a malformed bucket layout never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{ClientCode, RedlineError, Result};
