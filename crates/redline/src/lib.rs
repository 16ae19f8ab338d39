//! Top-level facade crate for redline.
//!
//! Re-exports the core metric primitives and the server library so users can
//! depend on a single crate.

pub mod core {
    pub use redline_core::*;
}

pub mod server {
    pub use redline_server::*;
}
