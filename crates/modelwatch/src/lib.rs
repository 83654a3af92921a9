//! Top-level facade crate for modelwatch.
//!
//! Re-exports the core contracts and the gateway library so users can depend on a single crate.

pub mod core {
    pub use modelwatch_core::*;
}

pub mod gateway {
    pub use modelwatch_gateway::*;
}
