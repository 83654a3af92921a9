//! modelwatch core: the prediction payload contract and the error surface.
//!
//! This crate defines what a valid `/predict` body looks like and the error
//! taxonomy shared by the proxy gateway and its tests. It carries no transport
//! or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed client bodies must surface as `ModelWatchError::BadInput`, never
//! as a crashed request task.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ClientCode, ModelWatchError, Result};
