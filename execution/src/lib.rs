//! antaria execution layer.
//!
//! This crate contains the game engines and the ledger (`Layer`) that applies one
//! [`Instruction`](antaria_types::Instruction) at a time against a [`State`] backend.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution; the caller passes `now`.
//! - Only draw randomness from the provided [`casino::GameRng`].
//!
//! ## Atomicity
//! A `Layer` stages every write in memory. Nothing reaches the backend until the caller commits
//! the staged changes with a single [`State::apply`], so a failed instruction leaves no trace.
//! [`execute`] wraps that sequence.

pub mod casino;
mod error;
mod layer;
pub mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use error::CasinoError;
pub use layer::{execute, sweep, Layer};
pub use state::{State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
