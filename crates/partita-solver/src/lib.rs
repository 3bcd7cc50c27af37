//! Shared solver abstractions for partita.
//!
//! Decomposition algorithms never talk to a solver library directly. They
//! hold a [`Session`], which owns a [`partita_core::Model`] together with a
//! [`SolverEngine`] and forwards the model's action log to the engine before
//! every solve.
//!
//! # Overview
//!
//! - [`SolverConfig`]: Configuration options for solver behavior
//! - [`SolverStatus`]: Common status values across solvers
//! - [`SolverError`]: Error types for solver operations
//! - [`SolverEngine`]: Trait for solver backends
//! - [`EngineModel`]: Backend-neutral mirror rebuilt from model actions
//! - [`Session`]: Model plus engine with action flushing

mod config;
mod error;
mod mirror;
mod session;
mod solution;
mod status;
mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::SolverConfig;
pub use error::SolverError;
pub use mirror::{EngineColumn, EngineModel, EngineRow};
pub use session::Session;
pub use solution::Solution;
pub use status::SolverStatus;
pub use traits::SolverEngine;
