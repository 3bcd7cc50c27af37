//! HiGHS backend for partita.
//!
//! [`HighsEngine`] implements [`partita_solver::SolverEngine`]. It keeps an
//! [`partita_solver::EngineModel`] mirror fed by model actions and rebuilds a
//! fresh HiGHS problem from it on every solve.

mod engine;
pub mod ffi;
mod status;

pub use engine::HighsEngine;
pub use ffi::{HighsModel, HighsModelError, HighsOption, HighsStatus, highs_version};
