//! The backend seam.

use partita_core::ModelAction;
use partita_expr::ids::VariableId;

use crate::{Solution, SolverConfig, SolverError};

/// A solver backend driven by model actions.
///
/// Engines never see a [`partita_core::Model`] directly: a
/// [`Session`](crate::Session) drains the model's action list and hands it
/// over with [`apply`](SolverEngine::apply), so every edit reaches the
/// engine exactly once.
pub trait SolverEngine {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Replay model edits.
    fn apply(&mut self, actions: &[ModelAction]) -> Result<(), SolverError>;

    /// Initial values for the next solve. Partial hints are allowed; the
    /// previous hint set is replaced.
    fn set_warm_start(&mut self, hints: &[(VariableId, f64)]) -> Result<(), SolverError>;

    /// Optimize. With `relaxed` set, integrality is ignored and duals are
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::SolveFailure` when no usable solution exists.
    fn solve(&mut self, relaxed: bool, config: &SolverConfig) -> Result<Solution, SolverError>;

    /// Up to `limit` distinct solutions, best first.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::SolveFailure` when no solution exists at all.
    fn populate(
        &mut self,
        limit: usize,
        config: &SolverConfig,
    ) -> Result<Vec<Solution>, SolverError>;
}
