//! A model paired with the engine that solves it.

use std::path::Path;
use std::time::Instant;

use partita_core::Model;
use partita_expr::ids::VariableId;

use crate::{Solution, SolverConfig, SolverEngine, SolverError};

/// Owns a [`Model`] and a [`SolverEngine`].
///
/// Edits go through [`Session::model_mut`]; the accumulated actions are
/// handed to the engine by [`Session::flush`], which every solve calls first.
#[derive(Debug)]
pub struct Session<E: SolverEngine> {
    model: Model,
    engine: E,
    config: SolverConfig,
}

impl<E: SolverEngine> Session<E> {
    /// Pair `model` with `engine` and replay the model into it.
    pub fn new(model: Model, engine: E) -> Result<Self, SolverError> {
        let mut session = Self {
            model,
            engine,
            config: SolverConfig::default(),
        };
        session.flush()?;
        Ok(session)
    }

    /// Replace the configuration used by [`solve`](Self::solve) and
    /// [`populate`](Self::populate).
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Hand pending model actions to the engine. Returns how many were sent.
    pub fn flush(&mut self) -> Result<usize, SolverError> {
        let actions = self.model.take_actions();
        if actions.is_empty() {
            return Ok(0);
        }
        self.engine.apply(&actions)?;
        tracing::trace!(
            component = "session",
            operation = "flush",
            status = "success",
            engine = self.engine.name(),
            model = %self.model.name(),
            actions = actions.len(),
            "Flushed model actions"
        );
        Ok(actions.len())
    }

    pub fn set_warm_start(&mut self, hints: &[(VariableId, f64)]) -> Result<(), SolverError> {
        self.flush()?;
        self.engine.set_warm_start(hints)
    }

    /// Flush and optimize with the session configuration.
    pub fn solve(&mut self, relaxed: bool) -> Result<Solution, SolverError> {
        let config = self.config.clone();
        self.solve_with(relaxed, &config)
    }

    /// Flush and optimize with an explicit configuration.
    pub fn solve_with(
        &mut self,
        relaxed: bool,
        config: &SolverConfig,
    ) -> Result<Solution, SolverError> {
        self.flush()?;
        let started = Instant::now();
        let result = self.engine.solve(relaxed, config);
        match &result {
            Ok(solution) => tracing::debug!(
                component = "session",
                operation = "solve",
                status = "success",
                engine = self.engine.name(),
                model = %self.model.name(),
                relaxed,
                solver_status = solution.status.as_str(),
                objective = solution.objective_value,
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Solved model"
            ),
            Err(err) => tracing::debug!(
                component = "session",
                operation = "solve",
                status = "error",
                engine = self.engine.name(),
                model = %self.model.name(),
                relaxed,
                error_code = err.code(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Solve returned no solution"
            ),
        }
        result
    }

    /// Flush and collect up to `limit` distinct solutions, best first.
    pub fn populate(&mut self, limit: usize) -> Result<Vec<Solution>, SolverError> {
        self.flush()?;
        let started = Instant::now();
        let config = self.config.clone();
        let solutions = self.engine.populate(limit, &config)?;
        tracing::debug!(
            component = "session",
            operation = "populate",
            status = "success",
            engine = self.engine.name(),
            model = %self.model.name(),
            limit,
            solutions = solutions.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Populated solution pool"
        );
        Ok(solutions)
    }

    /// Write the current model as LP text for diagnostics.
    pub fn write_model(&self, path: impl AsRef<Path>) -> Result<(), SolverError> {
        self.model.write_lp(path)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::SolverStatus;
    use crate::testing::DenseEngine;
    use partita_core::{Bounds, Expr, Variable};

    fn production() -> Model {
        // max 3x + 2y  s.t.  x + y <= 4, x + 3y <= 6, x <= 3
        let mut model = Model::new("production");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::new(0.0, 3.0)))
            .unwrap();
        let y = model
            .add_variable("y", Variable::continuous(Bounds::non_negative()))
            .unwrap();
        model
            .add_constraint("a", Expr::new(vec![(x, 1.0), (y, 1.0)], 0.0).le_scalar(4.0))
            .unwrap();
        model
            .add_constraint("b", Expr::new(vec![(x, 1.0), (y, 3.0)], 0.0).le_scalar(6.0))
            .unwrap();
        model
            .maximize(Expr::new(vec![(x, 3.0), (y, 2.0)], 0.0))
            .unwrap();
        model
    }

    #[test]
    fn new_session_flushes_everything() {
        let session = Session::new(production(), DenseEngine::new()).unwrap();
        assert!(!session.model().has_pending_actions());
        assert_eq!(session.engine().mirror().num_columns(), 2);
        assert_eq!(session.engine().mirror().num_rows(), 2);
    }

    #[test]
    fn solve_sees_edits_made_after_creation() {
        let mut session = Session::new(production(), DenseEngine::new()).unwrap();
        let first = session.solve(true).unwrap();
        assert_eq!(first.status, SolverStatus::Optimal);
        assert!((first.objective_value - 11.0).abs() < 1e-9);

        let x = session.model().variable_by_name("x").unwrap();
        session
            .model_mut()
            .set_variable_bounds(x, Bounds::fixed(0.0))
            .unwrap();
        let second = session.solve(true).unwrap();
        assert!((second.objective_value - 4.0).abs() < 1e-9);
        assert_eq!(session.flush().unwrap(), 0);
    }

    #[test]
    fn write_model_emits_lp_text() {
        let session = Session::new(production(), DenseEngine::new()).unwrap();
        let path = std::env::temp_dir().join(format!(
            "partita-session-{}.lp",
            std::process::id()
        ));
        session.write_model(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(text.contains("Maximize"));
        assert!(text.contains(" b: 1 x + 3 y <= 6"));
    }
}
