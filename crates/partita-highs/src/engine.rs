use std::time::Instant;

use partita_core::ModelAction;
use partita_expr::ids::VariableId;
use partita_solver::{EngineModel, Solution, SolverConfig, SolverEngine, SolverError, SolverStatus};
use tracing::{debug, warn};

use crate::ffi::{HighsModel, HighsModelError, HighsOption, HighsStatus};
use crate::status::{is_proven, is_terminal_failure, to_solver_status};

const FEASIBILITY_TOL: f64 = 1e-6;

fn highs_error(err: HighsModelError) -> SolverError {
    SolverError::InternalError(err.to_string())
}

/// Warm-start value for a column without a hint.
fn default_primal_value(lower: f64, upper: f64) -> f64 {
    if lower.is_finite() && upper.is_finite() {
        if lower <= 0.0 && 0.0 <= upper {
            0.0
        } else if 0.0 < lower {
            lower
        } else {
            upper
        }
    } else if lower.is_finite() {
        if 0.0 < lower { lower } else { 0.0 }
    } else if upper.is_finite() {
        if 0.0 > upper { upper } else { 0.0 }
    } else {
        0.0
    }
}

/// Excludes one binary assignment: `sum_{x*=0} x_j - sum_{x*=1} x_j >= 1 - |ones|`.
#[derive(Debug, Clone)]
struct NoGoodCut {
    terms: Vec<(usize, f64)>,
    lower: f64,
}

impl NoGoodCut {
    fn excluding(columns: &[usize], values: &[f64]) -> Self {
        let mut ones = 0.0;
        let terms = columns
            .iter()
            .map(|&col| {
                if values.get(col).copied().unwrap_or(0.0) > 0.5 {
                    ones += 1.0;
                    (col, -1.0)
                } else {
                    (col, 1.0)
                }
            })
            .collect();
        Self {
            terms,
            lower: 1.0 - ones,
        }
    }
}

/// [`SolverEngine`] backed by HiGHS.
#[derive(Debug, Default)]
pub struct HighsEngine {
    mirror: EngineModel,
    warm_start: Vec<(VariableId, f64)>,
}

impl HighsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mirror(&self) -> &EngineModel {
        &self.mirror
    }

    fn build(
        &self,
        relaxed: bool,
        config: &SolverConfig,
        cuts: &[NoGoodCut],
    ) -> Result<HighsModel, SolverError> {
        if self.mirror.num_columns() == 0 {
            return Err(SolverError::EmptyModel);
        }
        let sense = self.mirror.sense.ok_or(SolverError::NoObjective)?;
        let mut highs = HighsModel::new(sense);
        highs.set_log_to_console(config.log_to_console.unwrap_or(false));
        if let Some(limit) = config.time_limit {
            highs.set_option("time_limit", HighsOption::Float(limit.max(0.0)));
        }
        if let Some(gap) = config.mip_gap {
            highs.set_option("mip_rel_gap", HighsOption::Float(gap));
        }
        if let Some(threads) = config.threads {
            highs.set_option("threads", HighsOption::Int(threads as i32));
        }
        if let Some(count) = config.solution_limit {
            let count = i32::try_from(count).unwrap_or(i32::MAX);
            highs.set_option("mip_max_improving_sols", HighsOption::Int(count));
        }
        if let Some(level) = config.verbosity {
            highs.set_option("output_flag", HighsOption::Bool(level > 0));
        }

        for col in &self.mirror.columns {
            highs.add_col(
                col.bounds.lower,
                col.bounds.upper,
                col.objective,
                col.is_integer && !relaxed,
            );
        }
        for row in &self.mirror.rows {
            let bounds = row.bounds();
            highs
                .add_row(
                    bounds.lower,
                    bounds.upper,
                    row.terms.iter().map(|(col, coeff)| (*col, *coeff)),
                )
                .map_err(highs_error)?;
        }
        for cut in cuts {
            highs
                .add_row(cut.lower, f64::INFINITY, cut.terms.iter().copied())
                .map_err(highs_error)?;
        }

        if !self.warm_start.is_empty() {
            let mut cols: Vec<f64> = self
                .mirror
                .columns
                .iter()
                .map(|col| default_primal_value(col.bounds.lower, col.bounds.upper))
                .collect();
            for (var, value) in &self.warm_start {
                if let Some(slot) = cols.get_mut(var.index()) {
                    *slot = *value;
                }
            }
            highs.set_primal_start(cols).map_err(highs_error)?;
        }
        Ok(highs)
    }

    fn is_feasible(&self, values: &[f64], relaxed: bool) -> bool {
        if values.len() != self.mirror.num_columns() {
            return false;
        }
        let columns_ok = self.mirror.columns.iter().zip(values).all(|(col, value)| {
            col.bounds.contains(*value, FEASIBILITY_TOL)
                && (relaxed || !col.is_integer || (value - value.round()).abs() <= FEASIBILITY_TOL)
        });
        columns_ok
            && self
                .mirror
                .rows
                .iter()
                .all(|row| row.bounds().contains(row.activity(values), FEASIBILITY_TOL))
    }

    fn run(
        &self,
        relaxed: bool,
        config: &SolverConfig,
        cuts: &[NoGoodCut],
    ) -> Result<Solution, SolverError> {
        let started = Instant::now();
        let mut highs = self.build(relaxed, config, cuts)?;
        let status = highs.solve();
        let elapsed = started.elapsed().as_secs_f64();
        debug!(
            component = "solver",
            operation = "solve",
            status = "success",
            solver = "highs",
            solver_status = ?status,
            relaxed,
            cuts = cuts.len(),
            optimality_gap = highs.mip_gap(),
            duration_ms = elapsed * 1000.0,
            "HiGHS solve completed"
        );
        if is_terminal_failure(status) {
            return Err(SolverError::SolveFailure {
                status: to_solver_status(status),
            });
        }

        let snapshot = highs.solution_snapshot().map_err(highs_error)?;
        let status = if is_proven(status) {
            SolverStatus::Optimal
        } else if self.is_feasible(&snapshot.col_values, relaxed) {
            match status {
                HighsStatus::Unknown if config.solution_limit.is_some() => {
                    SolverStatus::ReachedSolutionLimit
                }
                HighsStatus::Unknown => SolverStatus::Feasible,
                other => to_solver_status(other),
            }
        } else {
            warn!(
                component = "solver",
                operation = "solve",
                status = "warn",
                solver = "highs",
                solver_status = ?status,
                "HiGHS stopped without a feasible solution"
            );
            return Err(SolverError::SolveFailure {
                status: to_solver_status(status),
            });
        };

        let is_mip = !relaxed && self.mirror.is_mip();
        let objective_value = highs.objective_value().map_err(highs_error)? + self.mirror.objective_constant;
        let constraint_duals = if is_mip {
            vec![0.0; self.mirror.num_rows()]
        } else {
            let mut duals = snapshot.row_duals;
            duals.truncate(self.mirror.num_rows());
            duals
        };
        Ok(Solution {
            primal_values: snapshot.col_values,
            constraint_duals,
            objective_value,
            status,
            solve_time_seconds: elapsed,
        })
    }
}

impl SolverEngine for HighsEngine {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn apply(&mut self, actions: &[ModelAction]) -> Result<(), SolverError> {
        self.mirror.apply_all(actions)
    }

    fn set_warm_start(&mut self, hints: &[(VariableId, f64)]) -> Result<(), SolverError> {
        for (var, _) in hints {
            if var.index() >= self.mirror.num_columns() {
                return Err(SolverError::InvalidVariableId(*var));
            }
        }
        self.warm_start = hints.to_vec();
        Ok(())
    }

    fn solve(&mut self, relaxed: bool, config: &SolverConfig) -> Result<Solution, SolverError> {
        self.run(relaxed, config, &[])
    }

    /// The optimum, then further binary assignments excluded one by one with
    /// no-good cuts. Models with general integers return the optimum only.
    fn populate(
        &mut self,
        limit: usize,
        config: &SolverConfig,
    ) -> Result<Vec<Solution>, SolverError> {
        let first = self.run(false, config, &[])?;
        let integers = self.mirror.integer_columns();
        let all_binary = integers.iter().all(|&col| {
            let bounds = self.mirror.columns[col].bounds;
            bounds.lower >= 0.0 && bounds.upper <= 1.0
        });
        if integers.is_empty() || !all_binary {
            return Ok(vec![first]);
        }

        let mut cuts = vec![NoGoodCut::excluding(&integers, &first.primal_values)];
        let mut pool = vec![first];
        while pool.len() < limit {
            match self.run(false, config, &cuts) {
                Ok(next) => {
                    cuts.push(NoGoodCut::excluding(&integers, &next.primal_values));
                    pool.push(Solution {
                        status: SolverStatus::Feasible,
                        ..next
                    });
                }
                Err(SolverError::SolveFailure { .. }) => break,
                Err(err) => return Err(err),
            }
        }
        debug!(
            component = "solver",
            operation = "populate",
            status = "success",
            solver = "highs",
            limit,
            solutions = pool.len(),
            "Collected solution pool with no-good cuts"
        );
        Ok(pool)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_primal_value_respects_bounds() {
        assert_eq!(default_primal_value(-1.0, 1.0), 0.0);
        assert_eq!(default_primal_value(2.0, 5.0), 2.0);
        assert_eq!(default_primal_value(-5.0, -2.0), -2.0);
        assert_eq!(default_primal_value(f64::NEG_INFINITY, -3.0), -3.0);
        assert_eq!(default_primal_value(f64::NEG_INFINITY, f64::INFINITY), 0.0);
    }

    #[test]
    fn no_good_cut_excludes_only_its_assignment() {
        let cut = NoGoodCut::excluding(&[0, 2], &[1.0, 7.0, 0.0]);
        assert_eq!(cut.terms, vec![(0, -1.0), (2, 1.0)]);
        assert_eq!(cut.lower, 0.0);
        // The excluded point has activity -1 < 0; any other binary point meets the bound.
        let activity = |x0: f64, x2: f64| -x0 + x2;
        assert!(activity(1.0, 0.0) < cut.lower);
        assert!(activity(0.0, 0.0) >= cut.lower);
        assert!(activity(1.0, 1.0) >= cut.lower);
    }
}
