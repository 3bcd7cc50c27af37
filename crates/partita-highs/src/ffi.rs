//! Thin wrapper around the `highs` crate.
//!
//! This module contains unsafe code for reading the library version.
#![allow(unsafe_code)]

use highs::{Col, HighsModelStatus, RowProblem, Sense as HighsSense, SolvedModel};
use partita_core::Sense;
use std::ffi::CStr;
use std::fmt;
use tracing::{debug, trace, warn};

/// Status of the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighsStatus {
    /// Optimal solution found
    Optimal,
    /// Problem is infeasible
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// Unbounded or infeasible, presolve could not tell
    UnboundedOrInfeasible,
    /// Solver reached time limit (may have feasible solution)
    ReachedTimeLimit,
    /// Solver reached iteration limit (may have feasible solution)
    ReachedIterationLimit,
    /// Unknown status
    Unknown,
}

/// Errors returned by the HiGHS model wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum HighsModelError {
    ColumnIndexOutOfBounds {
        column_index: usize,
        num_columns: usize,
    },
    PrimalStartLengthMismatch {
        expected: usize,
        got: usize,
    },
    SolveRequired {
        operation: &'static str,
    },
}

impl fmt::Display for HighsModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighsModelError::ColumnIndexOutOfBounds {
                column_index,
                num_columns,
            } => write!(
                f,
                "column index {} out of bounds (num_columns = {})",
                column_index, num_columns
            ),
            HighsModelError::PrimalStartLengthMismatch { expected, got } => write!(
                f,
                "primal start length must match number of columns (expected {}, got {})",
                expected, got
            ),
            HighsModelError::SolveRequired { operation } => {
                write!(f, "solve must be called before {}", operation)
            }
        }
    }
}

impl std::error::Error for HighsModelError {}

/// Primal and dual values of a solved problem.
#[derive(Debug, Clone)]
pub struct SolutionSnapshot {
    pub col_values: Vec<f64>,
    pub row_duals: Vec<f64>,
}

/// Option value types for HiGHS solver configuration.
#[derive(Debug, Clone)]
pub enum HighsOption {
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
}

/// One-shot HiGHS problem: build columns and rows, then solve once.
pub struct HighsModel {
    problem: RowProblem,
    sense: Sense,
    solved: Option<SolvedModel>,
    columns: Vec<Col>,
    log_to_console: bool,
    primal_start: Option<Vec<f64>>,
    options: Vec<(String, HighsOption)>,
}

impl HighsModel {
    pub fn new(sense: Sense) -> Self {
        HighsModel {
            problem: RowProblem::default(),
            sense,
            solved: None,
            columns: Vec::new(),
            log_to_console: false,
            primal_start: None,
            options: Vec::new(),
        }
    }

    /// Add a column and return its index.
    pub fn add_col(&mut self, lower: f64, upper: f64, objective: f64, is_integer: bool) -> usize {
        trace!(
            lower,
            upper,
            objective,
            is_integer,
            component = "solver",
            operation = "add_column",
            status = "success",
            "Adding column"
        );
        let col = if is_integer {
            self.problem.add_integer_column(objective, lower..=upper)
        } else {
            self.problem.add_column(objective, lower..=upper)
        };
        self.columns.push(col);
        self.columns.len() - 1
    }

    /// Add a row `lower <= sum(coeff * col) <= upper`.
    pub fn add_row(
        &mut self,
        lower: f64,
        upper: f64,
        terms: impl IntoIterator<Item = (usize, f64)>,
    ) -> Result<usize, HighsModelError> {
        let num_columns = self.columns.len();
        let mut factors = Vec::new();
        for (col_idx, coeff) in terms {
            let col = *self.columns.get(col_idx).ok_or_else(|| {
                warn!(
                    component = "solver",
                    operation = "add_row",
                    status = "error",
                    col_idx,
                    num_columns,
                    "Column index out of bounds for constraint"
                );
                HighsModelError::ColumnIndexOutOfBounds {
                    column_index: col_idx,
                    num_columns,
                }
            })?;
            factors.push((col, coeff));
        }
        self.problem.add_row(lower..=upper, factors);
        Ok(self.problem.num_rows().saturating_sub(1))
    }

    pub fn set_log_to_console(&mut self, enabled: bool) {
        self.log_to_console = enabled;
    }

    /// Set a HiGHS option for the solve.
    pub fn set_option(&mut self, option: impl Into<String>, value: HighsOption) {
        self.options.push((option.into(), value));
    }

    /// Set primal start values for warm-start hints.
    pub fn set_primal_start(&mut self, cols: Vec<f64>) -> Result<(), HighsModelError> {
        if cols.len() != self.columns.len() {
            return Err(HighsModelError::PrimalStartLengthMismatch {
                expected: self.columns.len(),
                got: cols.len(),
            });
        }
        self.primal_start = Some(cols);
        Ok(())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Solve the problem, consuming the built rows and columns.
    pub fn solve(&mut self) -> HighsStatus {
        debug!(
            num_cols = self.problem.num_cols(),
            num_rows = self.problem.num_rows(),
            sense = self.sense.as_str(),
            component = "solver",
            operation = "solve",
            status = "started",
            "Solving HiGHS problem"
        );
        let sense = match self.sense {
            Sense::Minimize => HighsSense::Minimise,
            Sense::Maximize => HighsSense::Maximise,
        };
        let problem = std::mem::take(&mut self.problem);
        let mut model = problem.optimise(sense);
        if !self.log_to_console {
            model.make_quiet();
        }
        for (option, value) in self.options.drain(..) {
            match value {
                HighsOption::Bool(val) => model.set_option(option.as_str(), val),
                HighsOption::Int(val) => model.set_option(option.as_str(), val),
                HighsOption::Float(val) => model.set_option(option.as_str(), val),
                HighsOption::Str(val) => model.set_option(option.as_str(), val.as_str()),
            }
        }
        if self.log_to_console {
            model.set_option("log_to_console", true);
            model.set_option("output_flag", true);
        }
        if let Some(cols) = self.primal_start.take() {
            if let Err(err) = model.try_set_solution(Some(&cols), None, None, None) {
                warn!(
                    component = "solver",
                    operation = "set_primal_start",
                    status = "warn",
                    ?err,
                    "Failed to set warm-start solution; continuing without hints"
                );
            }
        }
        let solved = model.solve();
        let status = map_status(solved.status());
        trace!(
            component = "solver",
            operation = "solve",
            status = "success",
            ?status,
            "Solution status received"
        );
        self.solved = Some(solved);
        self.columns.clear();
        status
    }

    /// Objective value reported by HiGHS (no constant offset).
    pub fn objective_value(&self) -> Result<f64, HighsModelError> {
        let solved = self.solved.as_ref().ok_or(HighsModelError::SolveRequired {
            operation: "objective_value",
        })?;
        Ok(solved.objective_value())
    }

    /// Get the MIP gap (or infinity for pure LPs).
    pub fn mip_gap(&self) -> f64 {
        match self.solved.as_ref() {
            Some(solved) => solved.mip_gap(),
            None => f64::NAN,
        }
    }

    pub fn solution_snapshot(&self) -> Result<SolutionSnapshot, HighsModelError> {
        let solved = self.solved.as_ref().ok_or(HighsModelError::SolveRequired {
            operation: "solution_snapshot",
        })?;
        let solution = solved.get_solution();
        Ok(SolutionSnapshot {
            col_values: solution.columns().to_vec(),
            row_duals: solution.dual_rows().to_vec(),
        })
    }
}

impl fmt::Debug for HighsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let objective_value = self.solved.as_ref().map(|s| s.objective_value());
        f.debug_struct("HighsModel")
            .field("num_variables", &self.problem.num_cols())
            .field("num_constraints", &self.problem.num_rows())
            .field("sense", &self.sense)
            .field("objective_value", &objective_value)
            .finish_non_exhaustive()
    }
}

/// Return the HiGHS solver version string, if available.
pub fn highs_version() -> Option<String> {
    unsafe {
        let ptr = highs_sys::Highs_version();
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
        }
    }
}

fn map_status(status: HighsModelStatus) -> HighsStatus {
    match status {
        HighsModelStatus::Optimal => HighsStatus::Optimal,
        HighsModelStatus::Infeasible => HighsStatus::Infeasible,
        HighsModelStatus::Unbounded => HighsStatus::Unbounded,
        HighsModelStatus::UnboundedOrInfeasible => HighsStatus::UnboundedOrInfeasible,
        HighsModelStatus::ReachedTimeLimit => HighsStatus::ReachedTimeLimit,
        HighsModelStatus::ReachedIterationLimit => HighsStatus::ReachedIterationLimit,
        _ => HighsStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_row_checks_column_indices() {
        let mut model = HighsModel::new(Sense::Minimize);
        let x = model.add_col(0.0, 1.0, 1.0, false);
        assert_eq!(x, 0);
        assert_eq!(model.num_columns(), 1);
        let err = model.add_row(0.0, 1.0, [(3, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            HighsModelError::ColumnIndexOutOfBounds {
                column_index: 3,
                num_columns: 1
            }
        );
    }

    #[test]
    fn test_primal_start_length_is_checked() {
        let mut model = HighsModel::new(Sense::Maximize);
        model.add_col(0.0, 1.0, 1.0, true);
        assert!(model.set_primal_start(vec![0.0, 1.0]).is_err());
        assert!(model.set_primal_start(vec![1.0]).is_ok());
    }

    #[test]
    fn test_values_require_solve() {
        let model = HighsModel::new(Sense::Minimize);
        assert!(model.objective_value().is_err());
        assert!(model.mip_gap().is_nan());
    }
}
