//! Solver error types.

use partita_core::ModelError;
use partita_expr::ids::{ConstraintId, VariableId};

use crate::SolverStatus;

/// Error type for solver operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Model has no variables.
    EmptyModel,
    /// No objective sense set.
    NoObjective,
    /// Variable ID unknown to the engine.
    InvalidVariableId(VariableId),
    /// Constraint ID unknown to the engine.
    InvalidConstraintId(ConstraintId),
    /// The engine cannot handle this model or request.
    Unsupported(String),
    /// Internal solver error.
    InternalError(String),
    /// Solver finished without a usable solution.
    SolveFailure {
        /// The solver status that caused the failure.
        status: SolverStatus,
    },
    /// Model-layer failure while editing or writing the session model.
    Model(ModelError),
}

impl SolverError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::EmptyModel => "MODEL_EMPTY",
            SolverError::NoObjective => "OBJECTIVE_MISSING",
            SolverError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            SolverError::InvalidConstraintId(_) => "CONSTRAINT_INVALID_ID",
            SolverError::Unsupported(_) => "SOLVER_UNSUPPORTED",
            SolverError::InternalError(_) => "SOLVER_INTERNAL",
            SolverError::SolveFailure { status } => match status {
                SolverStatus::Infeasible => "SOLVER_INFEASIBLE",
                SolverStatus::Unbounded => "SOLVER_UNBOUNDED",
                SolverStatus::ReachedTimeLimit => "SOLVER_TIME_LIMIT",
                SolverStatus::ReachedIterationLimit => "SOLVER_ITERATION_LIMIT",
                _ => "SOLVER_NO_SOLUTION",
            },
            SolverError::Model(err) => err.code(),
        }
    }

    /// Whether the failure only means "no solution this time".
    pub fn is_solve_failure(&self) -> bool {
        matches!(self, SolverError::SolveFailure { .. })
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::EmptyModel => write!(f, "[{}] Model has no variables", self.code()),
            SolverError::NoObjective => write!(f, "[{}] Model has no objective", self.code()),
            SolverError::InvalidVariableId(var_id) => {
                write!(f, "[{}] Variable ID {} does not exist", self.code(), var_id)
            }
            SolverError::InvalidConstraintId(con_id) => {
                write!(f, "[{}] Constraint ID {} does not exist", self.code(), con_id)
            }
            SolverError::Unsupported(msg) => {
                write!(f, "[{}] Unsupported by engine: {}", self.code(), msg)
            }
            SolverError::InternalError(msg) => {
                write!(f, "[{}] Solver internal error: {}", self.code(), msg)
            }
            SolverError::SolveFailure { status } => {
                write!(f, "[{}] {}", self.code(), status_message(*status))
            }
            SolverError::Model(err) => write!(f, "{err}"),
        }
    }
}

fn status_message(status: SolverStatus) -> &'static str {
    match status {
        SolverStatus::Infeasible => "Problem is infeasible",
        SolverStatus::Unbounded => "Problem is unbounded",
        SolverStatus::ReachedTimeLimit => "Solver reached time limit without a solution",
        SolverStatus::ReachedIterationLimit => "Solver reached iteration limit",
        SolverStatus::ReachedSolutionLimit => "Solver reached solution limit without a solution",
        SolverStatus::Unknown => "Solver status unknown",
        SolverStatus::Optimal | SolverStatus::Feasible => "Solver returned no solution values",
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for SolverError {
    fn from(err: ModelError) -> Self {
        SolverError::Model(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_solve_failure() {
        let err = SolverError::SolveFailure {
            status: SolverStatus::Infeasible,
        };
        let msg = err.to_string();
        assert!(msg.contains("SOLVER_INFEASIBLE"));
        assert!(msg.contains("infeasible"));
        assert!(err.is_solve_failure());
    }

    #[test]
    fn test_model_errors_keep_their_code() {
        let err = SolverError::from(ModelError::NoObjective);
        assert_eq!(err.code(), "OBJECTIVE_MISSING");
        assert!(!err.is_solve_failure());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(SolverError::EmptyModel.code(), "MODEL_EMPTY");
        assert_eq!(
            SolverError::InvalidVariableId(VariableId::new(3)).code(),
            "VARIABLE_INVALID_ID"
        );
        assert_eq!(
            SolverError::Unsupported("x".to_string()).code(),
            "SOLVER_UNSUPPORTED"
        );
        assert_eq!(
            SolverError::SolveFailure {
                status: SolverStatus::Unknown
            }
            .code(),
            "SOLVER_NO_SOLUTION"
        );
    }
}
