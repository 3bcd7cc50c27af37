//! Error types for decomposition loading and algorithms.

use partita_core::ModelError;
use partita_solver::{SolverError, SolverStatus};

/// Error type for decomposition operations.
///
/// Non-improving pricing and infeasible heuristic subproblems are normal
/// outcomes and never surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum DecompError {
    /// Reading or writing a file failed.
    Io { path: String, reason: String },
    /// A partition or solution file is malformed.
    Parse {
        path: String,
        line: usize,
        reason: String,
    },
    /// A decomposition descriptor is not valid JSON for its schema.
    Json { path: String, reason: String },
    /// A file names a variable the model does not have.
    UnknownVariable(String),
    /// A file names a constraint the model does not have.
    UnknownConstraint(String),
    /// A connection names a block the decomposition does not have.
    UnknownBlock(String),
    /// Two blocks of one decomposition share a name.
    DuplicateBlock(String),
    /// A configuration or descriptor value is out of range.
    InvalidParameter { name: &'static str, reason: String },
    /// The restricted master could not be solved.
    MasterInfeasible {
        iteration: usize,
        status: SolverStatus,
    },
    Model(ModelError),
    Solver(SolverError),
}

impl DecompError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            DecompError::Io { .. } => "DECOMP_IO",
            DecompError::Parse { .. } => "PARTITION_PARSE",
            DecompError::Json { .. } => "DESCRIPTOR_JSON",
            DecompError::UnknownVariable(_) => "VARIABLE_UNKNOWN",
            DecompError::UnknownConstraint(_) => "CONSTRAINT_UNKNOWN",
            DecompError::UnknownBlock(_) => "BLOCK_UNKNOWN",
            DecompError::DuplicateBlock(_) => "BLOCK_DUPLICATE",
            DecompError::InvalidParameter { .. } => "PARAMETER_INVALID",
            DecompError::MasterInfeasible { .. } => "MASTER_INFEASIBLE",
            DecompError::Model(err) => err.code(),
            DecompError::Solver(err) => err.code(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        DecompError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

impl std::fmt::Display for DecompError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecompError::Io { path, reason } => {
                write!(f, "[{}] {}: {}", self.code(), path, reason)
            }
            DecompError::Parse { path, line, reason } => {
                write!(f, "[{}] {}:{}: {}", self.code(), path, line, reason)
            }
            DecompError::Json { path, reason } => {
                write!(f, "[{}] {}: {}", self.code(), path, reason)
            }
            DecompError::UnknownVariable(name) => {
                write!(f, "[{}] Variable '{}' not found in model", self.code(), name)
            }
            DecompError::UnknownConstraint(name) => {
                write!(f, "[{}] Constraint '{}' not found in model", self.code(), name)
            }
            DecompError::UnknownBlock(name) => {
                write!(f, "[{}] Block '{}' not found", self.code(), name)
            }
            DecompError::DuplicateBlock(name) => {
                write!(f, "[{}] Block '{}' already exists", self.code(), name)
            }
            DecompError::InvalidParameter { name, reason } => {
                write!(f, "[{}] Parameter '{}' {}", self.code(), name, reason)
            }
            DecompError::MasterInfeasible { iteration, status } => write!(
                f,
                "[{}] Restricted master could not be solved at iteration {} ({})",
                self.code(),
                iteration,
                status
            ),
            DecompError::Model(err) => write!(f, "{err}"),
            DecompError::Solver(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DecompError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecompError::Model(err) => Some(err),
            DecompError::Solver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for DecompError {
    fn from(err: ModelError) -> Self {
        DecompError::Model(err)
    }
}

impl From<SolverError> for DecompError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Model(inner) => DecompError::Model(inner),
            other => DecompError::Solver(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_code() {
        let err = DecompError::UnknownConstraint("c7".to_string());
        assert!(err.to_string().starts_with("[CONSTRAINT_UNKNOWN]"));
        assert!(err.to_string().contains("c7"));

        let err = DecompError::Parse {
            path: "toy.dec".to_string(),
            line: 4,
            reason: "expected a block count".to_string(),
        };
        assert_eq!(err.to_string(), "[PARTITION_PARSE] toy.dec:4: expected a block count");
    }

    #[test]
    fn test_solver_errors_unwrap_model_errors() {
        let err = DecompError::from(SolverError::Model(ModelError::NoObjective));
        assert_eq!(err, DecompError::Model(ModelError::NoObjective));

        let err = DecompError::from(SolverError::SolveFailure {
            status: SolverStatus::Infeasible,
        });
        assert_eq!(err.code(), "SOLVER_INFEASIBLE");
        assert!(std::error::Error::source(&err).is_some());
    }
}
