//! Model error types.

use partita_expr::ids::{ConstraintId, VariableId};

/// Errors that can occur during model operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model has no variables
    EmptyModel,
    /// Invalid variable ID
    InvalidVariableId(VariableId),
    /// Invalid variable bounds
    InvalidVariableBounds { lower: f64, upper: f64 },
    /// Invalid constraint ID
    InvalidConstraintId(ConstraintId),
    /// Non-finite right-hand side
    InvalidRhs { rhs: f64 },
    /// Non-finite coefficient
    InvalidCoefficient { coefficient: f64 },
    /// No objective sense set
    NoObjective,
    /// A variable with this name already exists
    DuplicateVariableName(String),
    /// A constraint with this name already exists
    DuplicateConstraintName(String),
    /// Name lookup failed
    UnknownName(String),
    /// Malformed model document
    InvalidDocument { reason: String },
    /// Reading or writing a model file failed
    Io { reason: String },
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::EmptyModel => "MODEL_EMPTY",
            ModelError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            ModelError::InvalidVariableBounds { .. } => "VARIABLE_INVALID_BOUNDS",
            ModelError::InvalidConstraintId(_) => "CONSTRAINT_INVALID_ID",
            ModelError::InvalidRhs { .. } => "CONSTRAINT_INVALID_RHS",
            ModelError::InvalidCoefficient { .. } => "COEFFICIENT_INVALID",
            ModelError::NoObjective => "OBJECTIVE_MISSING",
            ModelError::DuplicateVariableName(_) => "VARIABLE_DUPLICATE_NAME",
            ModelError::DuplicateConstraintName(_) => "CONSTRAINT_DUPLICATE_NAME",
            ModelError::UnknownName(_) => "NAME_UNKNOWN",
            ModelError::InvalidDocument { .. } => "DOCUMENT_INVALID",
            ModelError::Io { .. } => "MODEL_IO",
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyModel => write!(f, "[{}] Model has no variables", self.code()),
            ModelError::InvalidVariableId(id) => write!(
                f,
                "[{}] Variable ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidVariableBounds { lower, upper } => write!(
                f,
                "[{}] Variable bounds invalid: lower ({}) > upper ({})",
                self.code(),
                lower,
                upper
            ),
            ModelError::InvalidConstraintId(id) => write!(
                f,
                "[{}] Constraint ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidRhs { rhs } => {
                write!(f, "[{}] Right-hand side must be finite (got {})", self.code(), rhs)
            }
            ModelError::InvalidCoefficient { coefficient } => write!(
                f,
                "[{}] Coefficient must be finite (got {})",
                self.code(),
                coefficient
            ),
            ModelError::NoObjective => {
                write!(f, "[{}] Model has no objective sense defined", self.code())
            }
            ModelError::DuplicateVariableName(name) => {
                write!(f, "[{}] Variable '{}' already exists", self.code(), name)
            }
            ModelError::DuplicateConstraintName(name) => {
                write!(f, "[{}] Constraint '{}' already exists", self.code(), name)
            }
            ModelError::UnknownName(name) => {
                write!(f, "[{}] No variable named '{}'", self.code(), name)
            }
            ModelError::InvalidDocument { reason } => {
                write!(f, "[{}] Model document invalid: {}", self.code(), reason)
            }
            ModelError::Io { reason } => write!(f, "[{}] {}", self.code(), reason),
        }
    }
}

impl std::error::Error for ModelError {}
