//! Expression construction errors.

#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    MismatchedLengths { variables: usize, coefficients: usize },
    NonFiniteCoefficient { coefficient: f64 },
}

impl ExprError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ExprError::MismatchedLengths { .. } => "EXPR_MISMATCHED_LENGTHS",
            ExprError::NonFiniteCoefficient { .. } => "EXPR_NON_FINITE_COEFFICIENT",
        }
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprError::MismatchedLengths {
                variables,
                coefficients,
            } => write!(
                f,
                "[{}] {} variables but {} coefficients",
                self.code(),
                variables,
                coefficients
            ),
            ExprError::NonFiniteCoefficient { coefficient } => write!(
                f,
                "[{}] coefficient must be finite (got {})",
                self.code(),
                coefficient
            ),
        }
    }
}

impl std::error::Error for ExprError {}

#[cfg(test)]
mod tests {
    use super::ExprError;

    #[test]
    fn error_code_is_stable() {
        let err = ExprError::MismatchedLengths {
            variables: 2,
            coefficients: 3,
        };
        assert_eq!(err.code(), "EXPR_MISMATCHED_LENGTHS");
        assert_eq!(
            ExprError::NonFiniteCoefficient {
                coefficient: f64::NAN
            }
            .code(),
            "EXPR_NON_FINITE_COEFFICIENT"
        );
    }

    #[test]
    fn display_prefixes_error_code() {
        let rendered = ExprError::MismatchedLengths {
            variables: 2,
            coefficients: 3,
        }
        .to_string();
        assert!(rendered.starts_with("[EXPR_MISMATCHED_LENGTHS]"));
        assert!(rendered.contains("2 variables"));
    }
}
