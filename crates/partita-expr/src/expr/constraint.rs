//! Constraint expressions: linear expression with comparison sense and RHS.

use crate::expr::core::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonSense {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl ComparisonSense {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonSense::LessEqual => "le",
            ComparisonSense::GreaterEqual => "ge",
            ComparisonSense::Equal => "eq",
        }
    }

    /// Operator as written in LP files.
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonSense::LessEqual => "<=",
            ComparisonSense::GreaterEqual => ">=",
            ComparisonSense::Equal => "=",
        }
    }

    /// Whether `lhs <sense> rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            ComparisonSense::LessEqual => lhs <= rhs + tolerance,
            ComparisonSense::GreaterEqual => lhs >= rhs - tolerance,
            ComparisonSense::Equal => (lhs - rhs).abs() <= tolerance,
        }
    }
}

/// `expr <sense> rhs`, with the expression constant already folded into `rhs`.
#[derive(Debug, Clone)]
pub struct ConstraintExpr {
    expr: Expr,
    sense: ComparisonSense,
    rhs: f64,
}

impl ConstraintExpr {
    pub fn new(expr: Expr, sense: ComparisonSense, rhs: f64) -> Self {
        Self { expr, sense, rhs }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn sense(&self) -> ComparisonSense {
        self.sense
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    pub fn into_parts(self) -> (Expr, ComparisonSense, f64) {
        (self.expr, self.sense, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_respects_tolerance() {
        assert!(ComparisonSense::LessEqual.holds(5.0000001, 5.0, 1e-6));
        assert!(!ComparisonSense::LessEqual.holds(5.1, 5.0, 1e-6));
        assert!(ComparisonSense::GreaterEqual.holds(4.9999999, 5.0, 1e-6));
        assert!(ComparisonSense::Equal.holds(3.0, 3.0, 0.0));
        assert!(!ComparisonSense::Equal.holds(3.0, 3.5, 1e-6));
    }

    #[test]
    fn symbols_match_lp_syntax() {
        assert_eq!(ComparisonSense::LessEqual.symbol(), "<=");
        assert_eq!(ComparisonSense::GreaterEqual.symbol(), ">=");
        assert_eq!(ComparisonSense::Equal.symbol(), "=");
    }
}
