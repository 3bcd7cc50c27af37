//! Linear expression: terms + constant.
//!
//! Terms are kept in insertion order and may repeat a variable; callers that
//! need a canonical form use [`Expr::normalized_terms`].

use crate::expr::constraint::{ComparisonSense, ConstraintExpr};
use crate::expr::error::ExprError;
use crate::ids::VariableId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Expr {
    constant: f64,
    linear: Vec<(VariableId, f64)>,
}

impl Expr {
    // ── Constructors ────────────────────────────────────────

    /// Empty expression (all zeros).
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Expression from linear terms and constant.
    pub fn new(linear: Vec<(VariableId, f64)>, constant: f64) -> Self {
        Self { constant, linear }
    }

    /// Just a constant, no variable terms.
    pub fn from_constant(constant: f64) -> Self {
        Self {
            constant,
            ..Default::default()
        }
    }

    /// Single linear term: coeff * var.
    pub fn term(var_id: VariableId, coeff: f64) -> Self {
        if coeff == 0.0 {
            return Self::default();
        }
        Self {
            linear: vec![(var_id, coeff)],
            ..Default::default()
        }
    }

    /// Single variable with coefficient 1.0.
    pub fn var(var_id: VariableId) -> Self {
        Self::term(var_id, 1.0)
    }

    /// From raw linear terms, no constant.
    pub fn from_linear(linear: Vec<(VariableId, f64)>) -> Self {
        Self {
            linear,
            ..Default::default()
        }
    }

    /// From parallel variable/coefficient slices, dropping zero coefficients.
    pub fn from_parts(variables: &[VariableId], coefficients: &[f64]) -> Result<Self, ExprError> {
        if variables.len() != coefficients.len() {
            return Err(ExprError::MismatchedLengths {
                variables: variables.len(),
                coefficients: coefficients.len(),
            });
        }
        let mut linear = Vec::with_capacity(variables.len());
        for (var_id, coeff) in variables.iter().zip(coefficients) {
            if !coeff.is_finite() {
                return Err(ExprError::NonFiniteCoefficient {
                    coefficient: *coeff,
                });
            }
            if *coeff != 0.0 {
                linear.push((*var_id, *coeff));
            }
        }
        Ok(Self::from_linear(linear))
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn linear_terms(&self) -> &[(VariableId, f64)] {
        &self.linear
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }

    /// Consume and return linear terms.
    pub fn into_linear_terms(self) -> Vec<(VariableId, f64)> {
        self.linear
    }

    /// Consume and return (linear_terms, constant).
    pub fn into_parts(self) -> (Vec<(VariableId, f64)>, f64) {
        (self.linear, self.constant)
    }

    // ── Building in place ───────────────────────────────────

    /// Append `coeff * var`; zero coefficients are skipped.
    pub fn push_term(&mut self, var_id: VariableId, coeff: f64) {
        if coeff != 0.0 {
            self.linear.push((var_id, coeff));
        }
    }

    /// Shift the constant by `value`.
    pub fn shift_constant(&mut self, value: f64) {
        self.constant += value;
    }

    // ── Operations ──────────────────────────────────────────

    /// Scale all terms and constant by a factor.
    pub fn scale(&self, by: f64) -> Self {
        Self {
            constant: self.constant * by,
            linear: self
                .linear
                .iter()
                .map(|(v, c)| (*v, *c * by))
                .filter(|(_, c)| *c != 0.0)
                .collect(),
        }
    }

    /// Add another expression (concatenates terms, sums constants).
    pub fn add(&self, other: &Expr) -> Self {
        let mut linear = Vec::with_capacity(self.linear.len() + other.linear.len());
        linear.extend_from_slice(&self.linear);
        linear.extend_from_slice(&other.linear);
        Self {
            constant: self.constant + other.constant,
            linear,
        }
    }

    /// Add a constant offset.
    pub fn add_constant(&self, value: f64) -> Self {
        Self {
            constant: self.constant + value,
            linear: self.linear.clone(),
        }
    }

    /// Copy with constant set to zero.
    pub fn without_constant(&self) -> Self {
        Self {
            constant: 0.0,
            linear: self.linear.clone(),
        }
    }

    /// Merged linear terms with duplicates combined and zeros dropped.
    pub fn normalized_terms(&self) -> Vec<(VariableId, f64)> {
        let mut merged: BTreeMap<VariableId, f64> = BTreeMap::new();
        for (var_id, coeff) in &self.linear {
            if *coeff == 0.0 {
                continue;
            }
            *merged.entry(*var_id).or_insert(0.0) += *coeff;
        }
        merged.into_iter().filter(|(_, c)| *c != 0.0).collect()
    }

    /// Evaluate against a dense value vector indexed by variable position.
    ///
    /// Variables beyond the end of `values` count as zero.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.linear.iter().fold(self.constant, |acc, (var_id, coeff)| {
            acc + coeff * values.get(var_id.index()).copied().unwrap_or(0.0)
        })
    }

    // ── Comparison methods (produce ConstraintExpr) ─────────

    pub fn compare_scalar(&self, rhs: f64, sense: ComparisonSense) -> ConstraintExpr {
        ConstraintExpr::new(self.without_constant(), sense, rhs - self.constant)
    }

    pub fn compare_expr(&self, other: &Expr, sense: ComparisonSense) -> ConstraintExpr {
        let combined = self.add(&other.scale(-1.0));
        ConstraintExpr::new(combined.without_constant(), sense, -combined.constant)
    }

    pub fn le_scalar(&self, rhs: f64) -> ConstraintExpr {
        self.compare_scalar(rhs, ComparisonSense::LessEqual)
    }

    pub fn ge_scalar(&self, rhs: f64) -> ConstraintExpr {
        self.compare_scalar(rhs, ComparisonSense::GreaterEqual)
    }

    pub fn eq_scalar(&self, rhs: f64) -> ConstraintExpr {
        self.compare_scalar(rhs, ComparisonSense::Equal)
    }

    pub fn le_expr(&self, rhs: &Expr) -> ConstraintExpr {
        self.compare_expr(rhs, ComparisonSense::LessEqual)
    }

    pub fn ge_expr(&self, rhs: &Expr) -> ConstraintExpr {
        self.compare_expr(rhs, ComparisonSense::GreaterEqual)
    }

    pub fn eq_expr(&self, rhs: &Expr) -> ConstraintExpr {
        self.compare_expr(rhs, ComparisonSense::Equal)
    }
}

// ── Operator overloads ──────────────────────────────────────

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Self::Output {
        Expr::add(&self, &rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Self::Output {
        Expr::add(&self, &rhs.scale(-1.0))
    }
}

impl std::ops::Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use crate::VariableId;
    use crate::expr::{ComparisonSense, Expr, ExprError};

    fn x() -> VariableId {
        VariableId::new(0)
    }

    fn y() -> VariableId {
        VariableId::new(1)
    }

    #[test]
    fn from_constant() {
        let e = Expr::from_constant(5.0);
        assert_eq!(e.constant(), 5.0);
        assert!(e.is_empty());
    }

    #[test]
    fn scale_with_constant() {
        let e = Expr::new(vec![(x(), 2.0)], 3.0);
        let scaled = e.scale(2.0);
        assert_eq!(scaled.constant(), 6.0);
        assert_eq!(scaled.linear_terms()[0].1, 4.0);
    }

    #[test]
    fn le_scalar_folds_constant_into_rhs() {
        let e = Expr::new(vec![(x(), 1.0)], 3.0);
        let c = e.le_scalar(10.0);
        assert_eq!(c.sense(), ComparisonSense::LessEqual);
        assert_eq!(c.rhs(), 7.0);
        assert_eq!(c.expr().constant(), 0.0);
    }

    #[test]
    fn ge_expr_moves_everything_left() {
        let lhs = Expr::new(vec![(x(), 1.0)], 3.0);
        let rhs = Expr::new(vec![(y(), 1.0)], 7.0);
        let c = lhs.ge_expr(&rhs);
        assert_eq!(c.sense(), ComparisonSense::GreaterEqual);
        assert_eq!(c.rhs(), 4.0);
        assert_eq!(c.expr().linear_terms(), &[(x(), 1.0), (y(), -1.0)]);
    }

    #[test]
    fn push_term_skips_zero() {
        let mut e = Expr::new_empty();
        e.push_term(x(), 0.0);
        e.push_term(y(), 2.0);
        e.shift_constant(-1.5);
        assert_eq!(e.linear_terms(), &[(y(), 2.0)]);
        assert_eq!(e.constant(), -1.5);
    }

    #[test]
    fn from_parts_rejects_mismatched_lengths() {
        let result = Expr::from_parts(&[x(), y()], &[1.0]);
        assert_eq!(
            result.unwrap_err(),
            ExprError::MismatchedLengths {
                variables: 2,
                coefficients: 1
            }
        );
    }

    #[test]
    fn from_parts_filters_zero_coefficients() {
        let expr = Expr::from_parts(&[x(), y()], &[0.0, 3.5]).unwrap();
        assert_eq!(expr.linear_terms(), &[(y(), 3.5)]);
    }

    #[test]
    fn normalized_terms_merges_duplicates() {
        let expr = Expr::term(x(), 2.0)
            .add(&Expr::term(x(), -2.0))
            .add(&Expr::term(y(), 4.0));
        assert_eq!(expr.normalized_terms(), vec![(y(), 4.0)]);
    }

    #[test]
    fn evaluate_uses_positions() {
        let expr = Expr::new(vec![(x(), 2.0), (y(), -1.0)], 1.0);
        assert_eq!(expr.evaluate(&[3.0, 4.0]), 3.0);
        assert_eq!(expr.evaluate(&[3.0]), 7.0);
    }

    #[test]
    fn operators_compose() {
        let e = (Expr::var(x()) - Expr::var(y())) * 2.0;
        assert_eq!(e.linear_terms(), &[(x(), 2.0), (y(), -2.0)]);
        let n = -Expr::from_constant(1.0);
        assert_eq!(n.constant(), -1.0);
    }
}
