use partita_expr::ComparisonSense;
use partita_expr::ids::VariableId;
use std::collections::BTreeMap;

/// Optimization sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    pub fn as_str(self) -> &'static str {
        match self {
            Sense::Minimize => "minimize",
            Sense::Maximize => "maximize",
        }
    }

    /// Whether `candidate` beats `incumbent` by more than `tolerance`.
    pub fn improves(self, candidate: f64, incumbent: f64, tolerance: f64) -> bool {
        match self {
            Sense::Minimize => candidate < incumbent - tolerance,
            Sense::Maximize => candidate > incumbent + tolerance,
        }
    }
}

/// Bounds for a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Both bounds at `value`.
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    pub fn free() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// A decision variable with bounds and integrality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    pub bounds: Bounds,
    pub is_integer: bool,
}

impl Variable {
    /// Create a binary variable with bounds [0, 1] and integer constraint.
    pub fn binary() -> Self {
        Self {
            bounds: Bounds::new(0.0, 1.0),
            is_integer: true,
        }
    }

    /// Create a continuous variable with specified bounds.
    pub fn continuous(bounds: Bounds) -> Self {
        Self {
            bounds,
            is_integer: false,
        }
    }

    /// Create an integer variable with specified bounds.
    pub fn integer(bounds: Bounds) -> Self {
        Self {
            bounds,
            is_integer: true,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.is_integer && self.bounds.lower >= 0.0 && self.bounds.upper <= 1.0
    }

    /// Round to the variable's domain: nearest integer for integer variables.
    pub fn round(&self, value: f64) -> f64 {
        if self.is_integer { value.round() } else { value }
    }
}

/// A linear constraint `terms <sense> rhs`.
///
/// The constant term of the original expression is `-rhs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub sense: ComparisonSense,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(sense: ComparisonSense, rhs: f64) -> Self {
        Self { sense, rhs }
    }

    pub fn constant(&self) -> f64 {
        -self.rhs
    }

    /// Row activity range implied by the sense.
    pub fn bounds(&self) -> Bounds {
        match self.sense {
            ComparisonSense::LessEqual => Bounds::new(f64::NEG_INFINITY, self.rhs),
            ComparisonSense::GreaterEqual => Bounds::new(self.rhs, f64::INFINITY),
            ComparisonSense::Equal => Bounds::new(self.rhs, self.rhs),
        }
    }
}

/// Objective function with a sense, linear coefficients and a constant.
#[derive(Debug, Clone, Default)]
pub struct Objective {
    pub sense: Option<Sense>,
    pub coefficients: BTreeMap<VariableId, f64>,
    pub constant: f64,
}

impl Objective {
    /// Create a new empty objective
    pub fn new() -> Self {
        Self::default()
    }

    /// Objective coefficient of `var`, zero when absent.
    pub fn coefficient(&self, var: VariableId) -> f64 {
        self.coefficients.get(&var).copied().unwrap_or(0.0)
    }

    /// Objective value of a dense value vector (missing entries count as zero).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .fold(self.constant, |acc, (var, coeff)| {
                acc + coeff * values.get(var.index()).copied().unwrap_or(0.0)
            })
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn sense_improves_is_direction_aware() {
        assert!(Sense::Minimize.improves(1.0, 2.0, 1e-6));
        assert!(!Sense::Minimize.improves(2.0, 1.0, 1e-6));
        assert!(Sense::Maximize.improves(2.0, 1.0, 1e-6));
        assert!(!Sense::Maximize.improves(1.0 + 1e-9, 1.0, 1e-6));
    }

    #[test]
    fn constraint_bounds_follow_sense() {
        let le = Constraint::new(ComparisonSense::LessEqual, 5.0);
        assert_eq!(le.bounds(), Bounds::new(f64::NEG_INFINITY, 5.0));
        assert_eq!(le.constant(), -5.0);
        let eq = Constraint::new(ComparisonSense::Equal, 2.0);
        assert_eq!(eq.bounds(), Bounds::fixed(2.0));
    }

    #[test]
    fn integer_variables_round() {
        assert_eq!(Variable::binary().round(0.9999), 1.0);
        assert_eq!(Variable::continuous(Bounds::non_negative()).round(0.4), 0.4);
        assert!(Variable::binary().is_binary());
        assert!(!Variable::integer(Bounds::new(0.0, 3.0)).is_binary());
    }

    #[test]
    fn objective_evaluate_includes_constant() {
        let mut objective = Objective::new();
        objective.coefficients.insert(VariableId::new(0), 2.0);
        objective.coefficients.insert(VariableId::new(2), -1.0);
        objective.constant = 1.5;
        assert_eq!(objective.evaluate(&[1.0, 9.0, 3.0]), 0.5);
        assert_eq!(objective.coefficient(VariableId::new(1)), 0.0);
    }
}
