use partita_expr::ids::{ConstraintId, VariableId};

use crate::SolverStatus;

/// Values read back from one engine solve.
///
/// `constraint_duals` follow the reduced-cost convention
/// `d_j = c_j - sum_i a_ij * y_i` for both objective directions. MIP solves
/// report zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub primal_values: Vec<f64>,
    pub constraint_duals: Vec<f64>,
    /// Includes the objective constant.
    pub objective_value: f64,
    pub status: SolverStatus,
    pub solve_time_seconds: f64,
}

impl Solution {
    /// Primal value of `var`, zero when out of range.
    pub fn value(&self, var: VariableId) -> f64 {
        self.primal_values.get(var.index()).copied().unwrap_or(0.0)
    }

    /// Dual value of `con`, zero when out of range.
    pub fn dual(&self, con: ConstraintId) -> f64 {
        self.constraint_duals.get(con.index()).copied().unwrap_or(0.0)
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}
