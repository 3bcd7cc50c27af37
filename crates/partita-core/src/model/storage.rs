//! Storage access methods for the model.

use crate::types::{Constraint, Variable};
use partita_expr::ids::{ConstraintId, VariableId};

use super::Model;
use super::error::ModelError;

impl Model {
    /// Get the number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Get the number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Get the number of coefficients in the model.
    pub fn num_coefficients(&self) -> usize {
        self.columns.values().map(|coeffs| coeffs.len()).sum()
    }

    /// Get a variable by ID.
    pub fn get_variable(&self, id: VariableId) -> Result<&Variable, ModelError> {
        self.variables
            .get(&id)
            .ok_or(ModelError::InvalidVariableId(id))
    }

    /// Get a constraint by ID.
    pub fn get_constraint(&self, id: ConstraintId) -> Result<&Constraint, ModelError> {
        self.constraints
            .get(&id)
            .ok_or(ModelError::InvalidConstraintId(id))
    }

    /// Variables in id order.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter().map(|(&id, var)| (id, var))
    }

    /// Constraints in id order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints.iter().map(|(&id, con)| (id, con))
    }

    /// Get the coefficients for a specific variable (column)
    pub fn get_column(&self, var_id: VariableId) -> Option<&Vec<(ConstraintId, f64)>> {
        self.columns.get(&var_id)
    }

    /// Get the coefficients of a specific constraint (row)
    pub fn get_row(&self, constraint_id: ConstraintId) -> Option<&Vec<(VariableId, f64)>> {
        self.rows.get(&constraint_id)
    }

    /// Row entries, empty for unknown ids.
    pub fn row_terms(&self, constraint_id: ConstraintId) -> &[(VariableId, f64)] {
        self.rows.get(&constraint_id).map_or(&[], |row| row.as_slice())
    }

    /// Column entries, empty for unknown ids.
    pub fn column_terms(&self, var_id: VariableId) -> &[(ConstraintId, f64)] {
        self.columns.get(&var_id).map_or(&[], |col| col.as_slice())
    }

    pub fn coefficient(&self, var_id: VariableId, constraint_id: ConstraintId) -> f64 {
        self.column_terms(var_id)
            .iter()
            .find_map(|(con, coeff)| (*con == constraint_id).then_some(*coeff))
            .unwrap_or(0.0)
    }

    /// Row activity for a dense value vector indexed by variable position.
    pub fn constraint_activity(&self, constraint_id: ConstraintId, values: &[f64]) -> f64 {
        self.row_terms(constraint_id)
            .iter()
            .map(|(var, coeff)| coeff * values.get(var.index()).copied().unwrap_or(0.0))
            .sum()
    }

    /// Objective value (constant included) for a dense value vector.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Largest violation over all constraints and variable bounds.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let mut worst: f64 = 0.0;
        for (id, constraint) in &self.constraints {
            let bounds = constraint.bounds();
            let activity = self.constraint_activity(*id, values);
            worst = worst
                .max(bounds.lower - activity)
                .max(activity - bounds.upper);
        }
        for (id, variable) in &self.variables {
            let value = values.get(id.index()).copied().unwrap_or(0.0);
            worst = worst
                .max(variable.bounds.lower - value)
                .max(value - variable.bounds.upper);
        }
        worst
    }
}
