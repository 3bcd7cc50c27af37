//! Model builder methods for adding variables, constraints, and objectives.

use crate::types::{Bounds, Constraint, Sense, Variable};
use partita_expr::expr::{ConstraintExpr, Expr};
use partita_expr::ids::{ConstraintId, VariableId};

use crate::model::error::ModelError;
use crate::model::{Model, ModelAction, upsert};

fn validate_bounds(bounds: Bounds) -> Result<(), ModelError> {
    if bounds.lower.is_nan() || bounds.upper.is_nan() || bounds.lower > bounds.upper {
        return Err(ModelError::InvalidVariableBounds {
            lower: bounds.lower,
            upper: bounds.upper,
        });
    }
    Ok(())
}

impl Model {
    /// Add a named variable to the model.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        variable: Variable,
    ) -> Result<VariableId, ModelError> {
        validate_bounds(variable.bounds)?;
        let name = name.into();
        if self.variable_index.contains_key(&name) {
            return Err(ModelError::DuplicateVariableName(name));
        }

        let id = VariableId::new(self.next_variable_id);
        self.next_variable_id += 1;

        self.variables.insert(id, variable);
        self.variable_index.insert(name.clone(), id);
        self.variable_names.insert(id, name);
        self.record(ModelAction::AddVariable { id, variable });

        Ok(id)
    }

    /// Add a named constraint from a comparison expression (e.g. `x + y <= 10`).
    ///
    /// Duplicate terms are merged and any constant left in the expression is
    /// moved to the right-hand side.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        constraint: ConstraintExpr,
    ) -> Result<ConstraintId, ModelError> {
        let (expr, sense, rhs) = constraint.into_parts();
        let rhs = rhs - expr.constant();
        if !rhs.is_finite() {
            return Err(ModelError::InvalidRhs { rhs });
        }
        let terms = expr.normalized_terms();
        for (var_id, coeff) in &terms {
            self.ensure_variable_exists(*var_id)?;
            if !coeff.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: *coeff,
                });
            }
        }
        let name = name.into();
        if self.constraint_index.contains_key(&name) {
            return Err(ModelError::DuplicateConstraintName(name));
        }

        let id = ConstraintId::new(self.next_constraint_id);
        self.next_constraint_id += 1;

        let constraint = Constraint::new(sense, rhs);
        self.constraints.insert(id, constraint);
        for (var_id, coeff) in &terms {
            self.columns.entry(*var_id).or_default().push((id, *coeff));
        }
        self.rows.insert(id, terms.clone());
        self.constraint_index.insert(name.clone(), id);
        self.constraint_names.insert(id, name);
        self.record(ModelAction::AddConstraint {
            id,
            constraint,
            terms,
        });

        Ok(id)
    }

    /// Set a coefficient in the constraint matrix; zero removes the entry.
    pub fn set_coefficient(
        &mut self,
        var_id: VariableId,
        constraint_id: ConstraintId,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !coefficient.is_finite() {
            return Err(ModelError::InvalidCoefficient { coefficient });
        }
        self.ensure_variable_exists(var_id)?;
        self.ensure_constraint_exists(constraint_id)?;

        upsert(
            self.columns.entry(var_id).or_default(),
            constraint_id,
            coefficient,
        );
        upsert(
            self.rows.entry(constraint_id).or_default(),
            var_id,
            coefficient,
        );
        self.record(ModelAction::SetCoefficient {
            constraint: constraint_id,
            variable: var_id,
            coefficient,
        });
        Ok(())
    }

    pub fn set_variable_bounds(&mut self, id: VariableId, bounds: Bounds) -> Result<(), ModelError> {
        validate_bounds(bounds)?;
        let variable = self
            .variables
            .get_mut(&id)
            .ok_or(ModelError::InvalidVariableId(id))?;
        variable.bounds = bounds;
        self.record(ModelAction::SetVariableBounds { id, bounds });
        Ok(())
    }

    pub fn set_variable_integer(&mut self, id: VariableId, is_integer: bool) -> Result<(), ModelError> {
        let variable = self
            .variables
            .get_mut(&id)
            .ok_or(ModelError::InvalidVariableId(id))?;
        variable.is_integer = is_integer;
        self.record(ModelAction::SetVariableInteger { id, is_integer });
        Ok(())
    }

    pub fn set_objective_sense(&mut self, sense: Sense) {
        self.objective.sense = Some(sense);
        self.record(ModelAction::SetObjectiveSense(sense));
    }

    /// Set one objective coefficient; zero removes the term.
    pub fn set_objective_coefficient(
        &mut self,
        var_id: VariableId,
        coefficient: f64,
    ) -> Result<(), ModelError> {
        if !coefficient.is_finite() {
            return Err(ModelError::InvalidCoefficient { coefficient });
        }
        self.ensure_variable_exists(var_id)?;
        if coefficient == 0.0 {
            self.objective.coefficients.remove(&var_id);
        } else {
            self.objective.coefficients.insert(var_id, coefficient);
        }
        self.record(ModelAction::SetObjectiveCoefficient {
            variable: var_id,
            coefficient,
        });
        Ok(())
    }

    /// Replace the objective: sense, every coefficient, and the constant.
    pub fn set_objective(&mut self, sense: Sense, expr: Expr) -> Result<(), ModelError> {
        let constant = expr.constant();
        if !constant.is_finite() {
            return Err(ModelError::InvalidCoefficient {
                coefficient: constant,
            });
        }
        let terms = expr.normalized_terms();
        for (var_id, coeff) in &terms {
            self.ensure_variable_exists(*var_id)?;
            if !coeff.is_finite() {
                return Err(ModelError::InvalidCoefficient {
                    coefficient: *coeff,
                });
            }
        }

        self.objective.sense = Some(sense);
        self.objective.coefficients = terms.iter().copied().collect();
        self.objective.constant = constant;
        tracing::debug!(
            component = "model",
            operation = "set_objective",
            status = "success",
            sense = sense.as_str(),
            terms = terms.len(),
            constant,
            "Set objective function"
        );
        self.record(ModelAction::SetObjective {
            sense,
            coefficients: terms,
            constant,
        });
        Ok(())
    }

    /// Minimize a linear expression.
    pub fn minimize(&mut self, expr: Expr) -> Result<(), ModelError> {
        self.set_objective(Sense::Minimize, expr)
    }

    /// Maximize a linear expression.
    pub fn maximize(&mut self, expr: Expr) -> Result<(), ModelError> {
        self.set_objective(Sense::Maximize, expr)
    }
}
