//! Explicit diff list produced by model mutations.
//!
//! Every mutating call on [`Model`](super::Model) appends one action. Solver
//! engines consume the list through [`Model::take_actions`](super::Model::take_actions),
//! which drains it so each action is applied exactly once.

use partita_expr::ids::{ConstraintId, VariableId};

use crate::types::{Bounds, Constraint, Sense, Variable};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelAction {
    AddVariable {
        id: VariableId,
        variable: Variable,
    },
    AddConstraint {
        id: ConstraintId,
        constraint: Constraint,
        terms: Vec<(VariableId, f64)>,
    },
    /// A zero coefficient removes the entry.
    SetCoefficient {
        constraint: ConstraintId,
        variable: VariableId,
        coefficient: f64,
    },
    SetVariableBounds {
        id: VariableId,
        bounds: Bounds,
    },
    SetVariableInteger {
        id: VariableId,
        is_integer: bool,
    },
    /// Replaces every objective coefficient and the constant.
    SetObjective {
        sense: Sense,
        coefficients: Vec<(VariableId, f64)>,
        constant: f64,
    },
    SetObjectiveCoefficient {
        variable: VariableId,
        coefficient: f64,
    },
    SetObjectiveSense(Sense),
}

impl ModelAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAction::AddVariable { .. } => "add_variable",
            ModelAction::AddConstraint { .. } => "add_constraint",
            ModelAction::SetCoefficient { .. } => "set_coefficient",
            ModelAction::SetVariableBounds { .. } => "set_variable_bounds",
            ModelAction::SetVariableInteger { .. } => "set_variable_integer",
            ModelAction::SetObjective { .. } => "set_objective",
            ModelAction::SetObjectiveCoefficient { .. } => "set_objective_coefficient",
            ModelAction::SetObjectiveSense(_) => "set_objective_sense",
        }
    }

    /// Whether the action changes the constraint matrix shape.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ModelAction::AddVariable { .. }
                | ModelAction::AddConstraint { .. }
                | ModelAction::SetCoefficient { .. }
        )
    }
}
