//! Partita modeling layer: named variables and constraints, objective
//! direction, and the action log consumed by solver engines.

pub mod model;
pub mod types;

pub use model::{
    ConstraintDocument, Model, ModelAction, ModelDocument, ModelError, VariableDocument,
};
pub use types::{Bounds, Constraint, Objective, Sense, Variable};

pub use partita_expr::{ComparisonSense, ConstraintExpr, ConstraintId, Expr, VariableId};
