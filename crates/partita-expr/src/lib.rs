pub mod expr;
pub mod ids;

pub use expr::{ComparisonSense, ConstraintExpr, Expr, ExprError};
pub use ids::{ConstraintId, VariableId};
