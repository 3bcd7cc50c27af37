//! Linear expressions for decomposition models.
//!
//! - `core`: `Expr`, linear terms plus a constant
//! - `constraint`: `ConstraintExpr`, an expression compared against a right-hand side
//! - `error`: expression construction errors

pub mod constraint;
pub mod core;
pub mod error;

pub use constraint::{ComparisonSense, ConstraintExpr};
pub use core::Expr;
pub use error::ExprError;
