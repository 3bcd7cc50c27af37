use crate::model::Model;
use crate::types::{Bounds, Sense, Variable};
use partita_expr::expr::Expr;

pub(super) fn continuous(lower: f64, upper: f64) -> Variable {
    Variable::continuous(Bounds::new(lower, upper))
}

/// max 3x + 4y + 5z  s.t.  2x + 3y + 4z <= 6, binaries.
pub(super) fn knapsack_model() -> Model {
    let mut model = Model::new("knapsack");
    let x = model.add_variable("x", Variable::binary()).unwrap();
    let y = model.add_variable("y", Variable::binary()).unwrap();
    let z = model.add_variable("z", Variable::binary()).unwrap();
    let weight = Expr::new(vec![(x, 2.0), (y, 3.0), (z, 4.0)], 0.0);
    model.add_constraint("capacity", weight.le_scalar(6.0)).unwrap();
    model
        .set_objective(
            Sense::Maximize,
            Expr::new(vec![(x, 3.0), (y, 4.0), (z, 5.0)], 0.0),
        )
        .unwrap();
    model
}
