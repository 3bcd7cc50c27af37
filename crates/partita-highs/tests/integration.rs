#![allow(clippy::float_cmp)]

use partita_core::{Bounds, Expr, Model, Variable};
use partita_highs::HighsEngine;
use partita_solver::{Session, SolverError, SolverStatus};

/// Test: minimize 2x + 3y + 1 subject to x + y >= 5, x,y >= 0
#[test]
fn test_simple_lp_with_constant_and_duals() {
    let mut model = Model::new("lp");
    let x = model
        .add_variable("x", Variable::continuous(Bounds::non_negative()))
        .unwrap();
    let y = model
        .add_variable("y", Variable::continuous(Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint("cover", Expr::new(vec![(x, 1.0), (y, 1.0)], 0.0).ge_scalar(5.0))
        .unwrap();
    model
        .minimize(Expr::new(vec![(x, 2.0), (y, 3.0)], 1.0))
        .unwrap();

    let mut session = Session::new(model, HighsEngine::new()).unwrap();
    let solution = session.solve(true).unwrap();

    assert_eq!(solution.status, SolverStatus::Optimal);
    assert!((solution.objective_value - 11.0).abs() < 1e-6);
    assert!((solution.value(x) - 5.0).abs() < 1e-6);
    // Reduced cost of the basic column is zero: 2 - 1 * dual = 0.
    assert!((solution.constraint_duals[0] - 2.0).abs() < 1e-6);
}

/// Test: maximize integer x subject to x <= 1.5
#[test]
fn test_integer_variable_solution() {
    let mut model = Model::new("mip");
    let x = model
        .add_variable("x", Variable::integer(Bounds::new(0.0, 10.0)))
        .unwrap();
    model
        .add_constraint("cap", Expr::var(x).le_scalar(1.5))
        .unwrap();
    model.maximize(Expr::var(x)).unwrap();

    let mut session = Session::new(model, HighsEngine::new()).unwrap();
    let mip = session.solve(false).unwrap();
    assert!((mip.value(x) - 1.0).abs() < 1e-6);
    let relaxed = session.solve(true).unwrap();
    assert!((relaxed.value(x) - 1.5).abs() < 1e-6);
}

#[test]
fn test_infeasible_model_reports_solve_failure() {
    let mut model = Model::new("infeasible");
    let x = model
        .add_variable("x", Variable::continuous(Bounds::new(0.0, 1.0)))
        .unwrap();
    model
        .add_constraint("high", Expr::var(x).ge_scalar(3.0))
        .unwrap();
    model.minimize(Expr::var(x)).unwrap();

    let mut session = Session::new(model, HighsEngine::new()).unwrap();
    let err = session.solve(true).unwrap_err();
    assert!(matches!(err, SolverError::SolveFailure { .. }));
}

/// max 3x + 4y + 5z  s.t.  2x + 3y + 4z <= 6, binaries.
#[test]
fn test_populate_collects_distinct_binary_solutions() {
    let mut model = Model::new("knapsack");
    let x = model.add_variable("x", Variable::binary()).unwrap();
    let y = model.add_variable("y", Variable::binary()).unwrap();
    let z = model.add_variable("z", Variable::binary()).unwrap();
    model
        .add_constraint(
            "capacity",
            Expr::new(vec![(x, 2.0), (y, 3.0), (z, 4.0)], 0.0).le_scalar(6.0),
        )
        .unwrap();
    model
        .maximize(Expr::new(vec![(x, 3.0), (y, 4.0), (z, 5.0)], 0.0))
        .unwrap();

    let mut session = Session::new(model, HighsEngine::new()).unwrap();
    let pool = session.populate(3).unwrap();
    assert_eq!(pool.len(), 3);
    assert!((pool[0].objective_value - 8.0).abs() < 1e-6);
    assert!((pool[1].objective_value - 7.0).abs() < 1e-6);
    assert_ne!(pool[0].primal_values, pool[1].primal_values);
    assert_ne!(pool[1].primal_values, pool[2].primal_values);
}

#[test]
fn test_warm_start_and_bound_changes() {
    let mut model = Model::new("warm");
    let x = model.add_variable("x", Variable::binary()).unwrap();
    let y = model.add_variable("y", Variable::binary()).unwrap();
    model
        .add_constraint("pick", Expr::new(vec![(x, 1.0), (y, 1.0)], 0.0).le_scalar(1.0))
        .unwrap();
    model
        .maximize(Expr::new(vec![(x, 2.0), (y, 1.0)], 0.0))
        .unwrap();

    let mut session = Session::new(model, HighsEngine::new()).unwrap();
    session.set_warm_start(&[(y, 1.0)]).unwrap();
    assert!((session.solve(false).unwrap().objective_value - 2.0).abs() < 1e-6);

    session
        .model_mut()
        .set_variable_bounds(x, Bounds::fixed(0.0))
        .unwrap();
    let solution = session.solve(false).unwrap();
    assert!((solution.objective_value - 1.0).abs() < 1e-6);
    assert!((solution.value(y) - 1.0).abs() < 1e-6);
}
