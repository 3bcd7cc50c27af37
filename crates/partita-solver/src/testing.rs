//! Dense reference engine for test suites.
//!
//! Small LPs are solved with a two-phase tableau simplex using Bland's rule.
//! Integer columns are handled by enumerating every assignment inside their
//! bounds and solving the remaining LP, which also gives an exact
//! `populate`. Only meant for models with a handful of columns.

use std::cmp::Ordering;
use std::time::Instant;

use partita_core::{Bounds, ComparisonSense, ModelAction, Sense};
use partita_expr::ids::VariableId;

use crate::{EngineModel, Solution, SolverConfig, SolverEngine, SolverError, SolverStatus};

const PIVOT_TOL: f64 = 1e-9;
const COST_TOL: f64 = 1e-9;
const FEASIBILITY_TOL: f64 = 1e-7;
const ITERATION_LIMIT: usize = 10_000;
const MAX_ASSIGNMENTS: u64 = 200_000;

#[derive(Debug, Default)]
pub struct DenseEngine {
    mirror: EngineModel,
    warm_start: Vec<(VariableId, f64)>,
}

impl DenseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mirror(&self) -> &EngineModel {
        &self.mirror
    }

    /// Hints from the last `set_warm_start` call.
    pub fn warm_start(&self) -> &[(VariableId, f64)] {
        &self.warm_start
    }

    fn sense(&self) -> Result<Sense, SolverError> {
        if self.mirror.num_columns() == 0 {
            return Err(SolverError::EmptyModel);
        }
        self.mirror.sense.ok_or(SolverError::NoObjective)
    }

    /// Solve the LP with every integer column fixed at `assignment`.
    fn enumerate(&self, limit: usize) -> Result<Vec<Solution>, SolverError> {
        let sense = self.sense()?;
        let started = Instant::now();
        let integers = self.mirror.integer_columns();
        let mut ranges = Vec::with_capacity(integers.len());
        let mut total: u64 = 1;
        for &col in &integers {
            let bounds = self.mirror.columns[col].bounds;
            if !bounds.lower.is_finite() || !bounds.upper.is_finite() {
                return Err(SolverError::Unsupported(format!(
                    "integer column {col} has an infinite bound"
                )));
            }
            let lo = (bounds.lower - FEASIBILITY_TOL).ceil();
            let hi = (bounds.upper + FEASIBILITY_TOL).floor();
            if lo > hi {
                return Err(SolverError::SolveFailure {
                    status: SolverStatus::Infeasible,
                });
            }
            total = total.saturating_mul((hi - lo) as u64 + 1);
            if total > MAX_ASSIGNMENTS {
                return Err(SolverError::Unsupported(format!(
                    "more than {MAX_ASSIGNMENTS} integer assignments"
                )));
            }
            ranges.push((lo, hi));
        }

        let mut bounds: Vec<Bounds> = self.mirror.columns.iter().map(|c| c.bounds).collect();
        let mut current: Vec<f64> = ranges.iter().map(|(lo, _)| *lo).collect();
        let mut found: Vec<(f64, Vec<f64>)> = Vec::new();
        loop {
            for (pos, &col) in integers.iter().enumerate() {
                bounds[col] = Bounds::fixed(current[pos]);
            }
            match solve_lp(&self.mirror, &bounds, sense) {
                Ok(lp) => found.push((lp.objective, lp.values)),
                Err(SolverError::SolveFailure {
                    status: SolverStatus::Infeasible,
                }) => {}
                Err(err) => return Err(err),
            }
            if !advance(&mut current, &ranges) {
                break;
            }
        }

        found.sort_by(|a, b| match sense {
            Sense::Minimize => a.0.total_cmp(&b.0),
            Sense::Maximize => b.0.total_cmp(&a.0),
        });
        if found.is_empty() {
            return Err(SolverError::SolveFailure {
                status: SolverStatus::Infeasible,
            });
        }
        let elapsed = started.elapsed().as_secs_f64();
        let rows = self.mirror.num_rows();
        Ok(found
            .into_iter()
            .take(limit.max(1))
            .enumerate()
            .map(|(rank, (objective, values))| Solution {
                primal_values: values,
                constraint_duals: vec![0.0; rows],
                objective_value: objective,
                status: if rank == 0 {
                    SolverStatus::Optimal
                } else {
                    SolverStatus::Feasible
                },
                solve_time_seconds: elapsed,
            })
            .collect())
    }
}

/// Odometer step over integer ranges; false once every combination was seen.
fn advance(current: &mut [f64], ranges: &[(f64, f64)]) -> bool {
    for (value, (lo, hi)) in current.iter_mut().zip(ranges) {
        if *value < *hi {
            *value += 1.0;
            return true;
        }
        *value = *lo;
    }
    false
}

impl SolverEngine for DenseEngine {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn apply(&mut self, actions: &[ModelAction]) -> Result<(), SolverError> {
        self.mirror.apply_all(actions)
    }

    fn set_warm_start(&mut self, hints: &[(VariableId, f64)]) -> Result<(), SolverError> {
        for (var, _) in hints {
            if var.index() >= self.mirror.num_columns() {
                return Err(SolverError::InvalidVariableId(*var));
            }
        }
        self.warm_start = hints.to_vec();
        Ok(())
    }

    fn solve(&mut self, relaxed: bool, _config: &SolverConfig) -> Result<Solution, SolverError> {
        let sense = self.sense()?;
        if !relaxed && self.mirror.is_mip() {
            let mut best = self.enumerate(1)?;
            return best.pop().ok_or(SolverError::SolveFailure {
                status: SolverStatus::Infeasible,
            });
        }
        let started = Instant::now();
        let bounds: Vec<Bounds> = self.mirror.columns.iter().map(|c| c.bounds).collect();
        let lp = solve_lp(&self.mirror, &bounds, sense)?;
        Ok(Solution {
            primal_values: lp.values,
            constraint_duals: lp.duals,
            objective_value: lp.objective,
            status: SolverStatus::Optimal,
            solve_time_seconds: started.elapsed().as_secs_f64(),
        })
    }

    fn populate(
        &mut self,
        limit: usize,
        config: &SolverConfig,
    ) -> Result<Vec<Solution>, SolverError> {
        if self.mirror.is_mip() {
            self.enumerate(limit)
        } else {
            self.solve(true, config).map(|solution| vec![solution])
        }
    }
}

struct LpResult {
    values: Vec<f64>,
    duals: Vec<f64>,
    objective: f64,
}

/// Column `j` of the model is `offset + sum(sign * p_k)` over nonnegative
/// structural columns `p_k`.
struct ColumnMap {
    offset: f64,
    parts: Vec<(usize, f64)>,
}

fn solve_lp(mirror: &EngineModel, bounds: &[Bounds], sense: Sense) -> Result<LpResult, SolverError> {
    let direction = match sense {
        Sense::Minimize => 1.0,
        Sense::Maximize => -1.0,
    };

    // Substitute every column by nonnegative parts.
    let mut maps = Vec::with_capacity(bounds.len());
    let mut bound_rows: Vec<(usize, f64)> = Vec::new();
    let mut n_struct = 0;
    for b in bounds {
        if b.lower > b.upper + FEASIBILITY_TOL {
            return Err(SolverError::SolveFailure {
                status: SolverStatus::Infeasible,
            });
        }
        let map = if b.lower.is_finite() {
            if b.upper.is_finite() {
                bound_rows.push((n_struct, (b.upper - b.lower).max(0.0)));
            }
            ColumnMap {
                offset: b.lower,
                parts: vec![(n_struct, 1.0)],
            }
        } else if b.upper.is_finite() {
            ColumnMap {
                offset: b.upper,
                parts: vec![(n_struct, -1.0)],
            }
        } else {
            n_struct += 1;
            ColumnMap {
                offset: 0.0,
                parts: vec![(n_struct - 1, 1.0), (n_struct, -1.0)],
            }
        };
        n_struct += 1;
        maps.push(map);
    }

    let mut costs = vec![0.0; n_struct];
    for (col, map) in mirror.columns.iter().zip(&maps) {
        for (part, sign) in &map.parts {
            costs[*part] += direction * col.objective * sign;
        }
    }

    // Rows over the structural columns: model rows first, then bound rows.
    let mut rows: Vec<(Vec<f64>, ComparisonSense, f64)> = Vec::new();
    for row in &mirror.rows {
        let mut coeffs = vec![0.0; n_struct];
        let mut rhs = row.rhs;
        for (col, a) in &row.terms {
            let map = &maps[*col];
            rhs -= a * map.offset;
            for (part, sign) in &map.parts {
                coeffs[*part] += a * sign;
            }
        }
        rows.push((coeffs, row.sense, rhs));
    }
    for (part, width) in bound_rows {
        let mut coeffs = vec![0.0; n_struct];
        coeffs[part] = 1.0;
        rows.push((coeffs, ComparisonSense::LessEqual, width));
    }

    let m = rows.len();
    let n_slack = rows
        .iter()
        .filter(|(_, sense, _)| *sense != ComparisonSense::Equal)
        .count();
    let art_start = n_struct + n_slack;
    let width = art_start + m;
    let rhs_col = width;

    let mut tableau = vec![vec![0.0; width + 1]; m];
    let mut flips = vec![1.0; m];
    let mut basis = Vec::with_capacity(m);
    let mut slack = n_struct;
    for (r, (coeffs, row_sense, rhs)) in rows.into_iter().enumerate() {
        let line = &mut tableau[r];
        line[..n_struct].copy_from_slice(&coeffs);
        match row_sense {
            ComparisonSense::LessEqual => {
                line[slack] = 1.0;
                slack += 1;
            }
            ComparisonSense::GreaterEqual => {
                line[slack] = -1.0;
                slack += 1;
            }
            ComparisonSense::Equal => {}
        }
        line[rhs_col] = rhs;
        if rhs < 0.0 {
            for value in line.iter_mut() {
                *value = -*value;
            }
            flips[r] = -1.0;
        }
        line[art_start + r] = 1.0;
        basis.push(art_start + r);
    }

    // Phase 1: drive the artificial sum to zero.
    let mut phase1 = vec![0.0; width];
    for cost in &mut phase1[art_start..] {
        *cost = 1.0;
    }
    run_simplex(&mut tableau, &mut basis, &phase1, art_start)?;
    let infeasibility: f64 = basis
        .iter()
        .enumerate()
        .filter(|(_, col)| **col >= art_start)
        .map(|(row, _)| tableau[row][rhs_col])
        .sum();
    if infeasibility > FEASIBILITY_TOL {
        return Err(SolverError::SolveFailure {
            status: SolverStatus::Infeasible,
        });
    }
    for row in 0..m {
        if basis[row] < art_start {
            continue;
        }
        let entering = (0..art_start)
            .find(|col| !basis.contains(col) && tableau[row][*col].abs() > PIVOT_TOL);
        if let Some(col) = entering {
            pivot(&mut tableau, row, col);
            basis[row] = col;
        }
    }

    // Phase 2: original costs, artificials locked out.
    let mut phase2 = vec![0.0; width];
    phase2[..n_struct].copy_from_slice(&costs);
    run_simplex(&mut tableau, &mut basis, &phase2, art_start)?;

    let mut parts = vec![0.0; n_struct];
    for (row, col) in basis.iter().enumerate() {
        if *col < n_struct {
            parts[*col] = tableau[row][rhs_col];
        }
    }
    let values: Vec<f64> = maps
        .iter()
        .map(|map| {
            map.parts
                .iter()
                .fold(map.offset, |acc, (part, sign)| acc + sign * parts[*part])
        })
        .collect();

    let duals = (0..mirror.num_rows())
        .map(|r| {
            let multiplier: f64 = basis
                .iter()
                .enumerate()
                .map(|(row, col)| phase2[*col] * tableau[row][art_start + r])
                .sum();
            direction * flips[r] * multiplier
        })
        .collect();

    Ok(LpResult {
        objective: mirror.objective_value(&values),
        values,
        duals,
    })
}

/// Minimize `costs` over the tableau; only columns below `enter_limit` may
/// enter the basis.
fn run_simplex(
    tableau: &mut [Vec<f64>],
    basis: &mut [usize],
    costs: &[f64],
    enter_limit: usize,
) -> Result<(), SolverError> {
    let rhs_col = costs.len();
    for _ in 0..ITERATION_LIMIT {
        let entering = (0..enter_limit).find(|col| {
            if basis.contains(col) {
                return false;
            }
            let reduced = costs[*col]
                - basis
                    .iter()
                    .enumerate()
                    .map(|(row, b)| costs[*b] * tableau[row][*col])
                    .sum::<f64>();
            reduced < -COST_TOL
        });
        let Some(col) = entering else {
            return Ok(());
        };

        let mut leaving: Option<(usize, f64)> = None;
        for (row, line) in tableau.iter().enumerate() {
            if line[col] <= PIVOT_TOL {
                continue;
            }
            let ratio = line[rhs_col] / line[col];
            leaving = match leaving {
                None => Some((row, ratio)),
                Some((best, best_ratio)) => match ratio.total_cmp(&best_ratio) {
                    _ if (ratio - best_ratio).abs() <= PIVOT_TOL => {
                        if basis[row] < basis[best] {
                            Some((row, ratio))
                        } else {
                            Some((best, best_ratio))
                        }
                    }
                    Ordering::Less => Some((row, ratio)),
                    _ => Some((best, best_ratio)),
                },
            };
        }
        let Some((row, _)) = leaving else {
            return Err(SolverError::SolveFailure {
                status: SolverStatus::Unbounded,
            });
        };
        pivot(tableau, row, col);
        basis[row] = col;
    }
    Err(SolverError::SolveFailure {
        status: SolverStatus::ReachedIterationLimit,
    })
}

fn pivot(tableau: &mut [Vec<f64>], row: usize, col: usize) {
    let scale = tableau[row][col];
    for value in tableau[row].iter_mut() {
        *value /= scale;
    }
    let pivot_row = tableau[row].clone();
    for (idx, line) in tableau.iter_mut().enumerate() {
        if idx == row {
            continue;
        }
        let factor = line[col];
        if factor == 0.0 {
            continue;
        }
        for (value, p) in line.iter_mut().zip(&pivot_row) {
            *value -= factor * p;
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use partita_core::{Expr, Model, Variable};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-7
    }

    fn engine_for(mut model: Model) -> DenseEngine {
        let mut engine = DenseEngine::new();
        engine.apply(&model.take_actions()).unwrap();
        engine
    }

    #[test]
    fn solves_lp_with_ge_rows_and_reports_duals() {
        // min 2x + 3y  s.t.  x + y >= 4, x - y <= 2
        let mut model = Model::new("lp");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::non_negative()))
            .unwrap();
        let y = model
            .add_variable("y", Variable::continuous(Bounds::non_negative()))
            .unwrap();
        model
            .add_constraint("cover", Expr::new(vec![(x, 1.0), (y, 1.0)], 0.0).ge_scalar(4.0))
            .unwrap();
        model
            .add_constraint("gap", Expr::new(vec![(x, 1.0), (y, -1.0)], 0.0).le_scalar(2.0))
            .unwrap();
        model
            .minimize(Expr::new(vec![(x, 2.0), (y, 3.0)], 0.0))
            .unwrap();

        let mut engine = engine_for(model);
        let solution = engine.solve(true, &SolverConfig::default()).unwrap();
        assert!(close(solution.primal_values[0], 3.0));
        assert!(close(solution.primal_values[1], 1.0));
        assert!(close(solution.objective_value, 9.0));
        // Both rows bind: y_cover + y_gap = 2, y_cover - y_gap = 3.
        assert!(close(solution.constraint_duals[0], 2.5));
        assert!(close(solution.constraint_duals[1], -0.5));
    }

    #[test]
    fn maximize_duals_follow_reduced_cost_convention() {
        // max x  s.t.  x <= 3
        let mut model = Model::new("max");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::non_negative()))
            .unwrap();
        model
            .add_constraint("cap", Expr::var(x).le_scalar(3.0))
            .unwrap();
        model.maximize(Expr::new(vec![(x, 1.0)], 1.0)).unwrap();

        let mut engine = engine_for(model);
        let solution = engine.solve(true, &SolverConfig::default()).unwrap();
        assert!(close(solution.objective_value, 4.0));
        // c - a * y = 0 for the basic column.
        assert!(close(solution.constraint_duals[0], 1.0));
    }

    #[test]
    fn handles_free_and_upper_bounded_columns() {
        // min x - y  s.t.  x - y >= -2, x >= -5 (row), y <= 1
        let mut model = Model::new("free");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::free()))
            .unwrap();
        let y = model
            .add_variable(
                "y",
                Variable::continuous(Bounds::new(f64::NEG_INFINITY, 1.0)),
            )
            .unwrap();
        model
            .add_constraint("diff", Expr::new(vec![(x, 1.0), (y, -1.0)], 0.0).ge_scalar(-2.0))
            .unwrap();
        model
            .add_constraint("floor", Expr::var(x).ge_scalar(-5.0))
            .unwrap();
        model
            .minimize(Expr::new(vec![(x, 1.0), (y, -1.0)], 0.0))
            .unwrap();

        let mut engine = engine_for(model);
        let solution = engine.solve(true, &SolverConfig::default()).unwrap();
        assert!(close(solution.objective_value, -2.0));
    }

    #[test]
    fn detects_infeasible_and_unbounded() {
        let mut model = Model::new("bad");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::new(0.0, 1.0)))
            .unwrap();
        model
            .add_constraint("high", Expr::var(x).ge_scalar(2.0))
            .unwrap();
        model.minimize(Expr::var(x)).unwrap();
        let err = engine_for(model)
            .solve(true, &SolverConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::SolveFailure {
                status: SolverStatus::Infeasible
            }
        );

        let mut model = Model::new("open");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::non_negative()))
            .unwrap();
        model.maximize(Expr::var(x)).unwrap();
        let err = engine_for(model)
            .solve(true, &SolverConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::SolveFailure {
                status: SolverStatus::Unbounded
            }
        );
    }

    #[test]
    fn populate_returns_distinct_solutions_best_first() {
        // max 3x + 4y + 5z  s.t.  2x + 3y + 4z <= 6, binaries.
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

        let mut engine = engine_for(model);
        let best = engine.solve(false, &SolverConfig::default()).unwrap();
        assert!(close(best.objective_value, 8.0));
        assert_eq!(best.status, SolverStatus::Optimal);

        let pool = engine.populate(3, &SolverConfig::default()).unwrap();
        assert_eq!(pool.len(), 3);
        assert!(close(pool[0].objective_value, 8.0));
        assert!(close(pool[1].objective_value, 7.0));
        assert!(pool[1].objective_value >= pool[2].objective_value);
        assert_ne!(pool[0].primal_values, pool[1].primal_values);

        let relaxed = engine.solve(true, &SolverConfig::default()).unwrap();
        assert!(relaxed.objective_value >= 8.0);
    }

    #[test]
    fn warm_start_rejects_unknown_columns() {
        let mut model = Model::new("w");
        model.add_variable("x", Variable::binary()).unwrap();
        model.minimize(Expr::new_empty()).unwrap();
        let mut engine = engine_for(model);
        engine
            .set_warm_start(&[(VariableId::new(0), 1.0)])
            .unwrap();
        assert_eq!(engine.warm_start().len(), 1);
        assert!(engine.set_warm_start(&[(VariableId::new(5), 1.0)]).is_err());
    }
}
