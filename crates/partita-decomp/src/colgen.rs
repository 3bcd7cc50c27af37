//! Dantzig-Wolfe column generation.
//!
//! The restricted master holds:
//!
//! - a copy of every variable owned by no block or by more than one block,
//! - one convexity row `block(b)` per block, first satisfied by an
//!   artificial variable,
//! - every master constraint, with its own artificial variable,
//! - one coupling row `link(b)(name)` per linking variable and owning block.
//!
//! Phase one prices the artificials at unit cost with the true objective
//! switched off. Once no artificial is positive the true objective is
//! installed and pricing continues until a full pass finds no column.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::path::Path;
use std::time::Instant;

use partita_core::{Bounds, Expr, Model, Sense, Variable};
use partita_expr::ids::{ConstraintId, VariableId};
use partita_solver::{Session, Solution, SolverEngine, SolverError};
use serde::Serialize;

use crate::config::ColumnGenerationConfig;
use crate::error::DecompError;
use crate::partition::BlockPartition;
use crate::pricing::Pricing;

/// Artificial-variable phase of the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    One,
    Two,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::One => "one",
            Phase::Two => "two",
        }
    }
}

/// Scheduling estimate for one block; larger scores are priced first.
#[derive(Debug, Clone, Copy)]
struct BlockEstimate {
    score: f64,
    block: usize,
}

impl Ord for BlockEstimate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.block.cmp(&self.block))
    }
}

impl PartialOrd for BlockEstimate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BlockEstimate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BlockEstimate {}

/// A generated master column: one extreme point of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaColumn {
    pub block: usize,
    /// The lambda variable in the master.
    pub variable: VariableId,
    /// True objective contribution, from exclusively owned variables only.
    pub cost: f64,
    /// Nonzero values of the extreme point, by original variable.
    pub values: Vec<(VariableId, f64)>,
}

/// One row of the iteration table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub phase: Phase,
    pub objective: f64,
    /// Most improving pricing objective of the pass.
    pub pricing: Option<f64>,
    pub columns: usize,
    /// Blocks that produced columns.
    pub blocks: usize,
    pub master_variables: usize,
    pub elapsed_seconds: f64,
}

/// Final state of a column generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGenerationReport {
    pub phase: Phase,
    pub objective: f64,
    pub columns: usize,
    pub iterations: Vec<IterationRecord>,
    /// Original-space solution recovered from the master.
    pub values: Vec<f64>,
    pub elapsed_seconds: f64,
}

/// Pricing outcome of one scheduling pass.
#[derive(Debug, Default)]
struct PassSummary {
    columns: usize,
    blocks: usize,
    best: Option<f64>,
}

/// Column generation over a [`BlockPartition`].
#[derive(Debug)]
pub struct ColumnGeneration<'a, E: SolverEngine + Default> {
    original: &'a Model,
    partition: &'a BlockPartition,
    config: ColumnGenerationConfig,
    sense: Sense,
    master: Session<E>,
    pricings: Vec<Pricing<E>>,
    /// Master copy of each original variable, for free and linking ones.
    copies: Vec<Option<VariableId>>,
    convexity: Vec<ConstraintId>,
    artificials: Vec<VariableId>,
    /// Master constraints with a copy whose lower bound is positive; the
    /// artificial alone may not absorb them.
    bounded_copy_rows: Vec<ConstraintId>,
    /// Master-row coefficients of exclusively owned variables.
    master_terms: Vec<Vec<(f64, ConstraintId)>>,
    /// Coupling-row coefficients per block and linking variable.
    linking_terms: Vec<HashMap<VariableId, Vec<(f64, ConstraintId)>>>,
    columns: Vec<LambdaColumn>,
    lambda_counts: Vec<usize>,
    phase: Phase,
    heap: BinaryHeap<BlockEstimate>,
    iterations: Vec<IterationRecord>,
}

impl<'a, E: SolverEngine + Default> ColumnGeneration<'a, E> {
    /// Build the restricted master and one pricing problem per block.
    pub fn new(
        original: &'a Model,
        partition: &'a BlockPartition,
        config: ColumnGenerationConfig,
    ) -> Result<Self, DecompError> {
        let sense = original.objective().sense.unwrap_or(Sense::Minimize);
        let artificial_cost = match sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let mut master = Model::new(format!("{}-master", original.name()));
        master.set_objective_sense(sense);

        let mut copies = vec![None; original.num_variables()];
        for (var, variable) in original.variables() {
            if partition.variable_blocks(var).len() != 1 {
                copies[var.index()] = Some(master.add_variable(variable_label(original, var), *variable)?);
            }
        }

        let mut artificials = Vec::new();
        let mut add_artificial = |master: &mut Model| -> Result<VariableId, DecompError> {
            let var = master.add_variable(
                format!("a({})", artificials.len()),
                Variable::continuous(Bounds::non_negative()),
            )?;
            master.set_objective_coefficient(var, artificial_cost)?;
            artificials.push(var);
            Ok(var)
        };

        let mut convexity = Vec::with_capacity(partition.num_blocks());
        for block in 0..partition.num_blocks() {
            let artificial = add_artificial(&mut master)?;
            convexity.push(master.add_constraint(
                format!("block({block})"),
                Expr::term(artificial, 1.0).eq_scalar(1.0),
            )?);
        }

        let mut master_terms: Vec<Vec<(f64, ConstraintId)>> = vec![Vec::new(); original.num_variables()];
        let mut bounded_copy_rows = Vec::new();
        for con in partition.master_constraints() {
            let constraint = original.get_constraint(con)?;
            let mut terms = Vec::new();
            let mut exclusive = Vec::new();
            let mut bounded = false;
            for (var, coeff) in original.row_terms(con) {
                match copies[var.index()] {
                    Some(copy) => {
                        bounded |= original.get_variable(*var)?.bounds.lower > config.eps;
                        terms.push((copy, *coeff));
                    }
                    None => exclusive.push((*var, *coeff)),
                }
            }
            if bounded {
                bounded_copy_rows.push(con);
            }
            let artificial = add_artificial(&mut master)?;
            let sign = if constraint.rhs < -config.eps { -1.0 } else { 1.0 };
            terms.push((artificial, sign));
            let row = master.add_constraint(
                constraint_label(original, con),
                Expr::new(terms, 0.0).compare_scalar(constraint.rhs, constraint.sense),
            )?;
            for (var, coeff) in exclusive {
                master_terms[var.index()].push((coeff, row));
            }
        }

        let mut linking_terms = vec![HashMap::new(); partition.num_blocks()];
        for (var, _) in original.variables() {
            let owners = partition.variable_blocks(var);
            let Some(copy) = copies[var.index()] else {
                continue;
            };
            if owners.len() < 2 {
                continue;
            }
            for &block in owners {
                let row = master.add_constraint(
                    format!("link({block})({})", variable_label(original, var)),
                    Expr::term(copy, -1.0).eq_scalar(0.0),
                )?;
                linking_terms[block]
                    .entry(var)
                    .or_insert_with(Vec::new)
                    .push((1.0, row));
            }
        }

        let pricings = (0..partition.num_blocks())
            .map(|block| {
                Pricing::new(original, partition, block, E::default(), &config.pricing, config.eps)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            component = "colgen",
            operation = "build_master",
            status = "success",
            model = %original.name(),
            blocks = partition.num_blocks(),
            master_variables = master.num_variables(),
            master_constraints = master.num_constraints(),
            linking = partition.num_linking(),
            "Built restricted master"
        );

        let master = Session::new(master, E::default())?.with_config(config.master.clone());
        let num_blocks = partition.num_blocks();
        Ok(Self {
            original,
            partition,
            config,
            sense,
            master,
            pricings,
            copies,
            convexity,
            artificials,
            bounded_copy_rows,
            master_terms,
            linking_terms,
            columns: Vec::new(),
            lambda_counts: vec![0; num_blocks],
            phase: Phase::One,
            heap: BinaryHeap::new(),
            iterations: Vec::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn master(&self) -> &Model {
        self.master.model()
    }

    pub fn columns(&self) -> &[LambdaColumn] {
        &self.columns
    }

    pub fn artificials(&self) -> &[VariableId] {
        &self.artificials
    }

    /// Convexity row of each block.
    /// Original master constraints holding a copy with a positive lower
    /// bound.
    pub fn bounded_copy_rows(&self) -> &[ConstraintId] {
        &self.bounded_copy_rows
    }

    pub fn convexity_rows(&self) -> &[ConstraintId] {
        &self.convexity
    }

    /// Master copy of an original variable, if it has one.
    pub fn master_copy(&self, var: VariableId) -> Option<VariableId> {
        self.copies.get(var.index()).copied().flatten()
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.iterations
    }

    /// Write the current master as LP text.
    pub fn write_master(&self, path: &Path) -> Result<(), DecompError> {
        Ok(self.master.write_model(path)?)
    }

    /// Run until a full pricing pass adds no column.
    pub fn solve(&mut self) -> Result<ColumnGenerationReport, DecompError> {
        let started = Instant::now();
        self.reset_schedule();
        let mut iteration = 0usize;

        let last = loop {
            let solution = self.solve_master(iteration)?;

            if self.phase == Phase::One {
                let remaining = self.clamp_artificials(&solution)?;
                if remaining == 0 {
                    self.enter_phase_two()?;
                    continue;
                }
            }

            let pass = self.pricing_pass(&solution)?;
            iteration += 1;
            let record = IterationRecord {
                iteration,
                phase: self.phase,
                objective: solution.objective_value,
                pricing: pass.best,
                columns: pass.columns,
                blocks: pass.blocks,
                master_variables: self.master.model().num_variables(),
                elapsed_seconds: started.elapsed().as_secs_f64(),
            };
            tracing::info!(
                component = "colgen",
                operation = "iteration",
                status = "success",
                iteration,
                phase = self.phase.as_str(),
                objective = record.objective,
                pricing = ?record.pricing,
                columns = record.columns,
                blocks = record.blocks,
                master_variables = record.master_variables,
                elapsed_s = record.elapsed_seconds,
                "Column generation iteration"
            );
            self.iterations.push(record);

            if pass.columns == 0 {
                break solution;
            }
        };

        if self.phase == Phase::One {
            tracing::warn!(
                component = "colgen",
                operation = "solve",
                status = "warn",
                iterations = iteration,
                "Converged with positive artificial variables; the relaxation is infeasible"
            );
        }
        let report = ColumnGenerationReport {
            phase: self.phase,
            objective: last.objective_value,
            columns: self.columns.len(),
            iterations: self.iterations.clone(),
            values: self.recover(&last),
            elapsed_seconds: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            component = "colgen",
            operation = "solve",
            status = "success",
            phase = report.phase.as_str(),
            objective = report.objective,
            columns = report.columns,
            iterations = iteration,
            duration_ms = report.elapsed_seconds * 1000.0,
            "Column generation finished"
        );
        Ok(report)
    }

    /// Price every block against the current master duals without adding
    /// columns; returns how many columns pricing would accept.
    pub fn reprice(&mut self) -> Result<usize, DecompError> {
        let iteration = self.iterations.len();
        let solution = self.solve_master(iteration)?;
        let mut found = 0;
        for block in 0..self.partition.num_blocks() {
            let reduced = self.reduced_costs(block, &solution);
            let fixed = -solution.dual(self.convexity[block]);
            if self.pricings[block].run(&reduced, fixed)? {
                found += self.pricings[block].solutions().len();
            }
        }
        Ok(found)
    }

    fn reset_schedule(&mut self) {
        self.heap.clear();
        self.heap.extend((0..self.partition.num_blocks()).map(|block| BlockEstimate {
            score: f64::INFINITY,
            block,
        }));
    }

    fn solve_master(&mut self, iteration: usize) -> Result<Solution, DecompError> {
        match self.master.solve(true) {
            Ok(solution) => Ok(solution),
            Err(SolverError::SolveFailure { status }) => {
                if !self.bounded_copy_rows.is_empty() {
                    let rows: Vec<String> = self
                        .bounded_copy_rows
                        .iter()
                        .map(|con| constraint_label(self.original, *con))
                        .collect();
                    tracing::warn!(
                        component = "colgen",
                        operation = "solve_master",
                        status = "error",
                        iteration,
                        rows = ?rows,
                        "Master rows hold copies with positive lower bounds; their artificials may not cover them"
                    );
                }
                if let Some(dir) = &self.config.diagnostics {
                    let path = dir.join(format!("{}.lp", self.master.model().name()));
                    match self.master.write_model(&path) {
                        Ok(()) => tracing::error!(
                            component = "colgen",
                            operation = "solve_master",
                            status = "error",
                            iteration,
                            path = %path.display(),
                            "Restricted master is infeasible, see the written model"
                        ),
                        Err(write_err) => tracing::error!(
                            component = "colgen",
                            operation = "solve_master",
                            status = "error",
                            iteration,
                            error = %write_err,
                            "Restricted master is infeasible and could not be written"
                        ),
                    }
                }
                Err(DecompError::MasterInfeasible { iteration, status })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Lock out artificials that reached zero; returns how many are positive.
    fn clamp_artificials(&mut self, solution: &Solution) -> Result<usize, DecompError> {
        let eps = self.config.eps;
        let mut remaining = 0;
        for &artificial in &self.artificials {
            let value = solution.value(artificial).abs();
            let upper = self.master.model().get_variable(artificial)?.bounds.upper;
            if value <= eps && upper > eps {
                self.master
                    .model_mut()
                    .set_variable_bounds(artificial, Bounds::new(0.0, 0.0))?;
            } else if value > eps {
                remaining += 1;
            }
        }
        Ok(remaining)
    }

    /// Install the true objective on master copies and existing lambdas.
    fn enter_phase_two(&mut self) -> Result<(), DecompError> {
        let objective = self.original.objective();
        let artificial_cost = match self.sense {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let mut terms: Vec<(VariableId, f64)> = self
            .artificials
            .iter()
            .map(|artificial| (*artificial, artificial_cost))
            .collect();
        for (index, copy) in self.copies.iter().enumerate() {
            if let Some(copy) = copy {
                let cost = objective.coefficient(VariableId::from_index(index));
                if cost != 0.0 {
                    terms.push((*copy, cost));
                }
            }
        }
        terms.extend(
            self.columns
                .iter()
                .filter(|column| column.cost != 0.0)
                .map(|column| (column.variable, column.cost)),
        );
        self.master
            .model_mut()
            .set_objective(self.sense, Expr::new(terms, objective.constant))?;
        self.phase = Phase::Two;
        self.reset_schedule();
        tracing::info!(
            component = "colgen",
            operation = "phase_two",
            status = "success",
            columns = self.columns.len(),
            "All artificial variables are zero, reoptimizing"
        );
        Ok(())
    }

    fn reduced_costs(&self, block: usize, solution: &Solution) -> Vec<f64> {
        let objective = self.original.objective();
        let Some(part) = self.partition.block(block) else {
            return Vec::new();
        };
        part.variables
            .iter()
            .map(|var| {
                let exclusive = self.partition.variable_blocks(*var).len() == 1;
                let mut cost = if self.phase == Phase::Two && exclusive {
                    objective.coefficient(*var)
                } else {
                    0.0
                };
                for (coeff, row) in &self.master_terms[var.index()] {
                    cost -= coeff * solution.dual(*row);
                }
                if let Some(terms) = self.linking_terms[block].get(var) {
                    for (coeff, row) in terms {
                        cost -= coeff * solution.dual(*row);
                    }
                }
                cost
            })
            .collect()
    }

    fn pricing_pass(&mut self, solution: &Solution) -> Result<PassSummary, DecompError> {
        let signal = match self.sense {
            Sense::Minimize => -1.0,
            Sense::Maximize => 1.0,
        };
        let mut summary = PassSummary::default();
        let mut done = Vec::with_capacity(self.partition.num_blocks());

        while let Some(BlockEstimate { block, .. }) = self.heap.pop() {
            let reduced = self.reduced_costs(block, solution);
            let fixed = -solution.dual(self.convexity[block]);
            if !self.pricings[block].run(&reduced, fixed)? {
                done.push(BlockEstimate { score: 0.0, block });
                continue;
            }

            let found = self.pricings[block].solutions().to_vec();
            for values in &found {
                self.add_column(block, values)?;
            }
            let best = self.pricings[block].best_objective().unwrap_or_default();
            summary.columns += found.len();
            summary.blocks += 1;
            summary.best = match summary.best {
                Some(current) if !self.sense.improves(best, current, 0.0) => Some(current),
                _ => Some(best),
            };
            done.push(BlockEstimate {
                score: signal * best,
                block,
            });
            tracing::debug!(
                component = "colgen",
                operation = "price",
                status = "success",
                block,
                columns = found.len(),
                best,
                "Added columns"
            );
            if self.config.run_once {
                break;
            }
        }
        self.heap.extend(done);
        Ok(summary)
    }

    fn add_column(&mut self, block: usize, values: &[f64]) -> Result<(), DecompError> {
        let eps = self.config.eps;
        let Some(part) = self.partition.block(block) else {
            return Err(DecompError::InvalidParameter {
                name: "block",
                reason: format!("{block} is out of range"),
            });
        };
        let objective = self.original.objective();
        let name = format!("lambda({},{})", block, self.lambda_counts[block]);
        self.lambda_counts[block] += 1;

        let mut rows: BTreeMap<ConstraintId, f64> = BTreeMap::new();
        rows.insert(self.convexity[block], 1.0);
        let mut cost = 0.0;
        let mut nonzeros = Vec::new();
        for (var, value) in part.variables.iter().zip(values) {
            if value.abs() < eps {
                continue;
            }
            nonzeros.push((*var, *value));
            if self.partition.variable_blocks(*var).len() == 1 {
                cost += objective.coefficient(*var) * value;
            }
            for (coeff, row) in &self.master_terms[var.index()] {
                *rows.entry(*row).or_insert(0.0) += coeff * value;
            }
            if let Some(terms) = self.linking_terms[block].get(var) {
                for (coeff, row) in terms {
                    *rows.entry(*row).or_insert(0.0) += coeff * value;
                }
            }
        }

        let model = self.master.model_mut();
        let lambda = model.add_variable(name, Variable::continuous(Bounds::non_negative()))?;
        for (row, coeff) in rows {
            if coeff != 0.0 {
                model.set_coefficient(lambda, row, coeff)?;
            }
        }
        if self.phase == Phase::Two && cost != 0.0 {
            model.set_objective_coefficient(lambda, cost)?;
        }
        self.columns.push(LambdaColumn {
            block,
            variable: lambda,
            cost,
            values: nonzeros,
        });
        Ok(())
    }

    /// `x_v = sum_k lambda_k x_v^k` for exclusive variables, master copy
    /// values for the rest.
    fn recover(&self, solution: &Solution) -> Vec<f64> {
        let mut values = vec![0.0; self.original.num_variables()];
        for (index, copy) in self.copies.iter().enumerate() {
            if let Some(copy) = copy {
                values[index] = solution.value(*copy);
            }
        }
        for column in &self.columns {
            let weight = solution.value(column.variable);
            if weight.abs() <= self.config.eps {
                continue;
            }
            for (var, value) in &column.values {
                if self.copies[var.index()].is_none() {
                    values[var.index()] += weight * value;
                }
            }
        }
        values
    }
}

fn variable_label(model: &Model, var: VariableId) -> String {
    model
        .variable_name(var)
        .map_or_else(|| format!("x{}", var.inner()), str::to_string)
}

fn constraint_label(model: &Model, con: ConstraintId) -> String {
    model
        .constraint_name(con)
        .map_or_else(|| format!("c{}", con.inner()), str::to_string)
}
