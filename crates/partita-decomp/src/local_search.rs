//! Local search over block neighborhoods.
//!
//! Each round re-optimizes a sequence of block groups drawn from every
//! decomposition. Variables outside the group are fixed at their incumbent
//! values; a re-optimization is kept only when it strictly improves the
//! incumbent. Rounds repeat while they improve or while the neighborhood
//! size can still grow, until the deadline.

use std::time::Instant;

use partita_core::{Bounds, Sense};
use partita_expr::ids::VariableId;
use partita_solver::{Session, SolverEngine};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::config::{EPS, LocalSearchConfig};
use crate::constructive::restore_bounds;
use crate::decomposition::Decomposition;
use crate::error::DecompError;
use crate::solution::PartialSolution;
use crate::subproblem::BlockGroup;

/// A block group plus the variables it frees.
#[derive(Debug, Clone)]
struct Neighborhood {
    group: BlockGroup,
    /// Group variables followed by the decomposition's unowned variables.
    variables: Vec<VariableId>,
    free: Vec<bool>,
}

impl Neighborhood {
    fn new(dec: &Decomposition, group: BlockGroup, num_variables: usize) -> Self {
        let mut free = vec![false; num_variables];
        let mut variables = Vec::with_capacity(group.variables.len());
        for var in group.variables.iter().copied().chain(dec.unowned_variables()) {
            if let Some(slot) = free.get_mut(var.index()) {
                if !*slot {
                    *slot = true;
                    variables.push(var);
                }
            }
        }
        Self {
            group,
            variables,
            free,
        }
    }
}

/// Summary of a local search run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalSearchStats {
    pub initial_objective: f64,
    pub objective: f64,
    pub rounds: usize,
    pub subproblems_solved: usize,
    pub improvements: usize,
    pub timed_out: bool,
    pub elapsed_seconds: f64,
}

/// Final incumbent and statistics.
#[derive(Debug, Clone)]
pub struct LocalSearchOutcome {
    pub solution: PartialSolution,
    pub stats: LocalSearchStats,
}

/// Neighborhood sizes per decomposition, adapted between rounds.
#[derive(Debug)]
pub struct LocalSearch {
    config: LocalSearchConfig,
    etas: Vec<usize>,
    steps: Vec<usize>,
}

impl LocalSearch {
    pub fn new(config: LocalSearchConfig) -> Result<Self, DecompError> {
        config.validate()?;
        Ok(Self {
            config,
            etas: Vec::new(),
            steps: Vec::new(),
        })
    }

    /// Current group size for decomposition `index`.
    pub fn eta(&self, index: usize) -> Option<usize> {
        self.etas.get(index).copied()
    }

    /// Current scheduling step for decomposition `index`.
    pub fn step(&self, index: usize) -> Option<usize> {
        self.steps.get(index).copied()
    }

    /// Improve `solution` until no round helps or `deadline` passes.
    ///
    /// `session` must hold the full model. Its bounds are restored before
    /// returning, also on error.
    pub fn run<E: SolverEngine, R: Rng + ?Sized>(
        &mut self,
        session: &mut Session<E>,
        decompositions: &mut [Decomposition],
        solution: PartialSolution,
        deadline: Instant,
        rng: &mut R,
    ) -> Result<LocalSearchOutcome, DecompError> {
        let started = Instant::now();
        let snapshot: Vec<(VariableId, Bounds)> = session
            .model()
            .variables()
            .map(|(var, variable)| (var, variable.bounds))
            .collect();
        let result = self.search(session, decompositions, solution, deadline, &snapshot, rng);
        restore_bounds(session, &snapshot)?;
        let (solution, mut stats) = result?;
        stats.elapsed_seconds = started.elapsed().as_secs_f64();

        tracing::info!(
            component = "local_search",
            operation = "run",
            status = "success",
            objective = stats.objective,
            initial_objective = stats.initial_objective,
            rounds = stats.rounds,
            subproblems = stats.subproblems_solved,
            improvements = stats.improvements,
            timed_out = stats.timed_out,
            elapsed_seconds = stats.elapsed_seconds,
            "Local search finished"
        );
        Ok(LocalSearchOutcome { solution, stats })
    }

    fn search<E: SolverEngine, R: Rng + ?Sized>(
        &mut self,
        session: &mut Session<E>,
        decompositions: &mut [Decomposition],
        mut solution: PartialSolution,
        deadline: Instant,
        snapshot: &[(VariableId, Bounds)],
        rng: &mut R,
    ) -> Result<(PartialSolution, LocalSearchStats), DecompError> {
        self.init_parameters(decompositions);
        let sense = session.model().objective().sense.unwrap_or(Sense::Minimize);
        let mut current = solution.objective(session.model());
        let mut stats = LocalSearchStats {
            initial_objective: current,
            objective: current,
            rounds: 0,
            subproblems_solved: 0,
            improvements: 0,
            timed_out: false,
            elapsed_seconds: 0.0,
        };
        let mut neighborhoods = self.make_neighborhoods(decompositions, session.model().num_variables(), rng);

        loop {
            stats.rounds += 1;
            let len = neighborhoods.len();
            if len == 0 {
                break;
            }
            let mut improved = false;
            let mut remaining = len;
            let mut index = 0;

            while remaining > 0 {
                let neighborhood = &neighborhoods[index];
                tracing::info!(
                    component = "local_search",
                    operation = "solve_neighborhood",
                    status = "start",
                    decomposition = neighborhood.group.decomposition,
                    blocks = neighborhood.group.len(),
                    variables = neighborhood.variables.len(),
                    "Solving {} blocks",
                    neighborhood.group.len()
                );
                fix_outside(session, neighborhood, &solution, snapshot)?;
                session.set_warm_start(&solution.hints())?;

                let solver = self.config.solver.bounded_by(deadline);
                match session.solve_with(false, &solver) {
                    Ok(result) => {
                        let model = session.model();
                        let values: Vec<f64> = neighborhood
                            .variables
                            .iter()
                            .map(|var| result.value(*var))
                            .collect();
                        let delta: f64 = neighborhood
                            .variables
                            .iter()
                            .zip(&values)
                            .map(|(var, value)| {
                                let rounded = model
                                    .get_variable(*var)
                                    .map_or(*value, |variable| variable.round(*value));
                                let old = solution.values()[var.index()];
                                model.objective().coefficient(*var) * (rounded - old)
                            })
                            .sum();
                        if sense.improves(current + delta, current, EPS) {
                            solution.update(model, &neighborhood.variables, &values)?;
                            current = solution.objective(model);
                            stats.improvements += 1;
                            improved = true;
                            tracing::info!(
                                component = "local_search",
                                operation = "solve_neighborhood",
                                status = "improved",
                                delta,
                                objective = current,
                                "Solution cost has improved by {} to {}",
                                delta,
                                current
                            );
                            if self.config.reoptimize {
                                remaining = len;
                            }
                        }
                    }
                    Err(err) if err.is_solve_failure() => {
                        tracing::warn!(
                            component = "local_search",
                            operation = "solve_neighborhood",
                            status = "warn",
                            error = %err,
                            "Solver did not end correctly"
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
                stats.subproblems_solved += 1;

                if Instant::now() >= deadline {
                    stats.timed_out = true;
                    stats.objective = current;
                    tracing::info!(
                        component = "local_search",
                        operation = "run",
                        status = "timeout",
                        objective = current,
                        "Time limit reached"
                    );
                    return Ok((solution, stats));
                }
                remaining -= 1;
                index = (index + 1) % len;
            }

            let grown = self.update_parameters(decompositions);
            if !grown && !improved {
                break;
            }
            neighborhoods = self.make_neighborhoods(decompositions, session.model().num_variables(), rng);
        }

        stats.objective = current;
        Ok((solution, stats))
    }

    fn init_parameters(&mut self, decompositions: &[Decomposition]) {
        self.etas = decompositions
            .iter()
            .map(|dec| {
                let eta = if dec.eta != 0 {
                    dec.eta
                } else {
                    self.config.eta.min(dec.max_eta)
                };
                eta.max(1)
            })
            .collect();
        self.steps = decompositions
            .iter()
            .map(|dec| {
                let step = if dec.step != 0 {
                    dec.step
                } else {
                    self.config.step.min(dec.max_step)
                };
                step.max(1)
            })
            .collect();
    }

    /// Grow each decomposition's group size by its `eta_skip` while it stays
    /// within `max_eta` and the block count, and its step along with it.
    /// Returns whether any grew.
    fn update_parameters(&mut self, decompositions: &[Decomposition]) -> bool {
        let mut grown = false;
        for (index, dec) in decompositions.iter().enumerate() {
            let eta = self.etas[index];
            let next = eta.saturating_add(dec.eta_skip);
            if next <= dec.max_eta && next <= dec.num_blocks() {
                self.etas[index] = next;
                self.steps[index] = dec.max_step.min(next.div_ceil(2).max(self.steps[index]));
                grown = true;
            }
        }
        grown
    }

    /// Groups for every decomposition, shuffled and then stably sorted by
    /// priority.
    fn make_neighborhoods<R: Rng + ?Sized>(
        &self,
        decompositions: &mut [Decomposition],
        num_variables: usize,
        rng: &mut R,
    ) -> Vec<Neighborhood> {
        let mut pool = Vec::new();
        for (index, dec) in decompositions.iter_mut().enumerate() {
            let num_blocks = dec.num_blocks();
            if num_blocks == 0 {
                continue;
            }
            if dec.shuffle {
                dec.shuffle_blocks(rng);
            }
            let eta = self.etas[index];
            let step = self.steps[index];
            let max_blocks = if eta < step {
                (num_blocks / eta).max(1)
            } else {
                num_blocks
            };

            let mut covered = vec![false; num_blocks];
            let mut count = 0;
            let mut position = 0;
            while count < max_blocks {
                let seed = dec.order()[position];
                dec.sort_connections(seed, rng);
                let group = BlockGroup::grow(dec, seed, eta);
                for id in &group.blocks {
                    let at = dec.position(*id);
                    if !covered[at] {
                        covered[at] = true;
                        count += 1;
                    }
                }
                pool.push(Neighborhood::new(dec, group, num_variables));
                for _ in 0..step {
                    position = (position + 1) % num_blocks;
                    if !covered[position] {
                        break;
                    }
                }
            }
            tracing::debug!(
                component = "local_search",
                operation = "make_neighborhoods",
                status = "success",
                decomposition = %dec.name,
                eta,
                step,
                "Built neighborhoods"
            );
        }
        pool.shuffle(rng);
        pool.sort_by_key(|neighborhood| neighborhood.group.priority);
        pool
    }
}

/// Free the neighborhood's variables to their original bounds and fix every
/// other assigned variable at its incumbent value.
fn fix_outside<E: SolverEngine>(
    session: &mut Session<E>,
    neighborhood: &Neighborhood,
    solution: &PartialSolution,
    snapshot: &[(VariableId, Bounds)],
) -> Result<(), DecompError> {
    for (var, original) in snapshot {
        let target = if neighborhood.free[var.index()] {
            *original
        } else {
            match solution.value(*var) {
                Some(value) => Bounds::fixed(value),
                None => *original,
            }
        };
        if session.model().get_variable(*var)?.bounds != target {
            session.model_mut().set_variable_bounds(*var, target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use partita_core::{Expr, Model, Variable};
    use partita_solver::testing::DenseEngine;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    /// Two blocks of `max x + 2y` with `x + y <= 1` each, linked by
    /// `shared: y0 + y1 <= 1`.
    fn linked() -> (Model, Decomposition) {
        let mut model = Model::new("linked");
        let mut dec_vars = Vec::new();
        for block in 0..2 {
            let x = model.add_variable(format!("x{block}"), Variable::binary()).unwrap();
            let y = model.add_variable(format!("y{block}"), Variable::binary()).unwrap();
            model
                .add_constraint(
                    format!("pick{block}"),
                    Expr::new(vec![(x, 1.0), (y, 1.0)], 0.0).le_scalar(1.0),
                )
                .unwrap();
            dec_vars.push((x, y));
        }
        let (y0, y1) = (dec_vars[0].1, dec_vars[1].1);
        model
            .add_constraint("shared", Expr::new(vec![(y0, 1.0), (y1, 1.0)], 0.0).le_scalar(1.0))
            .unwrap();
        let objective = dec_vars
            .iter()
            .flat_map(|(x, y)| [(*x, 1.0), (*y, 2.0)])
            .collect();
        model.maximize(Expr::new(objective, 0.0)).unwrap();

        let mut dec = Decomposition::new("halves", &model);
        for (block, (x, y)) in dec_vars.iter().enumerate() {
            let id = dec.add_block(&format!("half{block}"), 0).unwrap();
            dec.assign_variable(&model, id, *x).unwrap();
            dec.assign_variable(&model, id, *y).unwrap();
        }
        dec.connect("half0", "half1", 0).unwrap();
        dec.connect("half1", "half0", 0).unwrap();
        (model, dec)
    }

    fn zero_solution(model: &Model) -> PartialSolution {
        let mut solution = PartialSolution::for_model(model);
        solution.assign_all(model, &vec![0.0; model.num_variables()]);
        solution
    }

    #[test]
    fn improves_to_the_optimum_and_restores_bounds() {
        let (model, dec) = linked();
        let start = zero_solution(&model);
        let mut decompositions = vec![dec];
        let mut session = Session::new(model, DenseEngine::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let mut search = LocalSearch::new(LocalSearchConfig::new().with_eta(1).with_step(1)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(60);

        let outcome = search
            .run(&mut session, &mut decompositions, start, deadline, &mut rng)
            .unwrap();
        assert_eq!(outcome.stats.initial_objective, 0.0);
        assert_eq!(outcome.stats.objective, 3.0);
        assert_eq!(outcome.solution.objective(session.model()), 3.0);
        assert!(outcome.stats.improvements >= 1);
        assert!(!outcome.stats.timed_out);
        assert!(session.model().max_violation(outcome.solution.values()) <= 1e-9);
        for (_, variable) in session.model().variables() {
            assert_eq!(variable.bounds, Bounds::new(0.0, 1.0));
        }
        // Group size grew to both blocks after the first round.
        assert_eq!(search.eta(0), Some(2));
    }

    #[test]
    fn never_worsens_an_optimal_start() {
        let (model, dec) = linked();
        let mut start = PartialSolution::for_model(&model);
        let values: Vec<f64> = ["x0", "y0", "x1", "y1"]
            .iter()
            .map(|name| if *name == "y0" || *name == "x1" { 1.0 } else { 0.0 })
            .collect();
        start.assign_all(&model, &values);
        let mut decompositions = vec![dec];
        let mut session = Session::new(model, DenseEngine::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut search = LocalSearch::new(LocalSearchConfig::new()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(60);

        let outcome = search
            .run(&mut session, &mut decompositions, start, deadline, &mut rng)
            .unwrap();
        assert_eq!(outcome.stats.objective, 3.0);
        assert_eq!(outcome.stats.improvements, 0);
    }

    #[test]
    fn expired_deadline_stops_after_one_neighborhood() {
        let (model, dec) = linked();
        let start = zero_solution(&model);
        let mut decompositions = vec![dec];
        let mut session = Session::new(model, DenseEngine::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let mut search = LocalSearch::new(LocalSearchConfig::new().with_eta(1).with_step(1)).unwrap();

        let outcome = search
            .run(&mut session, &mut decompositions, start, Instant::now(), &mut rng)
            .unwrap();
        assert!(outcome.stats.timed_out);
        assert_eq!(outcome.stats.subproblems_solved, 1);
    }

    #[test]
    fn step_follows_half_of_eta() {
        let (_, dec) = linked();
        let mut search = LocalSearch::new(LocalSearchConfig::new().with_eta(1).with_step(1)).unwrap();
        let decompositions = vec![dec];
        search.init_parameters(&decompositions);
        assert_eq!((search.eta(0), search.step(0)), (Some(1), Some(1)));
        assert!(search.update_parameters(&decompositions));
        assert_eq!((search.eta(0), search.step(0)), (Some(2), Some(1)));
        assert!(!search.update_parameters(&decompositions));
    }

    #[test]
    fn step_is_kept_when_eta_cannot_grow() {
        let (_, mut dec) = linked();
        dec.eta = 2;
        dec.step = 5;
        dec.max_step = 2;
        let decompositions = vec![dec];
        let mut search = LocalSearch::new(LocalSearchConfig::new()).unwrap();
        search.init_parameters(&decompositions);
        assert_eq!((search.eta(0), search.step(0)), (Some(2), Some(5)));
        assert!(!search.update_parameters(&decompositions));
        assert_eq!((search.eta(0), search.step(0)), (Some(2), Some(5)));
    }
}
