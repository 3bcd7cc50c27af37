//! Constructive decomposition heuristic.
//!
//! Blocks are fixed group by group in decomposition order. Each group is the
//! first unsolved block plus up to `eta - 1` neighbors; the group's
//! formulation sees every earlier decision as a constant. When no candidate
//! of a group leads to a full assignment the search backtracks.

use std::collections::HashMap;
use std::path::Path;

use partita_core::{Bounds, Expr, Model, Sense};
use partita_expr::ids::{ConstraintId, VariableId};
use partita_solver::{Session, SolverEngine, SolverError};

use crate::config::ConstructiveConfig;
use crate::decomposition::Decomposition;
use crate::error::DecompError;
use crate::solution::PartialSolution;
use crate::subproblem::BlockGroup;

/// The formulation of one block group.
#[derive(Debug)]
struct GroupModel {
    model: Model,
    /// Original ids of the group's block variables; they are the first
    /// variables of `model`, in this order.
    originals: Vec<VariableId>,
}

/// Recursive block-group construction over one decomposition.
#[derive(Debug)]
pub struct Constructive<'d> {
    dec: &'d Decomposition,
    config: ConstructiveConfig,
    /// Times each scheduling position is covered on the current path.
    solved: Vec<u32>,
}

impl<'d> Constructive<'d> {
    pub fn new(dec: &'d Decomposition, config: ConstructiveConfig) -> Result<Self, DecompError> {
        config.validate()?;
        Ok(Self {
            dec,
            config,
            solved: vec![0; dec.num_blocks()],
        })
    }

    /// Construct from scratch on `session`'s model, then complete the
    /// result against the full model.
    pub fn solve<E: SolverEngine + Default>(
        &mut self,
        session: &mut Session<E>,
        diagnostics: Option<&Path>,
    ) -> Result<Option<PartialSolution>, DecompError> {
        let start = PartialSolution::for_model(session.model());
        let Some(partial) = self.construct::<E>(session.model(), start)? else {
            tracing::warn!(
                component = "constructive",
                operation = "solve",
                status = "warn",
                decomposition = %self.dec.name,
                "No block assignment found"
            );
            return Ok(None);
        };
        complete_solution(session, &partial, diagnostics)
    }

    /// Backtracking search starting at scheduling position 0.
    pub fn construct<E: SolverEngine + Default>(
        &mut self,
        original: &Model,
        start: PartialSolution,
    ) -> Result<Option<PartialSolution>, DecompError> {
        self.solved = vec![0; self.dec.num_blocks()];
        self.construct_from::<E>(original, start, 0)
    }

    fn construct_from<E: SolverEngine + Default>(
        &mut self,
        original: &Model,
        solution: PartialSolution,
        position: usize,
    ) -> Result<Option<PartialSolution>, DecompError> {
        let num_blocks = self.dec.num_blocks();
        if position >= num_blocks {
            return Ok(Some(solution));
        }

        let seed = self.dec.order()[position];
        let group = BlockGroup::grow(self.dec, seed, self.config.eta);
        tracing::info!(
            component = "constructive",
            operation = "solve_group",
            status = "start",
            decomposition = %self.dec.name,
            blocks = group.len(),
            reference_block = position,
            "Solving {} blocks (reference block: {})",
            group.len(),
            position
        );

        let group_model = self.build_group_model(original, &solution, &group, position)?;
        let candidates = match self.solve_group::<E>(&group_model, &solution)? {
            Some(candidates) => candidates,
            None => {
                tracing::info!(
                    component = "constructive",
                    operation = "solve_group",
                    status = "infeasible",
                    reference_block = position,
                    "Infeasible group, backtracking"
                );
                return Ok(None);
            }
        };

        for id in &group.blocks {
            self.solved[self.dec.position(*id)] += 1;
        }
        for values in candidates {
            let mut next = solution.clone();
            next.update(original, &group_model.originals, &values)?;

            let mut following = position + 1;
            while following < num_blocks
                && following < position + self.config.step
                && self.solved[following] > 0
            {
                following += 1;
            }
            if let Some(done) = self.construct_from::<E>(original, next, following)? {
                return Ok(Some(done));
            }
        }
        for id in &group.blocks {
            self.solved[self.dec.position(*id)] -= 1;
        }
        Ok(None)
    }

    /// Candidate value vectors for the group's variables, best first.
    fn solve_group<E: SolverEngine + Default>(
        &self,
        group_model: &GroupModel,
        solution: &PartialSolution,
    ) -> Result<Option<Vec<Vec<f64>>>, DecompError> {
        if group_model.model.num_variables() == 0 {
            return Ok(Some(vec![Vec::new()]));
        }
        let hints: Vec<(VariableId, f64)> = group_model
            .originals
            .iter()
            .enumerate()
            .filter_map(|(index, var)| {
                solution
                    .value(*var)
                    .map(|value| (VariableId::from_index(index), value))
            })
            .collect();

        let mut session = Session::new(group_model.model.clone(), E::default())?
            .with_config(self.config.solver.clone());
        session.set_warm_start(&hints)?;
        match session.populate(self.config.solution_limit) {
            Ok(pool) if pool.is_empty() => Ok(None),
            Ok(pool) => Ok(Some(
                pool.into_iter()
                    .map(|candidate| candidate.primal_values)
                    .collect(),
            )),
            Err(err) if err.is_solve_failure() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Formulation over the union of the group's blocks.
    ///
    /// Variables and constraints come from the decomposition's submodel when
    /// it has a same-named one. A term on a variable outside the group
    /// becomes a variable of its own when no block owns it, a constant when
    /// the current solution assigns it, and is dropped otherwise.
    fn build_group_model(
        &self,
        original: &Model,
        solution: &PartialSolution,
        group: &BlockGroup,
        position: usize,
    ) -> Result<GroupModel, DecompError> {
        let submodel = self.dec.submodel.as_ref();
        let mut model = Model::new(format!("subproblem({},{})", position, self.config.eta));
        let mut costs: HashMap<VariableId, f64> = HashMap::new();
        let mut originals = Vec::with_capacity(group.variables.len());

        let mut add = |model: &mut Model,
                       source: &Model,
                       var: VariableId,
                       name: &str|
         -> Result<VariableId, DecompError> {
            let id = model.add_variable(name, *source.get_variable(var)?)?;
            let cost = source.objective().coefficient(var);
            if cost != 0.0 {
                costs.insert(id, cost);
            }
            Ok(id)
        };

        for var in &group.variables {
            let name = label(original.variable_name(*var), *var);
            let (source, source_var) = match submodel.and_then(|sub| sub.variable_by_name(&name).map(|v| (sub, v))) {
                Some(found) => found,
                None => (original, *var),
            };
            add(&mut model, source, source_var, &name)?;
            originals.push(*var);
        }

        for id in &group.blocks {
            for con in self.dec.block(*id).constraints() {
                let name = constraint_label(original, *con);
                if model.constraint_by_name(&name).is_some() {
                    continue;
                }
                let (source, source_con) = match submodel.and_then(|sub| sub.constraint_by_name(&name).map(|c| (sub, c))) {
                    Some(found) => found,
                    None => (original, *con),
                };
                let constraint = *source.get_constraint(source_con)?;
                let mut expr = Expr::new_empty();
                for (var, coeff) in source.row_terms(source_con) {
                    let var_name = label(source.variable_name(*var), *var);
                    if let Some(local) = model.variable_by_name(&var_name) {
                        expr.push_term(local, *coeff);
                        continue;
                    }
                    match original.variable_by_name(&var_name) {
                        Some(outside) if !self.dec.is_owned(outside) => {
                            let local = add(&mut model, original, outside, &var_name)?;
                            expr.push_term(local, *coeff);
                        }
                        Some(outside) => {
                            if let Some(value) = solution.value(outside) {
                                expr.shift_constant(coeff * value);
                            }
                        }
                        None => {
                            let local = add(&mut model, source, *var, &var_name)?;
                            expr.push_term(local, *coeff);
                        }
                    }
                }
                model.add_constraint(name, expr.compare_scalar(constraint.rhs, constraint.sense))?;
            }
        }

        let sense = original.objective().sense.unwrap_or(Sense::Minimize);
        let mut terms: Vec<(VariableId, f64)> = costs.into_iter().collect();
        terms.sort_by_key(|(var, _)| *var);
        model.set_objective(sense, Expr::new(terms, 0.0))?;
        Ok(GroupModel { model, originals })
    }
}

fn label(name: Option<&str>, var: VariableId) -> String {
    name.map_or_else(|| format!("x{}", var.inner()), str::to_string)
}

fn constraint_label(model: &Model, con: ConstraintId) -> String {
    model
        .constraint_name(con)
        .map_or_else(|| format!("c{}", con.inner()), str::to_string)
}

/// Fix every assigned variable, solve the full model once and take the
/// solver's values for the rest.
///
/// Bounds are restored afterwards whatever the outcome. `None` means the
/// fixed assignment has no feasible completion; the model is then written to
/// `infeasible.lp` under `diagnostics` when given.
pub fn complete_solution<E: SolverEngine>(
    session: &mut Session<E>,
    solution: &PartialSolution,
    diagnostics: Option<&Path>,
) -> Result<Option<PartialSolution>, DecompError> {
    let snapshot: Vec<(VariableId, Bounds)> = session
        .model()
        .variables()
        .map(|(var, variable)| (var, variable.bounds))
        .collect();
    for (var, bounds) in &snapshot {
        if let Some(value) = solution.value(*var) {
            let fixed = Bounds::fixed(value);
            if *bounds != fixed {
                session.model_mut().set_variable_bounds(*var, fixed)?;
            }
        }
    }

    let outcome = match session.solve(false) {
        Ok(result) => {
            let mut completed = solution.clone();
            completed.assign_all(session.model(), &result.primal_values);
            tracing::info!(
                component = "constructive",
                operation = "complete_solution",
                status = "success",
                objective = completed.objective(session.model()),
                fixed = solution.num_assigned(),
                "Completed solution"
            );
            Ok(Some(completed))
        }
        Err(SolverError::SolveFailure { status }) => {
            tracing::warn!(
                component = "constructive",
                operation = "complete_solution",
                status = "infeasible",
                solver_status = status.as_str(),
                fixed = solution.num_assigned(),
                "Fixed assignment has no feasible completion"
            );
            if let Some(dir) = diagnostics {
                let path = dir.join("infeasible.lp");
                if let Err(err) = session.write_model(&path) {
                    tracing::warn!(
                        component = "constructive",
                        operation = "complete_solution",
                        status = "warn",
                        path = %path.display(),
                        error = %err,
                        "Could not write infeasible model"
                    );
                }
            }
            Ok(None)
        }
        Err(err) => Err(DecompError::from(err)),
    };

    restore_bounds(session, &snapshot)?;
    outcome
}

/// Put back bounds that differ from `snapshot` and flush them to the engine.
pub(crate) fn restore_bounds<E: SolverEngine>(
    session: &mut Session<E>,
    snapshot: &[(VariableId, Bounds)],
) -> Result<(), DecompError> {
    for (var, bounds) in snapshot {
        let current = session.model().get_variable(*var)?.bounds;
        if current != *bounds {
            session.model_mut().set_variable_bounds(*var, *bounds)?;
        }
    }
    session.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use partita_core::Variable;
    use partita_solver::testing::DenseEngine;

    /// max 2a + b  s.t.  e1: a + b <= 1, e2: b >= 1; blocks {a}, {b}.
    fn backtracking_case() -> (Model, Decomposition) {
        let mut model = Model::new("chain");
        let a = model.add_variable("a", Variable::binary()).unwrap();
        let b = model.add_variable("b", Variable::binary()).unwrap();
        model
            .add_constraint("e1", Expr::new(vec![(a, 1.0), (b, 1.0)], 0.0).le_scalar(1.0))
            .unwrap();
        model
            .add_constraint("e2", Expr::term(b, 1.0).ge_scalar(1.0))
            .unwrap();
        model.maximize(Expr::new(vec![(a, 2.0), (b, 1.0)], 0.0)).unwrap();

        let mut dec = Decomposition::new("singletons", &model);
        let first = dec.add_block("first", 0).unwrap();
        let second = dec.add_block("second", 1).unwrap();
        dec.assign_variable(&model, first, a).unwrap();
        dec.assign_variable(&model, second, b).unwrap();
        (model, dec)
    }

    #[test]
    fn backtracks_to_a_worse_first_candidate() {
        let (model, dec) = backtracking_case();
        let config = ConstructiveConfig::new().with_eta(1).with_step(1).with_solution_limit(2);
        let mut constructive = Constructive::new(&dec, config).unwrap();
        let mut session = Session::new(model, DenseEngine::new()).unwrap();
        let solution = constructive.solve(&mut session, None).unwrap().unwrap();
        assert_eq!(solution.value_by_name(session.model(), "a"), Some(0.0));
        assert_eq!(solution.value_by_name(session.model(), "b"), Some(1.0));
        assert_eq!(solution.objective(session.model()), 1.0);
    }

    #[test]
    fn single_candidate_dead_end_fails() {
        let (model, dec) = backtracking_case();
        let config = ConstructiveConfig::new().with_eta(1).with_step(1).with_solution_limit(1);
        let mut constructive = Constructive::new(&dec, config).unwrap();
        let start = PartialSolution::for_model(&model);
        assert!(constructive.construct::<DenseEngine>(&model, start).unwrap().is_none());
    }

    #[test]
    fn group_model_turns_decided_variables_into_constants() {
        let (model, dec) = backtracking_case();
        let config = ConstructiveConfig::new().with_eta(1).with_step(1);
        let constructive = Constructive::new(&dec, config).unwrap();
        let mut solution = PartialSolution::for_model(&model);
        solution.set_value(&model, model.variable_by_name("a").unwrap(), 1.0).unwrap();

        let seed = dec.block_id("second").unwrap();
        let group = BlockGroup::grow(&dec, seed, 1);
        let group_model = constructive
            .build_group_model(&model, &solution, &group, 1)
            .unwrap();
        assert_eq!(group_model.model.name(), "subproblem(1,1)");
        assert_eq!(group_model.originals, vec![model.variable_by_name("b").unwrap()]);
        let e1 = group_model.model.constraint_by_name("e1").unwrap();
        assert_eq!(group_model.model.get_constraint(e1).unwrap().rhs, 0.0);
        assert_eq!(group_model.model.row_terms(e1).len(), 1);
    }

    #[test]
    fn complete_solution_restores_bounds_and_is_idempotent() {
        let (model, _) = backtracking_case();
        let mut session = Session::new(model, DenseEngine::new()).unwrap();
        let b = session.model().variable_by_name("b").unwrap();
        let mut partial = PartialSolution::for_model(session.model());
        partial.set_value(session.model(), b, 1.0).unwrap();

        let once = complete_solution(&mut session, &partial, None).unwrap().unwrap();
        assert!(once.is_complete());
        assert_eq!(session.model().get_variable(b).unwrap().bounds, Bounds::new(0.0, 1.0));
        let twice = complete_solution(&mut session, &once, None).unwrap().unwrap();
        assert_eq!(once.objective(session.model()), twice.objective(session.model()));
        assert_eq!(twice.objective(session.model()), 1.0);
    }

    #[test]
    fn infeasible_completion_returns_none() {
        let (model, _) = backtracking_case();
        let mut session = Session::new(model, DenseEngine::new()).unwrap();
        let a = session.model().variable_by_name("a").unwrap();
        let mut partial = PartialSolution::for_model(session.model());
        partial.set_value(session.model(), a, 1.0).unwrap();
        assert!(complete_solution(&mut session, &partial, None).unwrap().is_none());
        assert_eq!(session.model().get_variable(a).unwrap().bounds, Bounds::new(0.0, 1.0));
    }
}
