//! Constructive search followed by local search.

use std::time::Instant;

use partita_core::Model;
use partita_solver::{Session, SolverEngine};
use rand::Rng;
use serde::Serialize;

use crate::config::HeuristicConfig;
use crate::constructive::{Constructive, complete_solution};
use crate::decomposition::Decomposition;
use crate::error::DecompError;
use crate::local_search::{LocalSearch, LocalSearchStats};
use crate::solution::PartialSolution;

/// Timings and objective of a heuristic run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicReport {
    /// Objective of the final solution; `None` when none was found.
    pub objective: Option<f64>,
    /// Objective right after construction.
    pub constructed_objective: Option<f64>,
    pub constructive_seconds: f64,
    pub local_search: Option<LocalSearchStats>,
    pub total_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct HeuristicOutcome {
    pub solution: Option<PartialSolution>,
    pub report: HeuristicReport,
}

/// Build a start solution and improve it by local search.
///
/// A given `initial` solution is only completed; otherwise the first
/// decomposition drives the constructive search. The local search deadline
/// counts from the start of this call.
pub fn solve_heuristic<E: SolverEngine + Default, R: Rng + ?Sized>(
    model: Model,
    decompositions: &mut [Decomposition],
    initial: Option<PartialSolution>,
    config: &HeuristicConfig,
    rng: &mut R,
) -> Result<HeuristicOutcome, DecompError> {
    let started = Instant::now();
    let deadline = started + config.local_search.time_limit;
    let diagnostics = config.diagnostics.as_deref();
    let mut session =
        Session::new(model, E::default())?.with_config(config.local_search.solver.clone());

    let constructed = match initial {
        Some(start) => {
            tracing::info!(
                component = "heuristic",
                operation = "construct",
                status = "start",
                assigned = start.num_assigned(),
                "Completing initial solution"
            );
            complete_solution(&mut session, &start, diagnostics)?
        }
        None => {
            let dec = decompositions.first().ok_or_else(|| DecompError::InvalidParameter {
                name: "decompositions",
                reason: "at least one decomposition is required without an initial solution"
                    .to_string(),
            })?;
            let mut constructive = Constructive::new(dec, config.constructive.clone())?;
            constructive.solve(&mut session, diagnostics)?
        }
    };
    let constructive_seconds = started.elapsed().as_secs_f64();

    let Some(start) = constructed else {
        tracing::warn!(
            component = "heuristic",
            operation = "construct",
            status = "infeasible",
            elapsed_seconds = constructive_seconds,
            "No feasible start solution"
        );
        return Ok(HeuristicOutcome {
            solution: None,
            report: HeuristicReport {
                objective: None,
                constructed_objective: None,
                constructive_seconds,
                local_search: None,
                total_seconds: started.elapsed().as_secs_f64(),
            },
        });
    };
    let constructed_objective = start.objective(session.model());
    tracing::info!(
        component = "heuristic",
        operation = "construct",
        status = "success",
        objective = constructed_objective,
        elapsed_seconds = constructive_seconds,
        "Start solution with cost {}",
        constructed_objective
    );

    let mut search = LocalSearch::new(config.local_search.clone())?;
    let outcome = search.run(&mut session, decompositions, start, deadline, rng)?;
    let report = HeuristicReport {
        objective: Some(outcome.stats.objective),
        constructed_objective: Some(constructed_objective),
        constructive_seconds,
        local_search: Some(outcome.stats),
        total_seconds: started.elapsed().as_secs_f64(),
    };
    tracing::info!(
        component = "heuristic",
        operation = "solve",
        status = "success",
        objective = ?report.objective,
        total_seconds = report.total_seconds,
        "Heuristic finished"
    );
    Ok(HeuristicOutcome {
        solution: Some(outcome.solution),
        report,
    })
}
