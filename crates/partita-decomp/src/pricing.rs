//! Pricing subproblems for column generation.

use partita_core::{Expr, Model, Sense};
use partita_expr::ids::VariableId;
use partita_solver::{Session, SolverEngine};

use crate::config::PricingConfig;
use crate::error::DecompError;
use crate::partition::BlockPartition;

/// One block's pricing problem, built once and re-priced every iteration.
///
/// Variables keep the block's local order, so solution vectors line up with
/// [`PartitionBlock::variables`](crate::partition::PartitionBlock::variables).
#[derive(Debug)]
pub struct Pricing<E: SolverEngine> {
    block: usize,
    sense: Sense,
    eps: f64,
    populate_limit: Option<usize>,
    session: Session<E>,
    objectives: Vec<f64>,
    solutions: Vec<Vec<f64>>,
    runs: usize,
}

impl<E: SolverEngine> Pricing<E> {
    /// Copy block `block` out of `model`: its variables with their original
    /// bounds, types and costs, and its constraints restricted to them.
    pub fn new(
        model: &Model,
        partition: &BlockPartition,
        block: usize,
        engine: E,
        config: &PricingConfig,
        eps: f64,
    ) -> Result<Self, DecompError> {
        let part = partition.block(block).ok_or_else(|| DecompError::InvalidParameter {
            name: "block",
            reason: format!("{block} is out of range ({} blocks)", partition.num_blocks()),
        })?;
        let sense = model.objective().sense.unwrap_or(Sense::Minimize);
        let mut pricing = Model::new(format!("{}-pricing-{}", model.name(), block));

        let mut local: Vec<VariableId> = Vec::with_capacity(part.variables.len());
        for var in &part.variables {
            let name = model
                .variable_name(*var)
                .map_or_else(|| format!("x{}", var.inner()), str::to_string);
            local.push(pricing.add_variable(name, *model.get_variable(*var)?)?);
        }
        for con in &part.constraints {
            let constraint = model.get_constraint(*con)?;
            let terms: Vec<(VariableId, f64)> = model
                .row_terms(*con)
                .iter()
                .filter_map(|(var, coeff)| part.local_index(*var).map(|index| (local[index], *coeff)))
                .collect();
            let name = model
                .constraint_name(*con)
                .map_or_else(|| format!("c{}", con.inner()), str::to_string);
            pricing.add_constraint(
                name,
                Expr::new(terms, 0.0).compare_scalar(constraint.rhs, constraint.sense),
            )?;
        }
        let costs = part
            .variables
            .iter()
            .zip(&local)
            .map(|(original, copy)| (*copy, model.objective().coefficient(*original)))
            .collect();
        pricing.set_objective(sense, Expr::new(costs, 0.0))?;

        let session = Session::new(pricing, engine)?.with_config(config.solver_config());
        Ok(Self {
            block,
            sense,
            eps,
            populate_limit: config.populate.then_some(config.populate_limit),
            session,
            objectives: Vec::new(),
            solutions: Vec::new(),
            runs: 0,
        })
    }

    /// Price with objective `fixed_cost + sum reduced_costs[i] * x_i`.
    ///
    /// Keeps every solution whose objective improves past `eps` in the
    /// model's direction and returns whether there is at least one. An
    /// infeasible pricing problem is a normal `false`.
    pub fn run(&mut self, reduced_costs: &[f64], fixed_cost: f64) -> Result<bool, DecompError> {
        self.objectives.clear();
        self.solutions.clear();
        self.runs += 1;

        let terms = reduced_costs
            .iter()
            .enumerate()
            .filter(|(_, cost)| **cost != 0.0)
            .map(|(index, cost)| (VariableId::from_index(index), *cost))
            .collect();
        self.session
            .model_mut()
            .set_objective(self.sense, Expr::new(terms, fixed_cost))?;

        if self.session.model().num_variables() == 0 {
            // The only extreme point is the empty one.
            let model = self.session.model();
            if model.max_violation(&[]) <= self.eps {
                let objective = model.objective_value(&[]);
                self.accept(objective, Vec::new());
            }
            return Ok(!self.solutions.is_empty());
        }

        if let Some(limit) = self.populate_limit {
            match self.session.populate(limit) {
                Ok(pool) => {
                    for solution in pool {
                        self.accept(solution.objective_value, solution.primal_values);
                    }
                }
                Err(err) if err.is_solve_failure() => {}
                Err(err) => return Err(err.into()),
            }
            if !self.solutions.is_empty() {
                return Ok(true);
            }
        }

        match self.session.solve(false) {
            Ok(solution) => self.accept(solution.objective_value, solution.primal_values),
            Err(err) if err.is_solve_failure() => {}
            Err(err) => return Err(err.into()),
        }
        tracing::trace!(
            component = "pricing",
            operation = "run",
            status = "success",
            block = self.block,
            columns = self.solutions.len(),
            best = ?self.best_objective(),
            "Priced block"
        );
        Ok(!self.solutions.is_empty())
    }

    fn accept(&mut self, objective: f64, values: Vec<f64>) {
        let improving = match self.sense {
            Sense::Minimize => objective < -self.eps,
            Sense::Maximize => objective > self.eps,
        };
        if improving {
            self.objectives.push(objective);
            self.solutions.push(values);
        }
    }

    pub fn block(&self) -> usize {
        self.block
    }

    /// Objectives of the accepted solutions of the last run.
    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    /// Accepted solutions of the last run, in block-local variable order.
    pub fn solutions(&self) -> &[Vec<f64>] {
        &self.solutions
    }

    /// Most improving accepted objective of the last run.
    pub fn best_objective(&self) -> Option<f64> {
        self.objectives.iter().copied().reduce(|best, value| {
            if self.sense.improves(value, best, 0.0) {
                value
            } else {
                best
            }
        })
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn model(&self) -> &Model {
        self.session.model()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::PartitionConfig;
    use partita_core::Variable;
    use partita_solver::testing::DenseEngine;

    /// min x1 + x2  s.t.  c0: x1 + x2 >= 1, one block owning both.
    fn cover() -> (Model, BlockPartition) {
        let mut model = Model::new("cover");
        let x1 = model.add_variable("x1", Variable::binary()).unwrap();
        let x2 = model.add_variable("x2", Variable::binary()).unwrap();
        let c0 = model
            .add_constraint("c0", Expr::new(vec![(x1, 1.0), (x2, 1.0)], 0.0).ge_scalar(1.0))
            .unwrap();
        model.minimize(Expr::new(vec![(x1, 1.0), (x2, 1.0)], 0.0)).unwrap();
        let partition =
            BlockPartition::from_constraint_lists(&model, &[vec![c0]], PartitionConfig::default())
                .unwrap();
        (model, partition)
    }

    fn pricing(model: &Model, partition: &BlockPartition, config: &PricingConfig) -> Pricing<DenseEngine> {
        Pricing::new(model, partition, 0, DenseEngine::new(), config, 1e-6).unwrap()
    }

    #[test]
    fn nonnegative_reduced_costs_find_nothing() {
        let (model, partition) = cover();
        let mut pricing = pricing(&model, &partition, &PricingConfig::default());
        assert_eq!(pricing.model().name(), "cover-pricing-0");
        assert!(!pricing.run(&[1.0, 1.0], 0.0).unwrap());
        assert!(pricing.solutions().is_empty());
        assert_eq!(pricing.best_objective(), None);
    }

    #[test]
    fn negative_reduced_cost_yields_a_column() {
        let (model, partition) = cover();
        let mut pricing = pricing(&model, &partition, &PricingConfig::default());
        assert!(pricing.run(&[-1.0, 2.0], 0.0).unwrap());
        assert_eq!(pricing.solutions(), &[vec![1.0, 0.0]]);
        assert_eq!(pricing.best_objective(), Some(-1.0));

        // The convexity dual shifts the threshold.
        assert!(!pricing.run(&[-1.0, 2.0], 1.0).unwrap());
        assert_eq!(pricing.runs(), 2);
    }

    #[test]
    fn block_without_variables_prices_its_empty_point() {
        let mut model = Model::new("bare");
        let z = model
            .add_variable("z", Variable::continuous(partita_core::Bounds::new(0.0, 5.0)))
            .unwrap();
        let c0 = model
            .add_constraint("c0", Expr::term(z, 1.0).le_scalar(3.0))
            .unwrap();
        model.minimize(Expr::term(z, 1.0)).unwrap();
        let partition =
            BlockPartition::from_constraint_lists(&model, &[vec![c0]], PartitionConfig::default())
                .unwrap();
        assert!(partition.blocks()[0].variables.is_empty());

        let mut pricing = pricing(&model, &partition, &PricingConfig::default());
        assert!(pricing.run(&[], -1.0).unwrap());
        assert_eq!(pricing.solutions(), &[Vec::<f64>::new()]);
        assert_eq!(pricing.best_objective(), Some(-1.0));
        assert!(!pricing.run(&[], 0.0).unwrap());
    }

    #[test]
    fn populate_keeps_every_improving_solution() {
        let (model, partition) = cover();
        let config = PricingConfig::new().with_populate(5);
        let mut pricing = pricing(&model, &partition, &config);
        assert!(pricing.run(&[-2.0, -1.0], 0.0).unwrap());
        assert_eq!(pricing.objectives(), &[-3.0, -2.0, -1.0]);
        assert_eq!(pricing.best_objective(), Some(-3.0));
    }
}
