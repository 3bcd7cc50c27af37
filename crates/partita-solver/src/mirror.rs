//! Backend-neutral copy of a model, rebuilt only from [`ModelAction`]s.

use std::collections::BTreeMap;

use partita_core::{Bounds, ComparisonSense, ModelAction, Sense};
use partita_expr::ids::{ConstraintId, VariableId};

use crate::SolverError;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineColumn {
    pub bounds: Bounds,
    pub is_integer: bool,
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineRow {
    pub sense: ComparisonSense,
    pub rhs: f64,
    /// Column index to coefficient.
    pub terms: BTreeMap<usize, f64>,
}

impl EngineRow {
    pub fn bounds(&self) -> Bounds {
        match self.sense {
            ComparisonSense::LessEqual => Bounds::new(f64::NEG_INFINITY, self.rhs),
            ComparisonSense::GreaterEqual => Bounds::new(self.rhs, f64::INFINITY),
            ComparisonSense::Equal => Bounds::fixed(self.rhs),
        }
    }

    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(col, coeff)| coeff * values.get(*col).copied().unwrap_or(0.0))
            .sum()
    }
}

/// Dense column/row arrays indexed by id position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineModel {
    pub columns: Vec<EngineColumn>,
    pub rows: Vec<EngineRow>,
    pub sense: Option<Sense>,
    pub objective_constant: f64,
}

impl EngineModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Whether any column is integer.
    pub fn is_mip(&self) -> bool {
        self.columns.iter().any(|col| col.is_integer)
    }

    pub fn integer_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, col)| col.is_integer.then_some(idx))
            .collect()
    }

    /// Objective value including the constant.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .fold(self.objective_constant, |acc, (col, value)| {
                acc + col.objective * value
            })
    }

    pub fn apply_all(&mut self, actions: &[ModelAction]) -> Result<(), SolverError> {
        actions.iter().try_for_each(|action| self.apply(action))
    }

    pub fn apply(&mut self, action: &ModelAction) -> Result<(), SolverError> {
        match action {
            ModelAction::AddVariable { id, variable } => {
                if id.index() != self.columns.len() {
                    return Err(SolverError::InternalError(format!(
                        "variable {id} added out of order (expected {})",
                        self.columns.len()
                    )));
                }
                self.columns.push(EngineColumn {
                    bounds: variable.bounds,
                    is_integer: variable.is_integer,
                    objective: 0.0,
                });
            }
            ModelAction::AddConstraint {
                id,
                constraint,
                terms,
            } => {
                if id.index() != self.rows.len() {
                    return Err(SolverError::InternalError(format!(
                        "constraint {id} added out of order (expected {})",
                        self.rows.len()
                    )));
                }
                for (var, _) in terms {
                    self.ensure_column(*var)?;
                }
                self.rows.push(EngineRow {
                    sense: constraint.sense,
                    rhs: constraint.rhs,
                    terms: terms.iter().map(|(var, coeff)| (var.index(), *coeff)).collect(),
                });
            }
            ModelAction::SetCoefficient {
                constraint,
                variable,
                coefficient,
            } => {
                self.ensure_column(*variable)?;
                let row = self.row_mut(*constraint)?;
                if *coefficient == 0.0 {
                    row.terms.remove(&variable.index());
                } else {
                    row.terms.insert(variable.index(), *coefficient);
                }
            }
            ModelAction::SetVariableBounds { id, bounds } => {
                self.column_mut(*id)?.bounds = *bounds;
            }
            ModelAction::SetVariableInteger { id, is_integer } => {
                self.column_mut(*id)?.is_integer = *is_integer;
            }
            ModelAction::SetObjective {
                sense,
                coefficients,
                constant,
            } => {
                for (var, _) in coefficients {
                    self.ensure_column(*var)?;
                }
                for col in &mut self.columns {
                    col.objective = 0.0;
                }
                for (var, coeff) in coefficients {
                    self.columns[var.index()].objective = *coeff;
                }
                self.sense = Some(*sense);
                self.objective_constant = *constant;
            }
            ModelAction::SetObjectiveCoefficient {
                variable,
                coefficient,
            } => {
                self.column_mut(*variable)?.objective = *coefficient;
            }
            ModelAction::SetObjectiveSense(sense) => {
                self.sense = Some(*sense);
            }
        }
        Ok(())
    }

    fn ensure_column(&self, id: VariableId) -> Result<(), SolverError> {
        if id.index() < self.columns.len() {
            Ok(())
        } else {
            Err(SolverError::InvalidVariableId(id))
        }
    }

    fn column_mut(&mut self, id: VariableId) -> Result<&mut EngineColumn, SolverError> {
        self.columns
            .get_mut(id.index())
            .ok_or(SolverError::InvalidVariableId(id))
    }

    fn row_mut(&mut self, id: ConstraintId) -> Result<&mut EngineRow, SolverError> {
        self.rows
            .get_mut(id.index())
            .ok_or(SolverError::InvalidConstraintId(id))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use partita_core::{Expr, Model, Variable};

    fn toy() -> Model {
        let mut model = Model::new("toy");
        let x = model
            .add_variable("x", Variable::continuous(Bounds::new(0.0, 4.0)))
            .unwrap();
        let y = model.add_variable("y", Variable::binary()).unwrap();
        model
            .add_constraint("c", Expr::new(vec![(x, 1.0), (y, 2.0)], 0.0).le_scalar(5.0))
            .unwrap();
        model
            .minimize(Expr::new(vec![(x, -1.0), (y, -3.0)], 2.0))
            .unwrap();
        model
    }

    #[test]
    fn mirror_replays_full_model() {
        let mut model = toy();
        let mut mirror = EngineModel::new();
        mirror.apply_all(&model.take_actions()).unwrap();

        assert_eq!(mirror.num_columns(), 2);
        assert_eq!(mirror.num_rows(), 1);
        assert_eq!(mirror.rows[0].terms.get(&1), Some(&2.0));
        assert_eq!(mirror.sense, Some(Sense::Minimize));
        assert_eq!(mirror.integer_columns(), vec![1]);
        assert_eq!(mirror.objective_value(&[1.0, 1.0]), -2.0);
    }

    #[test]
    fn mirror_tracks_incremental_edits() {
        let mut model = toy();
        let mut mirror = EngineModel::new();
        mirror.apply_all(&model.take_actions()).unwrap();

        let x = model.variable_by_name("x").unwrap();
        let c = model.constraint_by_name("c").unwrap();
        model.set_coefficient(x, c, 0.0).unwrap();
        model.set_variable_bounds(x, Bounds::fixed(3.0)).unwrap();
        model.set_objective_coefficient(x, 5.0).unwrap();
        mirror.apply_all(&model.take_actions()).unwrap();

        assert!(!mirror.rows[0].terms.contains_key(&0));
        assert_eq!(mirror.columns[0].bounds, Bounds::fixed(3.0));
        assert_eq!(mirror.columns[0].objective, 5.0);
        assert_eq!(mirror.rows[0].activity(&[3.0, 1.0]), 2.0);
    }

    #[test]
    fn mirror_rejects_unknown_ids() {
        let mut mirror = EngineModel::new();
        let err = mirror
            .apply(&ModelAction::SetVariableInteger {
                id: VariableId::new(4),
                is_integer: true,
            })
            .unwrap_err();
        assert_eq!(err, SolverError::InvalidVariableId(VariableId::new(4)));
    }
}
