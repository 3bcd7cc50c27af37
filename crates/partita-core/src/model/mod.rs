//! Model module for building optimization models.
//!
//! This module provides the core [`Model`] type: named variables and
//! constraints, an objective with direction and constant, and the
//! [`ModelAction`] log that solver engines replay.
//!
//! # Module Organization
//!
//! - [`error`]: Model error types
//! - [`actions`]: The diff list drained by solver engines
//! - [`builder`]: Methods for adding variables, constraints, and objectives
//! - [`storage`]: Sparse column and row access
//! - [`metadata`]: Name lookups
//! - [`lp_format`]: CPLEX-LP text writer
//! - [`document`]: JSON model documents

mod actions;
mod builder;
mod document;
mod error;
mod lp_format;
mod metadata;
mod storage;

use crate::types::{Constraint, Objective, Variable};
use partita_expr::ids::{ConstraintId, VariableId};
use std::collections::{BTreeMap, HashMap};

pub use actions::ModelAction;
pub use document::{
    ConstraintDocument, DocumentSense, ModelDocument, RowSense, VariableDocument,
};
pub use error::ModelError;

/// A named linear or mixed-integer program.
///
/// Storage is sparse in both directions so block construction can walk
/// columns (variable to constraints) and rows (constraint to variables).
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) name: String,
    pub(crate) variables: BTreeMap<VariableId, Variable>,
    pub(crate) constraints: BTreeMap<ConstraintId, Constraint>,
    pub(crate) objective: Objective,
    pub(crate) columns: BTreeMap<VariableId, Vec<(ConstraintId, f64)>>,
    pub(crate) rows: BTreeMap<ConstraintId, Vec<(VariableId, f64)>>,
    pub(crate) next_variable_id: u32,
    pub(crate) next_constraint_id: u32,
    pub(crate) variable_names: BTreeMap<VariableId, String>,
    pub(crate) constraint_names: BTreeMap<ConstraintId, String>,
    pub(crate) variable_index: HashMap<String, VariableId>,
    pub(crate) constraint_index: HashMap<String, ConstraintId>,
    pub(crate) pending: Vec<ModelAction>,
}

impl Model {
    /// Create a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
            constraints: BTreeMap::new(),
            objective: Objective::new(),
            columns: BTreeMap::new(),
            rows: BTreeMap::new(),
            next_variable_id: 0,
            next_constraint_id: 0,
            variable_names: BTreeMap::new(),
            constraint_names: BTreeMap::new(),
            variable_index: HashMap::new(),
            constraint_index: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the objective
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Drain the pending action list.
    ///
    /// The list starts at model creation, so the first drain replays the
    /// whole model.
    pub fn take_actions(&mut self) -> Vec<ModelAction> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending_actions(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Full action list describing this model, independent of what has
    /// already been drained.
    pub fn snapshot_actions(&self) -> Vec<ModelAction> {
        let mut actions = Vec::with_capacity(self.variables.len() + self.constraints.len() + 1);
        for (id, variable) in &self.variables {
            actions.push(ModelAction::AddVariable {
                id: *id,
                variable: *variable,
            });
        }
        for (id, constraint) in &self.constraints {
            actions.push(ModelAction::AddConstraint {
                id: *id,
                constraint: *constraint,
                terms: self.rows.get(id).cloned().unwrap_or_default(),
            });
        }
        if let Some(sense) = self.objective.sense {
            actions.push(ModelAction::SetObjective {
                sense,
                coefficients: self
                    .objective
                    .coefficients
                    .iter()
                    .map(|(var, coeff)| (*var, *coeff))
                    .collect(),
                constant: self.objective.constant,
            });
        }
        actions
    }

    pub(crate) fn record(&mut self, action: ModelAction) {
        tracing::trace!(
            component = "model",
            operation = action.as_str(),
            status = "recorded",
            model = %self.name,
            "Recorded model action"
        );
        self.pending.push(action);
    }

    pub(crate) fn ensure_variable_exists(&self, id: VariableId) -> Result<(), ModelError> {
        if self.variables.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidVariableId(id))
        }
    }

    pub(crate) fn ensure_constraint_exists(&self, id: ConstraintId) -> Result<(), ModelError> {
        if self.constraints.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::InvalidConstraintId(id))
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("model")
    }
}

/// Insert, update, or (for a zero value) remove a sparse entry.
pub(crate) fn upsert<K: PartialEq + Copy>(entries: &mut Vec<(K, f64)>, key: K, value: f64) {
    match entries.iter().position(|(k, _)| *k == key) {
        Some(pos) if value == 0.0 => {
            entries.remove(pos);
        }
        Some(pos) => entries[pos].1 = value,
        None if value != 0.0 => entries.push((key, value)),
        None => {}
    }
}
