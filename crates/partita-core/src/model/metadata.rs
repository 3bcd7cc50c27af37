//! Name lookups for variables and constraints.

use partita_expr::ids::{ConstraintId, VariableId};

use crate::model::Model;
use crate::model::error::ModelError;

impl Model {
    /// Get name for a variable.
    pub fn variable_name(&self, id: VariableId) -> Option<&str> {
        self.variable_names.get(&id).map(|s| s.as_str())
    }

    /// Get name for a constraint.
    pub fn constraint_name(&self, id: ConstraintId) -> Option<&str> {
        self.constraint_names.get(&id).map(|s| s.as_str())
    }

    /// Lookup a variable by name.
    pub fn variable_by_name(&self, name: &str) -> Option<VariableId> {
        self.variable_index.get(name).copied()
    }

    /// Lookup a constraint by name.
    pub fn constraint_by_name(&self, name: &str) -> Option<ConstraintId> {
        self.constraint_index.get(name).copied()
    }

    /// Lookup a variable by name, failing on unknown names.
    pub fn require_variable(&self, name: &str) -> Result<VariableId, ModelError> {
        self.variable_by_name(name)
            .ok_or_else(|| ModelError::UnknownName(name.to_string()))
    }

    /// Variable name, falling back to a positional label.
    pub(crate) fn variable_label(&self, id: VariableId) -> String {
        self.variable_name(id)
            .map_or_else(|| format!("x{}", id.inner()), str::to_string)
    }

    /// Constraint name, falling back to a positional label.
    pub(crate) fn constraint_label(&self, id: ConstraintId) -> String {
        self.constraint_name(id)
            .map_or_else(|| format!("c{}", id.inner()), str::to_string)
    }
}
