//! JSON model documents.
//!
//! ```json
//! {
//!   "name": "toy",
//!   "sense": "minimize",
//!   "variables": [{ "name": "x", "upper": 4, "integer": true, "objective": 1.0 }],
//!   "constraints": [{ "name": "c", "sense": "<=", "rhs": 3, "terms": { "x": 1 } }]
//! }
//! ```
//!
//! A missing `lower` means 0 and `null` means unbounded below; a missing or
//! `null` `upper` means unbounded above.

use std::collections::BTreeMap;
use std::path::Path;

use partita_expr::ComparisonSense;
use partita_expr::expr::{ConstraintExpr, Expr};
use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::model::error::ModelError;
use crate::types::{Bounds, Sense, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSense {
    #[default]
    #[serde(alias = "min")]
    Minimize,
    #[serde(alias = "max")]
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSense {
    #[serde(rename = "le", alias = "<=")]
    Le,
    #[serde(rename = "ge", alias = ">=")]
    Ge,
    #[serde(rename = "eq", alias = "=", alias = "==")]
    Eq,
}

fn default_lower() -> Option<f64> {
    Some(0.0)
}

fn default_name() -> String {
    "model".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDocument {
    pub name: String,
    #[serde(default = "default_lower")]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
    #[serde(default)]
    pub integer: bool,
    #[serde(default)]
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDocument {
    pub name: String,
    pub sense: RowSense,
    pub rhs: f64,
    #[serde(default)]
    pub terms: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub sense: DocumentSense,
    #[serde(default)]
    pub objective_constant: f64,
    #[serde(default)]
    pub variables: Vec<VariableDocument>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDocument>,
}

impl From<DocumentSense> for Sense {
    fn from(value: DocumentSense) -> Self {
        match value {
            DocumentSense::Minimize => Sense::Minimize,
            DocumentSense::Maximize => Sense::Maximize,
        }
    }
}

impl From<Sense> for DocumentSense {
    fn from(value: Sense) -> Self {
        match value {
            Sense::Minimize => DocumentSense::Minimize,
            Sense::Maximize => DocumentSense::Maximize,
        }
    }
}

impl From<RowSense> for ComparisonSense {
    fn from(value: RowSense) -> Self {
        match value {
            RowSense::Le => ComparisonSense::LessEqual,
            RowSense::Ge => ComparisonSense::GreaterEqual,
            RowSense::Eq => ComparisonSense::Equal,
        }
    }
}

impl From<ComparisonSense> for RowSense {
    fn from(value: ComparisonSense) -> Self {
        match value {
            ComparisonSense::LessEqual => RowSense::Le,
            ComparisonSense::GreaterEqual => RowSense::Ge,
            ComparisonSense::Equal => RowSense::Eq,
        }
    }
}

impl ModelDocument {
    /// Build a [`Model`] from this document.
    pub fn into_model(self) -> Result<Model, ModelError> {
        let mut model = Model::new(self.name);
        let mut objective = Expr::from_constant(self.objective_constant);
        for var in self.variables {
            let bounds = Bounds::new(
                var.lower.unwrap_or(f64::NEG_INFINITY),
                var.upper.unwrap_or(f64::INFINITY),
            );
            let id = model.add_variable(
                var.name,
                Variable {
                    bounds,
                    is_integer: var.integer,
                },
            )?;
            objective.push_term(id, var.objective);
        }
        for con in self.constraints {
            let mut expr = Expr::new_empty();
            for (name, coeff) in &con.terms {
                let id = model.variable_by_name(name).ok_or_else(|| {
                    ModelError::InvalidDocument {
                        reason: format!(
                            "constraint '{}' references unknown variable '{}'",
                            con.name, name
                        ),
                    }
                })?;
                expr.push_term(id, *coeff);
            }
            model.add_constraint(con.name, ConstraintExpr::new(expr, con.sense.into(), con.rhs))?;
        }
        model.set_objective(self.sense.into(), objective)?;
        Ok(model)
    }

    /// Describe an existing model.
    pub fn from_model(model: &Model) -> Self {
        let variables = model
            .variables()
            .map(|(id, var)| VariableDocument {
                name: model.variable_label(id),
                lower: var.bounds.lower.is_finite().then_some(var.bounds.lower),
                upper: var.bounds.upper.is_finite().then_some(var.bounds.upper),
                integer: var.is_integer,
                objective: model.objective().coefficient(id),
            })
            .collect();
        let constraints = model
            .constraints()
            .map(|(id, con)| ConstraintDocument {
                name: model.constraint_label(id),
                sense: con.sense.into(),
                rhs: con.rhs,
                terms: model
                    .row_terms(id)
                    .iter()
                    .map(|(var, coeff)| (model.variable_label(*var), *coeff))
                    .collect(),
            })
            .collect();
        Self {
            name: model.name().to_string(),
            sense: model.objective().sense.unwrap_or(Sense::Minimize).into(),
            objective_constant: model.objective().constant,
            variables,
            constraints,
        }
    }
}

impl Model {
    /// Parse a model from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let document: ModelDocument =
            serde_json::from_str(text).map_err(|err| ModelError::InvalidDocument {
                reason: err.to_string(),
            })?;
        document.into_model()
    }

    /// Read a JSON model file.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ModelError::Io {
            reason: format!("failed to read {}: {err}", path.display()),
        })?;
        let model = Self::from_json_str(&text)?;
        tracing::debug!(
            component = "model",
            operation = "read_json",
            status = "success",
            path = %path.display(),
            variables = model.num_variables(),
            constraints = model.num_constraints(),
            "Loaded model document"
        );
        Ok(model)
    }

    /// Write this model as a JSON document.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&ModelDocument::from_model(self)).map_err(
            |err| ModelError::InvalidDocument {
                reason: err.to_string(),
            },
        )?;
        std::fs::write(path, text).map_err(|err| ModelError::Io {
            reason: format!("failed to write {}: {err}", path.display()),
        })
    }
}
