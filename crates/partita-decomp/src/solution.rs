//! Partial solutions built up by the heuristics.

use std::fmt::Write as _;
use std::path::Path;

use partita_core::Model;
use partita_expr::ids::VariableId;

use crate::error::DecompError;

/// One value per model variable plus an "assigned" flag.
///
/// Values of integer variables are rounded when set through the model-aware
/// setters.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSolution {
    values: Vec<f64>,
    assigned: Vec<bool>,
}

impl PartialSolution {
    /// Nothing assigned, every value zero.
    pub fn new(num_variables: usize) -> Self {
        Self {
            values: vec![0.0; num_variables],
            assigned: vec![false; num_variables],
        }
    }

    pub fn for_model(model: &Model) -> Self {
        Self::new(model.num_variables())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Objective over every variable; unassigned entries count as zero.
    pub fn objective(&self, model: &Model) -> f64 {
        model.objective_value(&self.values)
    }

    /// Dense values, including unassigned zeros.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, var: VariableId) -> Option<f64> {
        let index = var.index();
        match self.assigned.get(index) {
            Some(true) => self.values.get(index).copied(),
            _ => None,
        }
    }

    pub fn value_by_name(&self, model: &Model, name: &str) -> Option<f64> {
        model.variable_by_name(name).and_then(|var| self.value(var))
    }

    pub fn is_assigned(&self, var: VariableId) -> bool {
        self.assigned.get(var.index()).copied().unwrap_or(false)
    }

    pub fn num_assigned(&self) -> usize {
        self.assigned.iter().filter(|flag| **flag).count()
    }

    pub fn is_complete(&self) -> bool {
        self.assigned.iter().all(|flag| *flag)
    }

    /// Assigned variables and their values, for warm starts.
    pub fn hints(&self) -> Vec<(VariableId, f64)> {
        self.assigned
            .iter()
            .zip(&self.values)
            .enumerate()
            .filter(|(_, (flag, _))| **flag)
            .map(|(index, (_, value))| (VariableId::from_index(index), *value))
            .collect()
    }

    /// Assign one variable, rounding integers.
    pub fn set_value(&mut self, model: &Model, var: VariableId, value: f64) -> Result<(), DecompError> {
        let variable = model.get_variable(var)?;
        let index = var.index();
        if index >= self.values.len() {
            return Err(DecompError::UnknownVariable(var.to_string()));
        }
        self.values[index] = variable.round(value);
        self.assigned[index] = true;
        Ok(())
    }

    /// Assign `values[i]` to `vars[i]`, rounding integers.
    pub fn update(
        &mut self,
        model: &Model,
        vars: &[VariableId],
        values: &[f64],
    ) -> Result<(), DecompError> {
        for (var, value) in vars.iter().zip(values) {
            self.set_value(model, *var, *value)?;
        }
        Ok(())
    }

    /// Take a full solution vector, rounding integers.
    pub fn assign_all(&mut self, model: &Model, values: &[f64]) {
        for (var, variable) in model.variables() {
            let index = var.index();
            if let (Some(value), Some(slot)) = (values.get(index), self.values.get_mut(index)) {
                *slot = variable.round(*value);
                self.assigned[index] = true;
            }
        }
    }

    /// Parse `<name> <value>` lines; `#` starts a comment line.
    ///
    /// Unknown names are skipped with a warning.
    pub fn parse(model: &Model, text: &str, source: &str) -> Result<Self, DecompError> {
        let mut solution = Self::for_model(model);
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let (Some(name), Some(raw)) = (tokens.next(), tokens.next()) else {
                return Err(DecompError::Parse {
                    path: source.to_string(),
                    line: number + 1,
                    reason: format!("expected '<name> <value>', found '{line}'"),
                });
            };
            let value = raw.parse::<f64>().map_err(|_| DecompError::Parse {
                path: source.to_string(),
                line: number + 1,
                reason: format!("invalid value '{raw}'"),
            })?;
            match model.variable_by_name(name) {
                Some(var) => solution.set_value(model, var, value)?,
                None => tracing::warn!(
                    component = "solution",
                    operation = "parse",
                    status = "warn",
                    path = source,
                    variable = name,
                    "Variable not found, skipping"
                ),
            }
        }
        Ok(solution)
    }

    pub fn read(model: &Model, path: &Path) -> Result<Self, DecompError> {
        let text = std::fs::read_to_string(path).map_err(|err| DecompError::io(path, err))?;
        let solution = Self::parse(model, &text, &path.display().to_string())?;
        tracing::info!(
            component = "solution",
            operation = "read",
            status = "success",
            path = %path.display(),
            assigned = solution.num_assigned(),
            "Loaded initial solution"
        );
        Ok(solution)
    }

    /// `<name> <value>` for every assigned variable, objective as a comment.
    pub fn to_text(&self, model: &Model) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# objective {}", self.objective(model));
        for (var, _) in model.variables() {
            if let (Some(value), Some(name)) = (self.value(var), model.variable_name(var)) {
                let _ = writeln!(out, "{name} {value}");
            }
        }
        out
    }

    pub fn write(&self, model: &Model, path: &Path) -> Result<(), DecompError> {
        std::fs::write(path, self.to_text(model)).map_err(|err| DecompError::io(path, err))
    }
}
