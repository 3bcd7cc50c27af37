//! CPLEX-LP text output, used for diagnostics dumps.

use std::fmt::Write as _;
use std::path::Path;

use partita_expr::ComparisonSense;

use crate::model::Model;
use crate::model::error::ModelError;
use crate::types::Sense;

fn push_term(line: &mut String, first: bool, coeff: f64, name: &str) {
    let magnitude = coeff.abs();
    match (first, coeff < 0.0) {
        (true, false) => {}
        (true, true) => line.push_str("- "),
        (false, false) => line.push_str(" + "),
        (false, true) => line.push_str(" - "),
    }
    let _ = write!(line, "{magnitude} {name}");
}

impl Model {
    /// Render the model in CPLEX-LP format.
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\\ Problem: {}", self.name);
        let heading = match self.objective.sense.unwrap_or(Sense::Minimize) {
            Sense::Minimize => "Minimize",
            Sense::Maximize => "Maximize",
        };
        let _ = writeln!(out, "{heading}");

        let mut line = String::from(" obj: ");
        let mut first = true;
        for (var, coeff) in &self.objective.coefficients {
            push_term(&mut line, first, *coeff, &self.variable_label(*var));
            first = false;
        }
        let constant = self.objective.constant;
        if constant != 0.0 || first {
            match (first, constant < 0.0) {
                (true, _) => {
                    let _ = write!(line, "{constant}");
                }
                (false, false) => {
                    let _ = write!(line, " + {constant}");
                }
                (false, true) => {
                    let _ = write!(line, " - {}", constant.abs());
                }
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());

        let _ = writeln!(out, "Subject To");
        for (id, constraint) in &self.constraints {
            let mut line = format!(" {}: ", self.constraint_label(*id));
            let terms = self.row_terms(*id);
            if terms.is_empty() {
                match self.variables.keys().next() {
                    Some(var) => {
                        let _ = write!(line, "0 {}", self.variable_label(*var));
                    }
                    None => line.push('0'),
                }
            }
            for (pos, (var, coeff)) in terms.iter().enumerate() {
                push_term(&mut line, pos == 0, *coeff, &self.variable_label(*var));
            }
            let symbol = match constraint.sense {
                ComparisonSense::LessEqual => "<=",
                ComparisonSense::GreaterEqual => ">=",
                ComparisonSense::Equal => "=",
            };
            let _ = writeln!(out, "{line} {symbol} {}", constraint.rhs);
        }

        let _ = writeln!(out, "Bounds");
        for (id, variable) in &self.variables {
            let name = self.variable_label(*id);
            let bounds = variable.bounds;
            if bounds.lower == f64::NEG_INFINITY && bounds.upper == f64::INFINITY {
                let _ = writeln!(out, " {name} free");
            } else if bounds.lower == bounds.upper {
                let _ = writeln!(out, " {name} = {}", bounds.lower);
            } else if bounds.upper == f64::INFINITY {
                let _ = writeln!(out, " {name} >= {}", bounds.lower);
            } else if bounds.lower == f64::NEG_INFINITY {
                let _ = writeln!(out, " -inf <= {name} <= {}", bounds.upper);
            } else {
                let _ = writeln!(out, " {} <= {name} <= {}", bounds.lower, bounds.upper);
            }
        }

        let integers: Vec<String> = self
            .variables
            .iter()
            .filter(|(_, var)| var.is_integer)
            .map(|(id, _)| self.variable_label(*id))
            .collect();
        if !integers.is_empty() {
            let _ = writeln!(out, "General");
            for name in integers {
                let _ = writeln!(out, " {name}");
            }
        }
        let _ = writeln!(out, "End");
        out
    }

    /// Write the model in CPLEX-LP format to `path`.
    pub fn write_lp(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_lp_string()).map_err(|err| ModelError::Io {
            reason: format!("failed to write {}: {err}", path.display()),
        })?;
        tracing::debug!(
            component = "model",
            operation = "write_lp",
            status = "success",
            model = %self.name,
            path = %path.display(),
            "Wrote LP file"
        );
        Ok(())
    }
}
