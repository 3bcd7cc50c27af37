//! JSON decomposition descriptors (`.jdec`).
//!
//! ```json
//! {
//!   "problem": "model.json",
//!   "initial_solution": "start.sol",
//!   "decompositions": [{
//!     "name": "by-day", "priority": 0, "eta": 3, "step": 2,
//!     "subproblems": [{"priority": 0, "name": "mon", "variables": ["x1", "x2"]}],
//!     "connections": [{"priority": 1, "src": "mon", "tar": "tue"}]
//!   }]
//! }
//! ```
//!
//! Paths are relative to the descriptor's directory.

use std::path::{Path, PathBuf};

use partita_core::Model;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Decomposition;
use crate::error::DecompError;
use crate::solution::PartialSolution;

/// Top-level descriptor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JdecDocument {
    pub problem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_solution: Option<String>,
    pub decompositions: Vec<DecompositionDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionDescriptor {
    #[serde(default)]
    pub name: String,
    /// Submodel file overriding same-named variables and constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub eta: usize,
    #[serde(default)]
    pub step: usize,
    #[serde(default = "default_eta_skip")]
    pub eta_skip: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_eta: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step: Option<usize>,
    #[serde(default)]
    pub shuffle: bool,
    pub subproblems: Vec<SubproblemDescriptor>,
    #[serde(default)]
    pub connections: Vec<ConnectionDescriptor>,
}

fn default_eta_skip() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubproblemDescriptor {
    #[serde(default)]
    pub priority: i64,
    pub name: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub priority: i64,
    pub src: String,
    pub tar: String,
}

impl JdecDocument {
    pub fn from_json_str(text: &str, source: &str) -> Result<Self, DecompError> {
        serde_json::from_str(text).map_err(|err| DecompError::Json {
            path: source.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn read(path: &Path) -> Result<Self, DecompError> {
        let text = std::fs::read_to_string(path).map_err(|err| DecompError::io(path, err))?;
        Self::from_json_str(&text, &path.display().to_string())
    }
}

impl DecompositionDescriptor {
    /// Build the decomposition over `model`.
    ///
    /// Blocks are shuffled and then stably sorted by priority, so blocks of
    /// equal priority get a seed-dependent order.
    pub fn build<R: Rng + ?Sized>(
        &self,
        model: &Model,
        submodel: Option<Model>,
        rng: &mut R,
    ) -> Result<Decomposition, DecompError> {
        if self.eta_skip == 0 {
            return Err(DecompError::InvalidParameter {
                name: "eta_skip",
                reason: format!("must be at least 1 in decomposition '{}'", self.name),
            });
        }
        let mut dec = Decomposition::new(self.name.clone(), model);
        dec.priority = self.priority;
        dec.eta = self.eta;
        dec.step = self.step;
        dec.eta_skip = self.eta_skip;
        dec.max_eta = self.max_eta.unwrap_or(usize::MAX);
        dec.max_step = self.max_step.unwrap_or(usize::MAX);
        dec.shuffle = self.shuffle;
        dec.submodel = submodel;

        for subproblem in &self.subproblems {
            let id = dec.add_block(&subproblem.name, subproblem.priority)?;
            for name in &subproblem.variables {
                let var = model
                    .variable_by_name(name)
                    .ok_or_else(|| DecompError::UnknownVariable(name.clone()))?;
                dec.assign_variable(model, id, var)?;
            }
        }
        for connection in &self.connections {
            dec.connect(&connection.src, &connection.tar, connection.priority)?;
        }
        dec.order_blocks(rng);

        tracing::info!(
            component = "decomposition",
            operation = "load",
            status = "success",
            decomposition = %dec.name,
            blocks = dec.num_blocks(),
            block_variables = dec.num_owned_variables(),
            unowned = model.num_variables() - dec.num_owned_variables(),
            "Found decomposition '{}' with {} blocks and {} variables in these blocks",
            dec.name,
            dec.num_blocks(),
            dec.num_owned_variables()
        );
        Ok(dec)
    }
}

/// Build every decomposition, then sort them by priority and index them.
///
/// Submodel paths are resolved against `base_dir`; a missing submodel file
/// is logged and ignored.
pub fn build_decompositions<R: Rng + ?Sized>(
    model: &Model,
    descriptors: &[DecompositionDescriptor],
    base_dir: &Path,
    rng: &mut R,
) -> Result<Vec<Decomposition>, DecompError> {
    let mut decompositions = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let submodel = match &descriptor.model {
            Some(file) => load_submodel(&base_dir.join(file))?,
            None => None,
        };
        decompositions.push(descriptor.build(model, submodel, rng)?);
    }
    decompositions.sort_by_key(|dec| dec.priority);
    for (index, dec) in decompositions.iter_mut().enumerate() {
        dec.set_index(index);
    }
    Ok(decompositions)
}

fn load_submodel(path: &Path) -> Result<Option<Model>, DecompError> {
    if !path.exists() {
        tracing::warn!(
            component = "decomposition",
            operation = "load_submodel",
            status = "warn",
            path = %path.display(),
            "Submodel file not found, using the original formulation"
        );
        return Ok(None);
    }
    Ok(Some(Model::read_json(path)?))
}

/// Everything a `.jdec` file points to.
#[derive(Debug, Clone)]
pub struct JdecInstance {
    pub problem_path: PathBuf,
    pub model: Model,
    pub initial_solution: Option<PartialSolution>,
    pub decompositions: Vec<Decomposition>,
}

impl JdecInstance {
    pub fn load<R: Rng + ?Sized>(path: &Path, rng: &mut R) -> Result<Self, DecompError> {
        tracing::info!(
            component = "decomposition",
            operation = "load_jdec",
            status = "start",
            path = %path.display(),
            "Loading decomposition(s)"
        );
        let document = JdecDocument::read(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let problem_path = base_dir.join(&document.problem);
        let model = Model::read_json(&problem_path)?;
        let initial_solution = match &document.initial_solution {
            Some(file) => Some(PartialSolution::read(&model, &base_dir.join(file))?),
            None => None,
        };
        let decompositions = build_decompositions(&model, &document.decompositions, base_dir, rng)?;
        Ok(Self {
            problem_path,
            model,
            initial_solution,
            decompositions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partita_core::{Expr, Variable};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DOC: &str = r#"{
        "problem": "model.json",
        "decompositions": [
            {
                "name": "late",
                "priority": 5,
                "subproblems": [{"name": "all", "variables": ["a", "b"]}]
            },
            {
                "name": "early",
                "priority": 1,
                "eta": 2,
                "max_eta": 4,
                "subproblems": [
                    {"priority": 2, "name": "left", "variables": ["a"]},
                    {"priority": 0, "name": "right", "variables": ["b"]}
                ],
                "connections": [{"priority": 1, "src": "left", "tar": "right"}]
            }
        ]
    }"#;

    fn model() -> Model {
        let mut model = Model::new("pair");
        let a = model.add_variable("a", Variable::binary()).unwrap();
        let b = model.add_variable("b", Variable::binary()).unwrap();
        model
            .add_constraint("ab", Expr::new(vec![(a, 1.0), (b, 1.0)], 0.0).le_scalar(1.0))
            .unwrap();
        model
    }

    #[test]
    fn descriptor_defaults() {
        let document = JdecDocument::from_json_str(DOC, "doc.jdec").unwrap();
        assert_eq!(document.initial_solution, None);
        let late = &document.decompositions[0];
        assert_eq!((late.eta, late.step, late.eta_skip), (0, 0, 1));
        assert_eq!(late.max_step, None);
        assert!(late.connections.is_empty());
        assert_eq!(late.subproblems[0].priority, 0);
    }

    #[test]
    fn decompositions_are_sorted_and_indexed() {
        let document = JdecDocument::from_json_str(DOC, "doc.jdec").unwrap();
        let model = model();
        let mut rng = StdRng::seed_from_u64(2);
        let decs =
            build_decompositions(&model, &document.decompositions, Path::new("."), &mut rng).unwrap();
        assert_eq!(decs[0].name, "early");
        assert_eq!(decs[0].index(), 0);
        assert_eq!(decs[1].index(), 1);
        assert_eq!(decs[0].max_eta, 4);
        assert_eq!(decs[0].max_step, usize::MAX);
        assert_eq!(decs[0].block_at(0).name(), "right");
        assert_eq!(decs[0].block(0).connections()[0].target, 1);
    }

    #[test]
    fn unknown_names_are_errors() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(2);
        let mut document = JdecDocument::from_json_str(DOC, "doc.jdec").unwrap();
        document.decompositions[1].connections[0].tar = "nowhere".to_string();
        let err = document.decompositions[1]
            .build(&model, None, &mut rng)
            .unwrap_err();
        assert_eq!(err, DecompError::UnknownBlock("nowhere".to_string()));

        document.decompositions[0].subproblems[0].variables.push("zz".to_string());
        let err = document.decompositions[0]
            .build(&model, None, &mut rng)
            .unwrap_err();
        assert_eq!(err.code(), "VARIABLE_UNKNOWN");

        let err = JdecDocument::from_json_str("{\"problem\": 3}", "bad.jdec").unwrap_err();
        assert_eq!(err.code(), "DESCRIPTOR_JSON");
    }
}
