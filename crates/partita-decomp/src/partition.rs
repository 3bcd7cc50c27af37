//! Block partitions for column generation.
//!
//! A partition assigns every constraint to one block or to the master and
//! derives variable ownership from it. Three text formats are read:
//!
//! - `dec`: header lines, then `BLOCK <i>` sections listing constraint
//!   names and a trailing `MASTERCONSS` section.
//! - `cpart`: `<nblocks>`, then per block `<count>` and `count` constraint
//!   names.
//! - `vpart`: same layout with variable names; constraint ownership is
//!   inferred from the variables.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use partita_core::Model;
use partita_expr::ids::{ConstraintId, VariableId};

use crate::config::PartitionConfig;
use crate::error::DecompError;

/// Supported partition file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionFormat {
    Dec,
    Cpart,
    Vpart,
}

impl PartitionFormat {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "dec" => Some(PartitionFormat::Dec),
            "cpart" => Some(PartitionFormat::Cpart),
            "vpart" => Some(PartitionFormat::Vpart),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            PartitionFormat::Dec => "dec",
            PartitionFormat::Cpart => "cpart",
            PartitionFormat::Vpart => "vpart",
        }
    }
}

/// One block of a partition.
#[derive(Debug, Clone, Default)]
pub struct PartitionBlock {
    pub index: usize,
    /// Owned variables in model order.
    pub variables: Vec<VariableId>,
    pub constraints: Vec<ConstraintId>,
    local: HashMap<VariableId, usize>,
}

impl PartitionBlock {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Position of `var` in [`PartitionBlock::variables`].
    pub fn local_index(&self, var: VariableId) -> Option<usize> {
        self.local.get(&var).copied()
    }
}

/// Constraint and variable ownership for column generation.
#[derive(Debug, Clone)]
pub struct BlockPartition {
    blocks: Vec<PartitionBlock>,
    variable_blocks: Vec<Vec<usize>>,
    constraint_blocks: Vec<Option<usize>>,
}

impl BlockPartition {
    fn empty(model: &Model, num_blocks: usize) -> Self {
        Self {
            blocks: (0..num_blocks).map(PartitionBlock::new).collect(),
            variable_blocks: vec![Vec::new(); model.num_variables()],
            constraint_blocks: vec![None; model.num_constraints()],
        }
    }

    /// Build from explicit per-block constraint lists (`dec` and `cpart`).
    ///
    /// Every counted variable of a listed constraint joins the block. Under
    /// `continuous_in_master` continuous variables are not counted and a
    /// constraint touching one stays in the master.
    pub fn from_constraint_lists(
        model: &Model,
        lists: &[Vec<ConstraintId>],
        config: PartitionConfig,
    ) -> Result<Self, DecompError> {
        let mut partition = Self::empty(model, lists.len());
        for (block, constraints) in lists.iter().enumerate() {
            for &con in constraints {
                model.get_constraint(con)?;
                let mut continuous = false;
                for (var, _) in model.row_terms(con) {
                    if config.continuous_in_master && !model.get_variable(*var)?.is_integer {
                        continuous = true;
                        continue;
                    }
                    let owners = &mut partition.variable_blocks[var.index()];
                    if owners.last() != Some(&block) {
                        owners.push(block);
                    }
                }
                if !(config.continuous_in_master && continuous) {
                    partition.assign_constraint(con, block);
                }
            }
        }
        partition.finish(model);
        Ok(partition)
    }

    /// Build from per-block variable lists (`vpart`).
    ///
    /// A constraint joins block `b` when every owned variable it touches has
    /// `b` as first owner. Unowned variables are ignored, as are continuous
    /// ones under `continuous_in_master`. Disputed constraints and those with
    /// no owned variable stay in the master.
    pub fn from_variable_lists(
        model: &Model,
        lists: &[Vec<VariableId>],
        config: PartitionConfig,
    ) -> Result<Self, DecompError> {
        let mut partition = Self::empty(model, lists.len());
        for (block, variables) in lists.iter().enumerate() {
            for &var in variables {
                if config.continuous_in_master && !model.get_variable(var)?.is_integer {
                    continue;
                }
                let owners = &mut partition.variable_blocks[var.index()];
                if !owners.contains(&block) {
                    owners.push(block);
                }
            }
        }

        for (con, _) in model.constraints() {
            let mut owner: Option<usize> = None;
            let mut shared = false;
            for (var, _) in model.row_terms(con) {
                if config.continuous_in_master && !model.get_variable(*var)?.is_integer {
                    continue;
                }
                let Some(&first) = partition.variable_blocks[var.index()].first() else {
                    continue;
                };
                if owner.is_some_and(|block| block != first) {
                    shared = true;
                    break;
                }
                owner = Some(first);
            }
            if let (Some(block), false) = (owner, shared) {
                partition.assign_constraint(con, block);
            }
        }
        partition.finish(model);
        Ok(partition)
    }

    fn assign_constraint(&mut self, con: ConstraintId, block: usize) {
        if self.constraint_blocks[con.index()].is_none() {
            self.constraint_blocks[con.index()] = Some(block);
            self.blocks[block].constraints.push(con);
        }
    }

    fn finish(&mut self, model: &Model) {
        for (var, _) in model.variables() {
            for &block in &self.variable_blocks[var.index()] {
                let block = &mut self.blocks[block];
                block.local.insert(var, block.variables.len());
                block.variables.push(var);
            }
        }
        let owned: usize = self.blocks.iter().map(|b| b.variables.len()).sum();
        tracing::info!(
            component = "partition",
            operation = "load",
            status = "success",
            blocks = self.blocks.len(),
            block_variables = owned,
            linking = self.num_linking(),
            master_constraints = self.master_constraints().count(),
            "Found {} blocks and {} variables in these blocks",
            self.blocks.len(),
            owned
        );
    }

    /// Read a partition file; the format follows the extension.
    pub fn read(model: &Model, path: &Path, config: PartitionConfig) -> Result<Self, DecompError> {
        let format = PartitionFormat::from_path(path).ok_or_else(|| DecompError::InvalidParameter {
            name: "partition",
            reason: format!("has an unknown extension: {}", path.display()),
        })?;
        let text = std::fs::read_to_string(path).map_err(|err| DecompError::io(path, err))?;
        let source = path.display().to_string();
        tracing::debug!(
            component = "partition",
            operation = "read",
            status = "start",
            path = %source,
            format = format.extension(),
            "Loading blocks"
        );
        match format {
            PartitionFormat::Dec => Self::parse_dec(model, &text, &source, config),
            PartitionFormat::Cpart => Self::parse_cpart(model, &text, &source, config),
            PartitionFormat::Vpart => Self::parse_vpart(model, &text, &source, config),
        }
    }

    /// Parse `dec` text. Block numbers are taken from section order.
    pub fn parse_dec(
        model: &Model,
        text: &str,
        source: &str,
        config: PartitionConfig,
    ) -> Result<Self, DecompError> {
        let mut lists: Vec<Vec<ConstraintId>> = Vec::new();
        let mut in_block = false;
        for line in text.lines().map(str::trim) {
            if line.starts_with("BLOCK") && line.len() > 5 {
                lists.push(Vec::new());
                in_block = true;
            } else if line.starts_with("MASTERCONSS") {
                in_block = false;
            } else if in_block && !line.is_empty() {
                let con = model
                    .constraint_by_name(line)
                    .ok_or_else(|| DecompError::UnknownConstraint(line.to_string()))?;
                if let Some(list) = lists.last_mut() {
                    list.push(con);
                }
            }
        }
        if lists.is_empty() {
            return Err(DecompError::Parse {
                path: source.to_string(),
                line: text.lines().count(),
                reason: "no BLOCK section found".to_string(),
            });
        }
        Self::from_constraint_lists(model, &lists, config)
    }

    /// Parse `cpart` text.
    pub fn parse_cpart(
        model: &Model,
        text: &str,
        source: &str,
        config: PartitionConfig,
    ) -> Result<Self, DecompError> {
        let lists = read_counted_lists(text, source, |name| {
            model
                .constraint_by_name(name)
                .ok_or_else(|| DecompError::UnknownConstraint(name.to_string()))
        })?;
        Self::from_constraint_lists(model, &lists, config)
    }

    /// Parse `vpart` text.
    pub fn parse_vpart(
        model: &Model,
        text: &str,
        source: &str,
        config: PartitionConfig,
    ) -> Result<Self, DecompError> {
        let lists = read_counted_lists(text, source, |name| {
            model
                .variable_by_name(name)
                .ok_or_else(|| DecompError::UnknownVariable(name.to_string()))
        })?;
        Self::from_variable_lists(model, &lists, config)
    }

    /// Render as `dec` text with 1-based block numbers.
    pub fn to_dec_string(&self, model: &Model) -> String {
        let mut out = String::new();
        let _ = write!(out, "PRESOLVED\n0\nNBLOCKS\n{}\n", self.blocks.len());
        for block in &self.blocks {
            let _ = writeln!(out, "BLOCK {}", block.index + 1);
            for (con, owner) in self.constraint_blocks.iter().enumerate() {
                if *owner == Some(block.index) {
                    let _ = writeln!(out, "{}", constraint_label(model, con));
                }
            }
        }
        let _ = writeln!(out, "MASTERCONSS");
        for con in self.master_constraints() {
            let _ = writeln!(out, "{}", constraint_label(model, con.index()));
        }
        out
    }

    pub fn write_dec(&self, model: &Model, path: &Path) -> Result<(), DecompError> {
        std::fs::write(path, self.to_dec_string(model)).map_err(|err| DecompError::io(path, err))?;
        tracing::info!(
            component = "partition",
            operation = "write_dec",
            status = "success",
            path = %path.display(),
            blocks = self.blocks.len(),
            "Wrote blocks"
        );
        Ok(())
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[PartitionBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&PartitionBlock> {
        self.blocks.get(index)
    }

    /// Blocks owning `var`, in block order. Empty for master variables.
    pub fn variable_blocks(&self, var: VariableId) -> &[usize] {
        self.variable_blocks
            .get(var.index())
            .map_or(&[], |owners| owners.as_slice())
    }

    /// Owning block of `con`; `None` means master.
    pub fn constraint_block(&self, con: ConstraintId) -> Option<usize> {
        self.constraint_blocks.get(con.index()).copied().flatten()
    }

    pub fn is_linking(&self, var: VariableId) -> bool {
        self.variable_blocks(var).len() > 1
    }

    pub fn num_linking(&self) -> usize {
        self.variable_blocks.iter().filter(|owners| owners.len() > 1).count()
    }

    pub fn master_constraints(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraint_blocks
            .iter()
            .enumerate()
            .filter(|(_, owner)| owner.is_none())
            .map(|(index, _)| ConstraintId::from_index(index))
    }
}

fn constraint_label(model: &Model, index: usize) -> String {
    let con = ConstraintId::from_index(index);
    model
        .constraint_name(con)
        .map_or_else(|| format!("c{index}"), str::to_string)
}

/// `<n>` then `n` times `<count>` followed by `count` names.
fn read_counted_lists<T>(
    text: &str,
    source: &str,
    mut resolve: impl FnMut(&str) -> Result<T, DecompError>,
) -> Result<Vec<Vec<T>>, DecompError> {
    let last_line = text.lines().count();
    let parse_error = |line: usize, reason: String| DecompError::Parse {
        path: source.to_string(),
        line,
        reason,
    };
    let mut entries = text
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());
    let mut next = |what: &str| {
        entries
            .next()
            .ok_or_else(|| parse_error(last_line, format!("unexpected end of file, expected {what}")))
    };
    let count = |(line, value): (usize, &str), what: &str| {
        value
            .parse::<usize>()
            .map_err(|_| parse_error(line, format!("expected {what}, found '{value}'")))
    };

    let num_blocks = count(next("a block count")?, "a block count")?;
    let mut lists = Vec::with_capacity(num_blocks);
    for block in 0..num_blocks {
        let what = format!("the entry count of block {block}");
        let size = count(next(&what)?, &what)?;
        let mut list = Vec::with_capacity(size);
        for _ in 0..size {
            let (_, name) = next("a name")?;
            list.push(resolve(name)?);
        }
        lists.push(list);
    }
    Ok(lists)
}
