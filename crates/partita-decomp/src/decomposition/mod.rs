//! Decompositions used by the constructive heuristic and the local search.
//!
//! A [`Decomposition`] is a named set of [`Block`]s plus a weighted
//! connection graph between them. Blocks are stored by a stable id (their
//! load order); the scheduling order is a separate permutation that can be
//! reshuffled without touching connection targets.

pub mod jdec;

use std::collections::{HashMap, HashSet};

use partita_core::Model;
use partita_expr::ids::{ConstraintId, VariableId};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::DecompError;

/// Weighted edge to another block; lower priorities are explored first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub priority: i64,
    /// Stable id of the target block.
    pub target: usize,
}

/// A minimal subproblem: a set of variables and every constraint touching
/// one of them.
#[derive(Debug, Clone)]
pub struct Block {
    id: usize,
    name: String,
    priority: i64,
    variables: Vec<VariableId>,
    constraints: Vec<ConstraintId>,
    variable_set: HashSet<VariableId>,
    constraint_set: HashSet<ConstraintId>,
    connections: Vec<Connection>,
}

impl Block {
    pub fn new(id: usize, name: impl Into<String>, priority: i64) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            variables: Vec::new(),
            constraints: Vec::new(),
            variable_set: HashSet::new(),
            constraint_set: HashSet::new(),
            connections: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn variables(&self) -> &[VariableId] {
        &self.variables
    }

    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn contains_variable(&self, var: VariableId) -> bool {
        self.variable_set.contains(&var)
    }

    /// Add `var` and every constraint it appears in.
    ///
    /// Returns `false` when the variable was already present.
    pub fn add_variable(&mut self, model: &Model, var: VariableId) -> bool {
        if !self.variable_set.insert(var) {
            return false;
        }
        self.variables.push(var);
        for (con, _) in model.column_terms(var) {
            if self.constraint_set.insert(*con) {
                self.constraints.push(*con);
            }
        }
        true
    }

    pub fn add_connection(&mut self, priority: i64, target: usize) {
        self.connections.push(Connection { priority, target });
    }

    /// Shuffle, then stable-sort by priority: equal priorities end up in a
    /// seed-dependent order.
    pub fn sort_connections<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.connections.len() > 1 {
            self.connections.shuffle(rng);
            self.connections.sort_by_key(|connection| connection.priority);
        }
    }
}

/// A named partition of the model into blocks with scheduling parameters.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub name: String,
    pub priority: i64,
    /// Neighborhood size; 0 defers to the configured default.
    pub eta: usize,
    /// Seed advance; 0 defers to the configured default.
    pub step: usize,
    pub eta_skip: usize,
    pub max_eta: usize,
    pub max_step: usize,
    /// Reshuffle the block order every time the local search rebuilds its
    /// subproblem cover.
    pub shuffle: bool,
    /// Replacement formulation for same-named variables and constraints.
    pub submodel: Option<Model>,
    index: usize,
    blocks: Vec<Block>,
    names: HashMap<String, usize>,
    order: Vec<usize>,
    position: Vec<usize>,
    variable_blocks: Vec<Vec<usize>>,
    constraint_blocks: Vec<Vec<usize>>,
}

impl Decomposition {
    pub fn new(name: impl Into<String>, model: &Model) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            eta: 0,
            step: 0,
            eta_skip: 1,
            max_eta: usize::MAX,
            max_step: usize::MAX,
            shuffle: false,
            submodel: None,
            index: 0,
            blocks: Vec::new(),
            names: HashMap::new(),
            order: Vec::new(),
            position: Vec::new(),
            variable_blocks: vec![Vec::new(); model.num_variables()],
            constraint_blocks: vec![Vec::new(); model.num_constraints()],
        }
    }

    /// Position among all loaded decompositions.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Append a block; its id is the number of blocks before it.
    pub fn add_block(&mut self, name: &str, priority: i64) -> Result<usize, DecompError> {
        if self.names.contains_key(name) {
            return Err(DecompError::DuplicateBlock(name.to_string()));
        }
        let id = self.blocks.len();
        self.blocks.push(Block::new(id, name, priority));
        self.names.insert(name.to_string(), id);
        self.position.push(self.order.len());
        self.order.push(id);
        Ok(id)
    }

    /// Give `var` to block `id`, pulling in the constraints it touches.
    pub fn assign_variable(
        &mut self,
        model: &Model,
        id: usize,
        var: VariableId,
    ) -> Result<(), DecompError> {
        model.get_variable(var)?;
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| DecompError::UnknownBlock(id.to_string()))?;
        if !block.add_variable(model, var) {
            return Ok(());
        }
        if let Some(owners) = self.variable_blocks.get_mut(var.index()) {
            owners.push(id);
        }
        for (con, _) in model.column_terms(var) {
            if let Some(owners) = self.constraint_blocks.get_mut(con.index()) {
                if !owners.contains(&id) {
                    owners.push(id);
                }
            }
        }
        Ok(())
    }

    /// Add a connection between two blocks named in the descriptor.
    pub fn connect(&mut self, source: &str, target: &str, priority: i64) -> Result<(), DecompError> {
        let source_id = self
            .block_id(source)
            .ok_or_else(|| DecompError::UnknownBlock(source.to_string()))?;
        let target_id = self
            .block_id(target)
            .ok_or_else(|| DecompError::UnknownBlock(target.to_string()))?;
        self.blocks[source_id].add_connection(priority, target_id);
        Ok(())
    }

    pub fn block_id(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Shuffle the block order, stable-sort it by priority, then fix the
    /// tie order of every block's connections.
    pub fn order_blocks<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
        let blocks = &self.blocks;
        self.order.sort_by_key(|id| blocks[*id].priority);
        self.reindex();
        for block in &mut self.blocks {
            block.sort_connections(rng);
        }
    }

    /// Plain reshuffle of the block order, ignoring priorities.
    pub fn shuffle_blocks<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
        self.reindex();
    }

    fn reindex(&mut self) {
        for (position, id) in self.order.iter().enumerate() {
            self.position[*id] = position;
        }
    }

    pub fn sort_connections<R: Rng + ?Sized>(&mut self, id: usize, rng: &mut R) {
        if let Some(block) = self.blocks.get_mut(id) {
            block.sort_connections(rng);
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Block by stable id.
    pub fn block(&self, id: usize) -> &Block {
        &self.blocks[id]
    }

    /// Block at `position` of the scheduling order.
    pub fn block_at(&self, position: usize) -> &Block {
        &self.blocks[self.order[position]]
    }

    /// Stable ids in scheduling order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Scheduling position of block `id`.
    pub fn position(&self, id: usize) -> usize {
        self.position[id]
    }

    /// Blocks in scheduling order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.order.iter().map(|id| &self.blocks[*id])
    }

    /// Ids of the blocks owning `var`; empty for variables outside every block.
    pub fn variable_blocks(&self, var: VariableId) -> &[usize] {
        self.variable_blocks
            .get(var.index())
            .map_or(&[], |owners| owners.as_slice())
    }

    /// Ids of the blocks that pulled in `con`.
    pub fn constraint_blocks(&self, con: ConstraintId) -> &[usize] {
        self.constraint_blocks
            .get(con.index())
            .map_or(&[], |owners| owners.as_slice())
    }

    pub fn is_owned(&self, var: VariableId) -> bool {
        !self.variable_blocks(var).is_empty()
    }

    /// Variables that belong to at least one block.
    pub fn num_owned_variables(&self) -> usize {
        self.variable_blocks
            .iter()
            .filter(|owners| !owners.is_empty())
            .count()
    }

    /// Variables that belong to more than one block.
    pub fn num_linking(&self) -> usize {
        self.variable_blocks
            .iter()
            .filter(|owners| owners.len() > 1)
            .count()
    }

    /// Variables outside every block, in model order.
    pub fn unowned_variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.variable_blocks
            .iter()
            .enumerate()
            .filter(|(_, owners)| owners.is_empty())
            .map(|(index, _)| VariableId::from_index(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partita_core::{Expr, Variable};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn model() -> Model {
        let mut model = Model::new("chain");
        let ids: Vec<VariableId> = ["a", "b", "c", "z"]
            .iter()
            .map(|name| model.add_variable(*name, Variable::binary()).unwrap())
            .collect();
        model
            .add_constraint("ab", Expr::new(vec![(ids[0], 1.0), (ids[1], 1.0)], 0.0).le_scalar(1.0))
            .unwrap();
        model
            .add_constraint("bc", Expr::new(vec![(ids[1], 1.0), (ids[2], 1.0)], 0.0).le_scalar(1.0))
            .unwrap();
        model
    }

    fn var(model: &Model, name: &str) -> VariableId {
        model.variable_by_name(name).unwrap()
    }

    #[test]
    fn add_variable_pulls_constraints_once() {
        let model = model();
        let mut block = Block::new(0, "b0", 0);
        assert!(block.add_variable(&model, var(&model, "a")));
        assert!(block.add_variable(&model, var(&model, "b")));
        assert!(!block.add_variable(&model, var(&model, "b")));
        assert_eq!(block.variables().len(), 2);
        let names: Vec<&str> = block
            .constraints()
            .iter()
            .map(|con| model.constraint_name(*con).unwrap())
            .collect();
        assert_eq!(names, vec!["ab", "bc"]);
    }

    #[test]
    fn sort_connections_orders_by_priority() {
        let mut block = Block::new(0, "b0", 0);
        for (priority, target) in [(3, 1), (1, 2), (2, 3), (1, 4)] {
            block.add_connection(priority, target);
        }
        block.sort_connections(&mut StdRng::seed_from_u64(7));
        let priorities: Vec<i64> = block.connections().iter().map(|c| c.priority).collect();
        assert_eq!(priorities, vec![1, 1, 2, 3]);

        let mut again = Block::new(0, "b0", 0);
        for (priority, target) in [(3, 1), (1, 2), (2, 3), (1, 4)] {
            again.add_connection(priority, target);
        }
        again.sort_connections(&mut StdRng::seed_from_u64(7));
        assert_eq!(again.connections(), block.connections());
    }

    #[test]
    fn ownership_and_linking_are_tracked() {
        let model = model();
        let mut dec = Decomposition::new("chain", &model);
        let first = dec.add_block("first", 1).unwrap();
        let second = dec.add_block("second", 0).unwrap();
        dec.assign_variable(&model, first, var(&model, "a")).unwrap();
        dec.assign_variable(&model, first, var(&model, "b")).unwrap();
        dec.assign_variable(&model, second, var(&model, "b")).unwrap();
        dec.assign_variable(&model, second, var(&model, "c")).unwrap();
        dec.assign_variable(&model, second, var(&model, "c")).unwrap();

        assert_eq!(dec.num_owned_variables(), 3);
        assert_eq!(dec.num_linking(), 1);
        assert_eq!(dec.variable_blocks(var(&model, "b")), &[first, second]);
        let unowned: Vec<VariableId> = dec.unowned_variables().collect();
        assert_eq!(unowned, vec![var(&model, "z")]);
        let bc = model.constraint_by_name("bc").unwrap();
        assert_eq!(dec.constraint_blocks(bc), &[first, second]);

        dec.order_blocks(&mut StdRng::seed_from_u64(2));
        assert_eq!(dec.order(), &[second, first]);
        assert_eq!(dec.position(second), 0);
        assert_eq!(dec.block_at(1).name(), "first");
    }

    #[test]
    fn connections_resolve_block_names() {
        let model = model();
        let mut dec = Decomposition::new("chain", &model);
        dec.add_block("first", 0).unwrap();
        dec.add_block("second", 0).unwrap();
        assert_eq!(
            dec.add_block("first", 3).unwrap_err(),
            DecompError::DuplicateBlock("first".to_string())
        );
        dec.connect("first", "second", 5).unwrap();
        assert_eq!(dec.block(0).connections(), &[Connection { priority: 5, target: 1 }]);
        assert_eq!(
            dec.connect("first", "third", 1).unwrap_err().code(),
            "BLOCK_UNKNOWN"
        );
    }
}
