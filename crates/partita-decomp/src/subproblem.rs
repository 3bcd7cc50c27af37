//! Block neighborhoods grown over the connection graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use partita_expr::ids::VariableId;

use crate::decomposition::Decomposition;

/// Up to `eta` block ids reachable from `seed`, in discovery order.
///
/// The seed comes first; afterwards the lowest-priority pending connection of
/// any chosen block is taken next (ties by discovery). Growth stops early
/// when the reachable part of the graph is exhausted.
pub fn select_blocks(dec: &Decomposition, seed: usize, eta: usize) -> Vec<usize> {
    let mut chosen = Vec::with_capacity(eta.min(dec.num_blocks()));
    let mut visited = vec![false; dec.num_blocks()];
    let mut pending: BinaryHeap<Reverse<(i64, usize, usize)>> = BinaryHeap::new();
    let mut sequence = 0usize;
    let mut current = Some(seed);

    while let Some(id) = current {
        if chosen.len() >= eta {
            break;
        }
        if !visited[id] {
            visited[id] = true;
            chosen.push(id);
            for connection in dec.block(id).connections() {
                pending.push(Reverse((connection.priority, sequence, connection.target)));
                sequence += 1;
            }
        }
        current = pending.pop().map(|Reverse((_, _, target))| target);
    }
    chosen
}

/// A group of blocks solved together, with the union of their variables.
#[derive(Debug, Clone)]
pub struct BlockGroup {
    /// Index of the owning decomposition.
    pub decomposition: usize,
    /// Stable block ids, seed first.
    pub blocks: Vec<usize>,
    /// Distinct variables of the blocks, in discovery order.
    pub variables: Vec<VariableId>,
    /// Smallest block priority in the group.
    pub priority: i64,
}

impl BlockGroup {
    /// Grow a group of up to `eta` blocks around `seed`.
    pub fn grow(dec: &Decomposition, seed: usize, eta: usize) -> Self {
        let blocks = select_blocks(dec, seed, eta);
        let mut seen = HashSet::new();
        let mut variables = Vec::new();
        for id in &blocks {
            for var in dec.block(*id).variables() {
                if seen.insert(*var) {
                    variables.push(*var);
                }
            }
        }
        let priority = blocks
            .iter()
            .map(|id| dec.block(*id).priority())
            .min()
            .unwrap_or_default();
        Self {
            decomposition: dec.index(),
            blocks,
            variables,
            priority,
        }
    }

    /// Seed block id.
    pub fn seed(&self) -> Option<usize> {
        self.blocks.first().copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partita_core::{Model, Variable};

    /// Five blocks `b0..b4`, one variable each.
    fn star() -> Decomposition {
        let mut model = Model::new("star");
        for index in 0..5 {
            model
                .add_variable(format!("x{index}"), Variable::binary())
                .unwrap();
        }
        let mut dec = Decomposition::new("star", &model);
        for index in 0..5 {
            let id = dec.add_block(&format!("b{index}"), index).unwrap();
            dec.assign_variable(&model, id, VariableId::from_index(index as usize))
                .unwrap();
        }
        dec.connect("b0", "b1", 3).unwrap();
        dec.connect("b0", "b2", 1).unwrap();
        dec.connect("b2", "b4", 2).unwrap();
        dec.connect("b1", "b3", 0).unwrap();
        dec
    }

    #[test]
    fn takes_lowest_priority_connection_first() {
        let dec = star();
        assert_eq!(select_blocks(&dec, 0, 1), vec![0]);
        assert_eq!(select_blocks(&dec, 0, 3), vec![0, 2, 4]);
        assert_eq!(select_blocks(&dec, 0, 5), vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn growth_stops_when_graph_is_exhausted() {
        let dec = star();
        assert_eq!(select_blocks(&dec, 3, 4), vec![3]);
        assert_eq!(select_blocks(&dec, 2, 10), vec![2, 4]);
    }

    #[test]
    fn group_collects_variables_and_priority() {
        let dec = star();
        let group = BlockGroup::grow(&dec, 2, 2);
        assert_eq!(group.blocks, vec![2, 4]);
        assert_eq!(group.variables, vec![VariableId::new(2), VariableId::new(4)]);
        assert_eq!(group.priority, 2);
        assert_eq!(group.seed(), Some(2));
    }
}
