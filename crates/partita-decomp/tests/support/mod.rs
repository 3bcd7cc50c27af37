#![allow(dead_code)]

use std::path::PathBuf;

use partita_core::{Bounds, Expr, Model, Sense, Variable};
use partita_decomp::{BlockPartition, Decomposition, PartitionConfig};

/// `max 3x1 + 2x2 + 3x3 + 2x4 + y` over binaries with
/// `c0: x1 + x2 + y <= 2`, `c1: x3 + x4 + y <= 2` and `m: x1 + x3 <= 1`.
///
/// The integer optimum is 7 and the Dantzig-Wolfe bound of [`TOY_DEC`] is 7.5.
pub fn toy() -> Model {
    let mut model = Model::new("toy");
    let names = ["x1", "x2", "x3", "x4", "y"];
    let vars: Vec<_> = names
        .iter()
        .map(|name| model.add_variable(*name, Variable::binary()).unwrap())
        .collect();
    let (x1, x2, x3, x4, y) = (vars[0], vars[1], vars[2], vars[3], vars[4]);
    model
        .add_constraint("c0", Expr::new(vec![(x1, 1.0), (x2, 1.0), (y, 1.0)], 0.0).le_scalar(2.0))
        .unwrap();
    model
        .add_constraint("c1", Expr::new(vec![(x3, 1.0), (x4, 1.0), (y, 1.0)], 0.0).le_scalar(2.0))
        .unwrap();
    model
        .add_constraint("m", Expr::new(vec![(x1, 1.0), (x3, 1.0)], 0.0).le_scalar(1.0))
        .unwrap();
    model
        .set_objective(
            Sense::Maximize,
            Expr::new(vec![(x1, 3.0), (x2, 2.0), (x3, 3.0), (x4, 2.0), (y, 1.0)], 0.0),
        )
        .unwrap();
    model
}

/// [`toy`] with the objective negated and minimized; the bound is -7.5.
pub fn toy_minimize() -> Model {
    let mut model = toy();
    let terms: Vec<_> = model
        .variables()
        .map(|(var, _)| (var, -model.objective().coefficient(var)))
        .collect();
    model
        .set_objective(Sense::Minimize, Expr::new(terms, 0.0))
        .unwrap();
    model
}

/// [`toy`] plus a continuous `z` in `c2: z <= 3`, which a third block lists
/// and which therefore stays in the master, leaving that block empty.
pub fn toy_with_empty_block() -> (Model, BlockPartition) {
    let mut model = toy();
    let z = model
        .add_variable("z", Variable::continuous(Bounds::new(0.0, 5.0)))
        .unwrap();
    model
        .add_constraint("c2", Expr::term(z, 1.0).le_scalar(3.0))
        .unwrap();
    let text = "NBLOCKS\n3\nBLOCK 1\nc0\nBLOCK 2\nc1\nBLOCK 3\nc2\nMASTERCONSS\nm\n";
    let partition =
        BlockPartition::parse_dec(&model, text, "empty.dec", PartitionConfig::default()).unwrap();
    (model, partition)
}

pub const TOY_DEC: &str = "PRESOLVED\n0\nNBLOCKS\n2\nBLOCK 1\nc0\nBLOCK 2\nc1\nMASTERCONSS\nm\n";

pub fn toy_partition(model: &Model) -> BlockPartition {
    BlockPartition::parse_dec(model, TOY_DEC, "toy.dec", PartitionConfig::default()).unwrap()
}

/// `left = {x1, x2}` and `right = {x3, x4}` connected both ways; `y` stays
/// outside every block.
pub fn toy_decomposition(model: &Model) -> Decomposition {
    let mut dec = Decomposition::new("sides", model);
    let left = dec.add_block("left", 0).unwrap();
    let right = dec.add_block("right", 1).unwrap();
    for name in ["x1", "x2"] {
        dec.assign_variable(model, left, model.variable_by_name(name).unwrap())
            .unwrap();
    }
    for name in ["x3", "x4"] {
        dec.assign_variable(model, right, model.variable_by_name(name).unwrap())
            .unwrap();
    }
    dec.connect("left", "right", 0).unwrap();
    dec.connect("right", "left", 0).unwrap();
    dec
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("partita-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
