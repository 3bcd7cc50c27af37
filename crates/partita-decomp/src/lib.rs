//! Block decompositions of mixed-integer models.
//!
//! Two ways of exploiting a block structure live here:
//!
//! - [`ColumnGeneration`]: Dantzig-Wolfe reformulation of a model with a
//!   [`BlockPartition`], solved by a two-phase column generation loop whose
//!   pricing problems ([`Pricing`]) are scheduled by estimated benefit.
//! - [`solve_heuristic`]: a primal heuristic over one or more named
//!   [`Decomposition`]s, combining [`Constructive`] block-by-block search with
//!   [`LocalSearch`] over growing block neighborhoods.
//!
//! Both sit on top of [`partita_solver::Session`], so any
//! [`partita_solver::SolverEngine`] can drive them.

pub mod colgen;
pub mod config;
pub mod constructive;
pub mod decomposition;
pub mod error;
pub mod heuristic;
pub mod local_search;
pub mod partition;
pub mod pricing;
pub mod solution;
pub mod subproblem;

pub use colgen::{ColumnGeneration, ColumnGenerationReport, IterationRecord, LambdaColumn, Phase};
pub use config::{
    ColumnGenerationConfig, ConstructiveConfig, EPS, HeuristicConfig, LocalSearchConfig,
    PartitionConfig, PricingConfig,
};
pub use constructive::{Constructive, complete_solution};
pub use decomposition::jdec::{JdecDocument, JdecInstance, build_decompositions};
pub use decomposition::{Block, Connection, Decomposition};
pub use error::DecompError;
pub use heuristic::{HeuristicOutcome, HeuristicReport, solve_heuristic};
pub use local_search::{LocalSearch, LocalSearchOutcome, LocalSearchStats};
pub use partition::{BlockPartition, PartitionBlock, PartitionFormat};
pub use pricing::Pricing;
pub use solution::PartialSolution;
pub use subproblem::{BlockGroup, select_blocks};
