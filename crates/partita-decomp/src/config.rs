//! Algorithm configuration.
//!
//! Every component receives its configuration explicitly; there is no
//! process-wide parameter store.

use std::path::PathBuf;
use std::time::Duration;

use partita_solver::SolverConfig;

use crate::error::DecompError;

/// Numerical tolerance shared by every decomposition algorithm.
pub const EPS: f64 = 1e-6;

/// How partition files assign variables and constraints to blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Continuous variables never own a block; constraints touching one
    /// stay in the master.
    pub continuous_in_master: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            continuous_in_master: true,
        }
    }
}

impl PartitionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continuous_in_master(mut self, enabled: bool) -> Self {
        self.continuous_in_master = enabled;
        self
    }
}

/// Pricing subproblem settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    /// Stop each pricing MIP after this many improving solutions.
    pub solution_limit: Option<usize>,
    /// Ask the engine for a pool of solutions instead of a single optimum.
    pub populate: bool,
    /// Pool size when `populate` is set.
    pub populate_limit: usize,
    /// Time limit in seconds for each pricing solve.
    pub time_limit: Option<f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            solution_limit: None,
            populate: false,
            populate_limit: 20,
            time_limit: None,
        }
    }
}

impl PricingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solution_limit(mut self, count: usize) -> Self {
        self.solution_limit = Some(count);
        self
    }

    pub fn with_populate(mut self, limit: usize) -> Self {
        self.populate = true;
        self.populate_limit = limit;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Engine options for one pricing solve.
    pub fn solver_config(&self) -> SolverConfig {
        let mut config = SolverConfig::new();
        if let Some(limit) = self.time_limit {
            config = config.with_time_limit(limit);
        }
        if let Some(count) = self.solution_limit {
            config = config.with_solution_limit(count);
        }
        config
    }
}

/// Column generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGenerationConfig {
    pub eps: f64,
    /// Re-solve the master right after the first block that yields columns.
    pub run_once: bool,
    pub pricing: PricingConfig,
    /// Engine options for the restricted master.
    pub master: SolverConfig,
    /// Directory for LP dumps of an infeasible restricted master.
    pub diagnostics: Option<PathBuf>,
}

impl Default for ColumnGenerationConfig {
    fn default() -> Self {
        Self {
            eps: EPS,
            run_once: false,
            pricing: PricingConfig::default(),
            master: SolverConfig::default(),
            diagnostics: None,
        }
    }
}

impl ColumnGenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_run_once(mut self, enabled: bool) -> Self {
        self.run_once = enabled;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_master(mut self, master: SolverConfig) -> Self {
        self.master = master;
        self
    }

    pub fn with_diagnostics(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics = Some(dir.into());
        self
    }
}

/// Constructive heuristic settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructiveConfig {
    /// Blocks solved together in one subproblem.
    pub eta: usize,
    /// Maximum advance of the seed block between subproblems.
    pub step: usize,
    /// Candidate solutions kept per subproblem.
    pub solution_limit: usize,
    pub solver: SolverConfig,
}

impl Default for ConstructiveConfig {
    fn default() -> Self {
        Self {
            eta: 3,
            step: 3,
            solution_limit: 3,
            solver: SolverConfig::default(),
        }
    }
}

impl ConstructiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eta(mut self, eta: usize) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn with_solution_limit(mut self, count: usize) -> Self {
        self.solution_limit = count;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn validate(&self) -> Result<(), DecompError> {
        if self.eta == 0 {
            return Err(DecompError::InvalidParameter {
                name: "eta",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.step == 0 || self.step > self.eta {
            return Err(DecompError::InvalidParameter {
                name: "step",
                reason: format!("must be between 1 and eta ({})", self.eta),
            });
        }
        if self.solution_limit == 0 {
            return Err(DecompError::InvalidParameter {
                name: "solution_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Local search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSearchConfig {
    /// Default neighborhood size for decompositions without their own.
    pub eta: usize,
    /// Default seed advance for decompositions without their own.
    pub step: usize,
    /// Restart the wrap-around count after every improvement.
    pub reoptimize: bool,
    pub time_limit: Duration,
    pub solver: SolverConfig,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            eta: 4,
            step: 2,
            reoptimize: true,
            time_limit: Duration::from_secs(900),
            solver: SolverConfig::default(),
        }
    }
}

impl LocalSearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eta(mut self, eta: usize) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn with_reoptimize(mut self, enabled: bool) -> Self {
        self.reoptimize = enabled;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn validate(&self) -> Result<(), DecompError> {
        if self.eta == 0 || self.step == 0 {
            return Err(DecompError::InvalidParameter {
                name: if self.eta == 0 { "eta" } else { "step" },
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for the constructive + local search driver.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicConfig {
    /// Seed for every shuffle (connections, blocks, subproblem pool).
    pub seed: u64,
    pub constructive: ConstructiveConfig,
    pub local_search: LocalSearchConfig,
    /// Directory for LP dumps of infeasible completions.
    pub diagnostics: Option<PathBuf>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            seed: 2,
            constructive: ConstructiveConfig::default(),
            local_search: LocalSearchConfig::default(),
            diagnostics: None,
        }
    }
}

impl HeuristicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_constructive(mut self, constructive: ConstructiveConfig) -> Self {
        self.constructive = constructive;
        self
    }

    pub fn with_local_search(mut self, local_search: LocalSearchConfig) -> Self {
        self.local_search = local_search;
        self
    }

    pub fn with_diagnostics(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics = Some(dir.into());
        self
    }
}
