//! Solver configuration types.

use std::time::Instant;

/// Configuration options for solver behavior.
///
/// Shared by every backend; `None` leaves the backend default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverConfig {
    /// Time limit in seconds. `None` means no limit.
    pub time_limit: Option<f64>,
    /// Relative MIP gap tolerance.
    pub mip_gap: Option<f64>,
    /// Verbosity level.
    pub verbosity: Option<u32>,
    /// Number of threads to use.
    pub threads: Option<u32>,
    /// Log solver output to console.
    pub log_to_console: Option<bool>,
    /// Stop a MIP search after this many improving solutions.
    pub solution_limit: Option<usize>,
}

impl SolverConfig {
    /// Create a new configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the relative MIP gap tolerance.
    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = Some(gap);
        self
    }

    /// Set the verbosity level.
    pub fn with_verbosity(mut self, level: u32) -> Self {
        self.verbosity = Some(level);
        self
    }

    /// Set the number of threads.
    pub fn with_threads(mut self, count: u32) -> Self {
        self.threads = Some(count);
        self
    }

    /// Enable or disable console logging.
    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = Some(enabled);
        self
    }

    /// Set the improving-solution limit.
    pub fn with_solution_limit(mut self, count: usize) -> Self {
        self.solution_limit = Some(count);
        self
    }

    /// Cap the time limit by the time left until `deadline`.
    pub fn bounded_by(&self, deadline: Instant) -> Self {
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .as_secs_f64();
        let time_limit = match self.time_limit {
            Some(limit) => limit.min(remaining),
            None => remaining,
        };
        Self {
            time_limit: Some(time_limit),
            ..self.clone()
        }
    }

    /// Check if this configuration is completely empty (all defaults).
    pub fn is_empty(&self) -> bool {
        self.time_limit.is_none()
            && self.mip_gap.is_none()
            && self.verbosity.is_none()
            && self.threads.is_none()
            && self.log_to_console.is_none()
            && self.solution_limit.is_none()
    }
}
