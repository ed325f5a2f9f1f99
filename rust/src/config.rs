//! Configuration for the solver.

use std::time::Duration;

/// Search configuration. The cooldown window belongs to the model, not here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Verbosity level: 0=silent, 1=improvements, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Wall-clock budget; exceeding it ends the solve with a best-effort result.
    pub time_limit: Option<Duration>,
    /// Maximum day decisions to visit before stopping with a best-effort result.
    pub node_limit: Option<u64>,
    /// Search threads. 1 runs the single-threaded search; more split the
    /// first day's candidates across scoped workers.
    pub workers: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            time_limit: None,
            node_limit: None,
            workers: 1,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}
