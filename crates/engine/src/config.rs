//! Tunables for the engine.

use payroll_core::rollback::RollbackPolicy;

/// Default number of items processed concurrently within one operation.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// Engine-wide settings, usually built from the API server's environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Items of one operation processed at the same time. Values below 1
    /// are treated as 1.
    pub max_concurrency: usize,
    pub rollback: RollbackPolicy,
}

impl EngineConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            rollback: RollbackPolicy::default(),
        }
    }
}
