//! Configuration shared by every set strategy.

use crate::error::SetError;

/// Set configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetConfig {
    /// Max number of workers registered at the same time.
    pub max_workers: usize,
    /// Nodes a worker keeps parked before it starts freeing certified ones
    /// (epoch reclaimer only).
    pub free_list_limit: usize,
}

impl SetConfig {
    pub const DEFAULT_MAX_WORKERS: usize = 32;
    pub const DEFAULT_FREE_LIST_LIMIT: usize = 1024;

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_free_list_limit(mut self, free_list_limit: usize) -> Self {
        self.free_list_limit = free_list_limit;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), SetError> {
        if self.max_workers == 0 {
            return Err(SetError::InvalidConfig(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.free_list_limit == 0 {
            return Err(SetError::InvalidConfig(
                "free_list_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            max_workers: Self::DEFAULT_MAX_WORKERS,
            free_list_limit: Self::DEFAULT_FREE_LIST_LIMIT,
        }
    }
}
