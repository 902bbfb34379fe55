//! Core configuration.

use crate::error::{CoreError, CoreResult};

/// Configuration for building a lock manager and a storage engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of keys (`0..keyspace_size`) registered in the storage engine.
    pub keyspace_size: u64,

    /// Whether every key gets a baseline version at timestamp 0.
    pub seed_initial_versions: bool,

    /// Initial capacity of the lock table.
    pub lock_table_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyspace_size: 1_000_000,
            seed_initial_versions: true,
            lock_table_capacity: 1024,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size of the addressable keyspace.
    #[must_use]
    pub const fn keyspace_size(mut self, size: u64) -> Self {
        self.keyspace_size = size;
        self
    }

    /// Sets whether keys are seeded with a version at timestamp 0.
    #[must_use]
    pub const fn seed_initial_versions(mut self, value: bool) -> Self {
        self.seed_initial_versions = value;
        self
    }

    /// Sets the initial lock table capacity.
    #[must_use]
    pub const fn lock_table_capacity(mut self, capacity: usize) -> Self {
        self.lock_table_capacity = capacity;
        self
    }

    /// Checks the configuration for contradictory settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if seeding is requested for an
    /// empty keyspace.
    pub fn validate(&self) -> CoreResult<()> {
        if self.seed_initial_versions && self.keyspace_size == 0 {
            return Err(CoreError::invalid_config(
                "keyspace_size must be non-zero when seeding initial versions",
            ));
        }
        Ok(())
    }
}
