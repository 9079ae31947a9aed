//! Pool configuration types

use aqueduct_core::ClientConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a connection pool
///
/// The pool only consumes sizing and initialization strategy; everything
/// else in the client configuration belongs to the connection layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of connections the pool provisions
    max_size: usize,
    /// Defer opening connections until first acquire
    lazy_initialization: bool,
}

impl PoolConfig {
    /// Create a new pool configuration with the given size
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is 0.
    pub fn new(max_size: usize) -> Self {
        assert!(
            max_size > 0,
            "max_size must be greater than 0, got {}",
            max_size
        );

        Self {
            max_size,
            lazy_initialization: false,
        }
    }

    /// Defer opening connections until first use
    pub fn with_lazy_initialization(mut self, lazy: bool) -> Self {
        self.lazy_initialization = lazy;
        self
    }

    /// Get the pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether connections are opened lazily
    pub fn lazy_initialization(&self) -> bool {
        self.lazy_initialization
    }
}

impl Default for PoolConfig {
    /// Defaults: 4 connections, eager initialization
    fn default() -> Self {
        Self::new(4)
    }
}

impl From<&ClientConfig> for PoolConfig {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.pool_size).with_lazy_initialization(config.lazy_initialization)
    }
}
