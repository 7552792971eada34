//! Snapshot store configuration
//!
//! A single `period` drives both throttles: slot writes happen at most once
//! per `period / 10`, fsyncs at most once per `period`. Committed data is
//! therefore at most `period * 1.1` behind the latest submission (plus the
//! fsync time itself).

use std::time::Duration;

use trislot_core::{Error, Result};

/// Snapshot store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Sync period; see module docs
    pub period: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            period: Duration::from_millis(100),
        }
    }
}

impl StoreConfig {
    /// Create config with the given sync period
    pub fn new(period: Duration) -> Self {
        StoreConfig { period }
    }

    /// Create config for testing
    ///
    /// Uses a short period so tests quiesce quickly.
    pub fn for_testing() -> Self {
        StoreConfig {
            period: Duration::from_millis(10),
        }
    }

    /// Set sync period
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Minimum interval between two slot writes
    pub fn write_interval(&self) -> Duration {
        self.period / 10
    }

    /// Minimum interval between two fsync cycles
    pub fn sync_interval(&self) -> Duration {
        self.period
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.period.is_zero() {
            return Err(Error::InvalidConfig("period must be non-zero".to_string()));
        }
        Ok(())
    }
}
