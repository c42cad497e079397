use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Scheduler configuration.
///
/// Parsed from a TOML file; every field has a default so an empty file
/// (or no file at all) yields a working scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum time `stop()` waits for the dispatch loop and any
    /// outstanding sends during shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Whether `stop()` waits for in-flight sends to complete.
    ///
    /// When false, outstanding sends are orphaned: they still run to
    /// completion and their completion handlers are safe no-ops.
    #[serde(default = "default_drain_in_flight")]
    pub drain_in_flight: bool,
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_drain_in_flight() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            drain_in_flight: default_drain_in_flight(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
