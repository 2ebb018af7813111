//! Node configuration loaded from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, RadError};
use crate::serde::from_yaml_slice;

/// Default cap on concurrently running worker subprocesses.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;
/// Default pause between pool polls, in milliseconds.
pub const DEFAULT_WAIT_TIME_MS: u64 = 500;
/// Default number of consecutive failed swap attempts tolerated.
pub const DEFAULT_SWAP_RETRY_BUDGET: u64 = 1_000_000;
/// Default number of repair searches attempted by the Grady fill.
pub const DEFAULT_GRADY_SEARCH_THRESHOLD: u64 = 100_000;

/// Settings for the bounded process pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of simultaneously running subprocesses.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Pause between polls of running subprocesses.
    #[serde(default = "default_wait_time_ms")]
    pub wait_time_ms: u64,
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

fn default_wait_time_ms() -> u64 {
    DEFAULT_WAIT_TIME_MS
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            wait_time_ms: default_wait_time_ms(),
        }
    }
}

/// Settings for worker subprocess launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker executable invoked once per task.
    #[serde(default = "default_worker_program")]
    pub program: String,
    /// Directory receiving per-task documents and outputs.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

fn default_worker_program() -> String {
    "rad-worker".to_string()
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("rad-scratch")
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: default_worker_program(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

/// Tuning for the randomizers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomizeConfig {
    /// Consecutive unsuccessful swap attempts tolerated before failing.
    #[serde(default = "default_swap_retry_budget")]
    pub swap_retry_budget: u64,
    /// Repair searches attempted by the Grady fill before failing.
    #[serde(default = "default_grady_search_threshold")]
    pub grady_search_threshold: u64,
}

fn default_swap_retry_budget() -> u64 {
    DEFAULT_SWAP_RETRY_BUDGET
}

fn default_grady_search_threshold() -> u64 {
    DEFAULT_GRADY_SEARCH_THRESHOLD
}

impl Default for RandomizeConfig {
    fn default() -> Self {
        Self {
            swap_retry_budget: default_swap_retry_budget(),
            grady_search_threshold: default_grady_search_threshold(),
        }
    }
}

/// Top level configuration for a compute node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeConfig {
    /// Process pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Worker launch settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Randomizer tuning.
    #[serde(default)]
    pub randomize: RandomizeConfig,
    /// Master seed used when a request carries none.
    #[serde(default)]
    pub seed: u64,
    /// File whose existence stops batch processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sentinel: Option<PathBuf>,
}

impl NodeConfig {
    /// Rejects settings that would stall the pool.
    pub fn validate(&self) -> Result<(), RadError> {
        if self.pool.max_concurrent == 0 {
            return Err(RadError::Configuration(
                ErrorInfo::new("pool_max_concurrent", "pool.max_concurrent must be positive")
                    .with_hint("use at least 1"),
            ));
        }
        if self.pool.wait_time_ms == 0 {
            return Err(RadError::Configuration(ErrorInfo::new(
                "pool_wait_time",
                "pool.wait_time_ms must be positive",
            )));
        }
        if self.worker.program.trim().is_empty() {
            return Err(RadError::configuration(
                "worker_program",
                "worker.program must name an executable",
            ));
        }
        Ok(())
    }
}

/// Loads and validates a node configuration file.
pub fn load_config(path: &Path) -> Result<NodeConfig, RadError> {
    let bytes = fs::read(path)
        .map_err(|err| RadError::io("config_read", format!("{}: {err}", path.display())))?;
    let config: NodeConfig = from_yaml_slice(&bytes)?;
    config.validate()?;
    Ok(config)
}
