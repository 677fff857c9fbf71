//! Run configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When a run stops admitting new requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StopCondition {
    /// Stop after the given wall-clock duration
    Duration(Duration),

    /// Run until an interrupt signal or an explicit shutdown trigger
    Indefinite,
}

impl Default for StopCondition {
    fn default() -> Self {
        StopCondition::Indefinite
    }
}

/// How a script-boundary failure during a run is handled
///
/// Configuration-time script failures (unreadable or invalid scenario file)
/// are always fatal and reported before any worker starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptErrorPolicy {
    /// A script error aborts the whole run (a malformed script is a
    /// programmer error, not a runtime condition).
    Fatal,

    /// A script error fails that one request and the worker keeps going.
    CountAsError,
}

impl Default for ScriptErrorPolicy {
    fn default() -> Self {
        ScriptErrorPolicy::Fatal
    }
}

/// Configuration for a load-generation run
///
/// Defines the aggregate admission rate, the worker pool size, and the
/// transport knobs shared by every worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target aggregate requests per second across all workers
    pub rps: u32,

    /// Number of concurrent workers (clamped down to `rps` at run time)
    pub workers: usize,

    /// Reuse connections between requests
    pub keepalive: bool,

    /// Ask for and decode compressed response bodies
    pub compression: bool,

    /// Route resolution through the in-process DNS cache
    pub cache_dns: bool,

    /// When the run stops admitting new requests
    pub stop_condition: StopCondition,

    /// How per-request script errors are handled
    pub script_error_policy: ScriptErrorPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rps: 10,
            workers: 100,
            keepalive: true,
            compression: true,
            cache_dns: false,
            stop_condition: StopCondition::default(),
            script_error_policy: ScriptErrorPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Create a config with the given rate and worker count.
    pub fn new(rps: u32, workers: usize) -> Self {
        Self {
            rps,
            workers,
            ..Default::default()
        }
    }

    /// Set the stop condition.
    pub fn with_stop_condition(mut self, stop: StopCondition) -> Self {
        self.stop_condition = stop;
        self
    }

    /// Set the script error policy.
    pub fn with_script_error_policy(mut self, policy: ScriptErrorPolicy) -> Self {
        self.script_error_policy = policy;
        self
    }

    /// Enable or disable the DNS cache.
    pub fn with_cache_dns(mut self, enabled: bool) -> Self {
        self.cache_dns = enabled;
        self
    }

    /// Number of workers actually started.
    ///
    /// Never more workers than requests per second; an extra worker could
    /// never be admitted within its own second anyway.
    pub fn effective_workers(&self) -> usize {
        self.workers.min(self.rps as usize).max(1)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rps == 0 {
            return Err(ConfigError::InvalidRate("rps must be at least 1".into()));
        }

        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "workers must be at least 1".into(),
            ));
        }

        if let StopCondition::Duration(d) = self.stop_condition {
            if d.is_zero() {
                return Err(ConfigError::InvalidStopCondition(
                    "run duration must be non-zero".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid request rate
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// Invalid worker count
    #[error("Invalid worker count: {0}")]
    InvalidWorkers(String),

    /// Invalid stop condition
    #[error("Invalid stop condition: {0}")]
    InvalidStopCondition(String),
}
