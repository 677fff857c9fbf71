//! Builder pattern for Coordinator construction

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::channel::ChannelConfig;
use crate::config::RunConfig;
use crate::error::{EngineError, EngineResult};
use crate::limiter::RateLimiter;
use crate::metrics::{Counters, TimingEvent};
use crate::script::ScriptBoundary;
use crate::shutdown::ShutdownSignal;
use crate::transport::{HttpTransport, Transport};

use super::executor::Coordinator;

/// Builder for creating a Coordinator with proper configuration
///
/// # Example
///
/// ```ignore
/// let (coordinator, timing_rx) = CoordinatorBuilder::new()
///     .rps(200)
///     .workers(16)
///     .script(script)
///     .build()?;
/// ```
pub struct CoordinatorBuilder {
    config: RunConfig,
    script: Option<Arc<dyn ScriptBoundary>>,
    transport: Option<Arc<dyn Transport>>,
    args: Vec<String>,
    channel_config: ChannelConfig,
}

impl CoordinatorBuilder {
    /// Create a new coordinator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            script: None,
            transport: None,
            args: Vec::new(),
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the aggregate request rate
    pub fn rps(mut self, rps: u32) -> Self {
        self.config.rps = rps;
        self
    }

    /// Set the worker pool size
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the script driving every worker
    pub fn script(mut self, script: Arc<dyn ScriptBoundary>) -> Self {
        self.script = Some(script);
        self
    }

    /// Set the transport. When unset, `build` constructs an [`HttpTransport`]
    /// from the run configuration.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the positional arguments forwarded to the script
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the coordinator and return it along with the timing receiver
    ///
    /// # Errors
    ///
    /// Returns an error if the script is not set, if configuration validation
    /// fails, or if the default transport cannot be constructed.
    pub fn build(self) -> EngineResult<(Coordinator, mpsc::Receiver<TimingEvent>)> {
        let script = self.script.ok_or(EngineError::MissingField("script"))?;

        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };

        // The bucket starts full so the first second of the run reaches the
        // target rate instead of ramping up from zero.
        let limiter = Arc::new(RateLimiter::full(
            self.config.rps as f64,
            Duration::from_secs(1),
        ));
        let counters = Arc::new(Counters::new());
        let shutdown = ShutdownSignal::new();

        let (timing_tx, timing_rx) = mpsc::channel(self.channel_config.timing_buffer);

        let coordinator = Coordinator::new(
            self.config,
            script,
            transport,
            limiter,
            counters,
            shutdown,
            timing_tx,
            self.args,
        );

        Ok((coordinator, timing_rx))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
