//! Builder pattern for Worker construction

use crate::config::ScriptErrorPolicy;
use crate::error::{EngineError, EngineResult};
use crate::limiter::RateLimiter;
use crate::metrics::{Counters, TimingEvent};
use crate::script::ScriptBoundary;
use crate::shutdown::ShutdownSignal;
use crate::transport::Transport;

use super::executor::Worker;

use std::sync::Arc;
use tokio::sync::{mpsc, Barrier};

/// Builder for creating Worker instances
///
/// Every shared service (limiter, counters, timing channel, barrier,
/// shutdown signal) is constructed by the coordinator and handed in here;
/// workers never reach for ambient state.
pub struct WorkerBuilder {
    id: usize,
    script: Option<Arc<dyn ScriptBoundary>>,
    transport: Option<Arc<dyn Transport>>,
    limiter: Option<Arc<RateLimiter>>,
    counters: Option<Arc<Counters>>,
    timing_tx: Option<mpsc::Sender<TimingEvent>>,
    start_barrier: Option<Arc<Barrier>>,
    shutdown: Option<ShutdownSignal>,
    args: Vec<String>,
    error_policy: ScriptErrorPolicy,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            script: None,
            transport: None,
            limiter: None,
            counters: None,
            timing_tx: None,
            start_barrier: None,
            shutdown: None,
            args: Vec::new(),
            error_policy: ScriptErrorPolicy::default(),
        }
    }

    /// Set the script boundary.
    pub fn script(mut self, script: Arc<dyn ScriptBoundary>) -> Self {
        self.script = Some(script);
        self
    }

    /// Set the transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the shared rate limiter.
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Set the shared counters.
    pub fn counters(mut self, counters: Arc<Counters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Set the timing-event channel sender.
    pub fn timing_tx(mut self, tx: mpsc::Sender<TimingEvent>) -> Self {
        self.timing_tx = Some(tx);
        self
    }

    /// Set the pool-wide start barrier.
    pub fn start_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.start_barrier = Some(barrier);
        self
    }

    /// Set the shutdown signal.
    pub fn shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Set the positional arguments forwarded to the script.
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the script error policy.
    pub fn error_policy(mut self, policy: ScriptErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Build the Worker.
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> EngineResult<Worker> {
        let script = self.script.ok_or(EngineError::MissingField("script"))?;
        let transport = self
            .transport
            .ok_or(EngineError::MissingField("transport"))?;
        let limiter = self.limiter.ok_or(EngineError::MissingField("limiter"))?;
        let counters = self.counters.ok_or(EngineError::MissingField("counters"))?;
        let timing_tx = self
            .timing_tx
            .ok_or(EngineError::MissingField("timing_tx"))?;
        let start_barrier = self
            .start_barrier
            .ok_or(EngineError::MissingField("start_barrier"))?;
        let shutdown = self.shutdown.ok_or(EngineError::MissingField("shutdown"))?;

        Ok(Worker::new(
            self.id,
            script,
            transport,
            limiter,
            counters,
            timing_tx,
            start_barrier,
            shutdown,
            self.args,
            self.error_policy,
        ))
    }
}
