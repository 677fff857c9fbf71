//! Worker execution loop

use crate::config::ScriptErrorPolicy;
use crate::error::{EngineError, EngineResult};
use crate::limiter::{Admission, RateLimiter};
use crate::metrics::{Counters, TimingEvent};
use crate::script::{ScriptBoundary, ScriptError, WorkerState};
use crate::shutdown::ShutdownSignal;
use crate::transport::Transport;

use super::stats::WorkerStats;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, Barrier};

/// Lifecycle phase of a worker between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Repeatedly asking the rate limiter for admission.
    Waiting,
    /// Admitted; building and performing one request.
    Dispatching,
    /// Shutdown observed; the worker is done.
    Stopped,
}

/// One independent execution unit of the pool
///
/// A worker loops: ask the shared rate limiter for admission; when denied,
/// sleep for the suggested duration (waking early on shutdown); when granted,
/// have the script build a request, perform it through the transport, emit a
/// timing event and have the script judge the response. Transport failures
/// fail the one request and never terminate the worker.
pub struct Worker {
    id: usize,
    script: Arc<dyn ScriptBoundary>,
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    counters: Arc<Counters>,
    timing_tx: mpsc::Sender<TimingEvent>,
    start_barrier: Arc<Barrier>,
    shutdown: ShutdownSignal,
    shutdown_rx: broadcast::Receiver<()>,
    args: Vec<String>,
    error_policy: ScriptErrorPolicy,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        id: usize,
        script: Arc<dyn ScriptBoundary>,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        counters: Arc<Counters>,
        timing_tx: mpsc::Sender<TimingEvent>,
        start_barrier: Arc<Barrier>,
        shutdown: ShutdownSignal,
        args: Vec<String>,
        error_policy: ScriptErrorPolicy,
    ) -> Self {
        // Subscribe at construction so a trigger racing the spawn is not
        // missed.
        let shutdown_rx = shutdown.subscribe();
        Self {
            id,
            script,
            transport,
            limiter,
            counters,
            timing_tx,
            start_barrier,
            shutdown,
            shutdown_rx,
            args,
            error_policy,
        }
    }

    /// Get the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Run the worker to completion.
    ///
    /// Initializes per-worker state, blocks on the start barrier shared by
    /// the whole pool (the barrier leader restarts the limiter clock so
    /// admission begins only once every worker is ready), then loops until
    /// shutdown. Returns the worker's stats, or the error that made this
    /// worker abort the run.
    pub async fn run(mut self) -> EngineResult<WorkerStats> {
        let mut stats = WorkerStats::new();
        let mut state = WorkerState::new(self.id, self.args.clone());

        // Initializing: script bootstrap, then wait for the whole pool. A
        // bootstrap failure anywhere must release the other workers, so they
        // race the barrier against the shutdown signal.
        if let Err(e) = self.script.on_worker_start(&mut state) {
            self.shutdown.trigger();
            return Err(EngineError::worker(self.id, e.to_string()));
        }

        tokio::select! {
            result = self.start_barrier.wait() => {
                if result.is_leader() {
                    self.limiter.restart();
                }
            }
            _ = self.shutdown_rx.recv() => {
                tracing::debug!(worker_id = self.id, "shutdown before start barrier released");
                return Ok(stats);
            }
        }

        stats.start();
        tracing::debug!(worker_id = self.id, "worker started");

        let mut phase = Phase::Waiting;
        loop {
            phase = match phase {
                Phase::Waiting => self.wait_for_admission().await,
                Phase::Dispatching => {
                    match self.dispatch(&mut state, &mut stats).await {
                        Ok(()) => Phase::Waiting,
                        Err(e) => {
                            // Fatal script policy: take the whole run down.
                            self.shutdown.trigger();
                            stats.stop();
                            return Err(e);
                        }
                    }
                }
                Phase::Stopped => break,
            };
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            completed = stats.completed,
            errors = stats.errors,
            "worker finished"
        );

        Ok(stats)
    }

    /// One admission attempt. Shutdown wins every race: against a pending
    /// grant and against the denial sleep.
    async fn wait_for_admission(&mut self) -> Phase {
        match self.shutdown_rx.try_recv() {
            Err(broadcast::error::TryRecvError::Empty) => {}
            _ => return Phase::Stopped,
        }

        match self.limiter.admit() {
            Admission::Granted => Phase::Dispatching,
            Admission::Denied { retry_after } => {
                tokio::select! {
                    biased;

                    _ = self.shutdown_rx.recv() => Phase::Stopped,
                    _ = tokio::time::sleep(retry_after) => Phase::Waiting,
                }
            }
        }
    }

    /// Build, perform and judge one request.
    async fn dispatch(
        &self,
        state: &mut WorkerState,
        stats: &mut WorkerStats,
    ) -> EngineResult<()> {
        let request = match self.script.build_request(state) {
            Ok(Some(request)) => request,
            // Nothing to do: back to waiting without counting an iteration.
            Ok(None) => return Ok(()),
            Err(e) => return self.script_failure(stats, e),
        };

        let started = Instant::now();
        let response = match self.transport.perform(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.counters.record_error();
                stats.record_error();
                tracing::warn!(worker_id = self.id, error = %e, "request failed");
                return Ok(());
            }
        };
        let elapsed = started.elapsed();

        state.record_iteration();

        // The measurement exists once the transport returned; a send failure
        // only means the collector is gone, which cannot happen before every
        // worker sender has dropped.
        let _ = self.timing_tx.send(TimingEvent(elapsed)).await;

        match self.script.interpret_response(&response, state) {
            Ok(true) => {
                self.counters.record_success();
                stats.record_success();
            }
            Ok(false) => {
                self.counters.record_error();
                stats.record_error();
            }
            Err(e) => return self.script_failure(stats, e),
        }

        Ok(())
    }

    fn script_failure(&self, stats: &mut WorkerStats, err: ScriptError) -> EngineResult<()> {
        match self.error_policy {
            ScriptErrorPolicy::CountAsError => {
                self.counters.record_error();
                stats.record_error();
                tracing::warn!(worker_id = self.id, error = %err, "script call failed");
                Ok(())
            }
            ScriptErrorPolicy::Fatal => Err(EngineError::worker(self.id, err.to_string())),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("script", &self.script.name())
            .field("error_policy", &self.error_policy)
            .finish()
    }
}
