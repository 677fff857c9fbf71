//! Coordinator execution logic

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Barrier};

use crate::config::{RunConfig, StopCondition};
use crate::error::{EngineError, EngineResult};
use crate::limiter::RateLimiter;
use crate::metrics::{Counters, TimingEvent};
use crate::script::ScriptBoundary;
use crate::shutdown::ShutdownSignal;
use crate::transport::Transport;
use crate::worker::{WorkerBuilder, WorkerStats};

use super::aggregator::aggregate_worker_stats;

/// Coordinator manages the run lifecycle
///
/// Responsible for spawning the worker pool, arming the stop condition,
/// coordinating shutdown, and collecting results.
pub struct Coordinator {
    /// Run configuration
    pub(crate) config: RunConfig,

    /// Script boundary (shared across workers)
    pub(crate) script: Arc<dyn ScriptBoundary>,

    /// Transport (shared across workers)
    pub(crate) transport: Arc<dyn Transport>,

    /// Rate limiter shared by the whole pool
    pub(crate) limiter: Arc<RateLimiter>,

    /// Live counters shared with the progress reporter
    pub(crate) counters: Arc<Counters>,

    /// Shutdown signal
    pub(crate) shutdown: ShutdownSignal,

    /// Timing sender (cloned for each worker, dropped after spawn)
    pub(crate) timing_tx: mpsc::Sender<TimingEvent>,

    /// Positional arguments forwarded to the script
    pub(crate) args: Vec<String>,
}

impl Coordinator {
    /// Create a new coordinator
    ///
    /// Use `CoordinatorBuilder` for a more ergonomic construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunConfig,
        script: Arc<dyn ScriptBoundary>,
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        counters: Arc<Counters>,
        shutdown: ShutdownSignal,
        timing_tx: mpsc::Sender<TimingEvent>,
        args: Vec<String>,
    ) -> Self {
        Self {
            config,
            script,
            transport,
            limiter,
            counters,
            shutdown,
            timing_tx,
            args,
        }
    }

    /// Get the shutdown signal shared by the whole run.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Get the live counters shared by the whole run.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    /// Get the run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run until the stop condition fires or shutdown is triggered
    ///
    /// Spawns the worker pool, waits for every worker to finish, and returns
    /// their individual stats. A worker aborting the run (fatal script error,
    /// failed bootstrap) propagates as the run's error after every other
    /// worker has drained out.
    pub async fn run(self) -> EngineResult<Vec<WorkerStats>> {
        let Coordinator {
            config,
            script,
            transport,
            limiter,
            counters,
            shutdown,
            timing_tx,
            args,
        } = self;

        let start = Instant::now();
        let pool_size = config.effective_workers();
        let start_barrier = Arc::new(Barrier::new(pool_size));

        tracing::info!(
            rps = config.rps,
            workers = pool_size,
            stop_condition = ?config.stop_condition,
            "starting run"
        );

        let mut handles = Vec::with_capacity(pool_size);
        for worker_id in 0..pool_size {
            let worker = WorkerBuilder::new(worker_id)
                .script(Arc::clone(&script))
                .transport(Arc::clone(&transport))
                .limiter(Arc::clone(&limiter))
                .counters(Arc::clone(&counters))
                .timing_tx(timing_tx.clone())
                .start_barrier(Arc::clone(&start_barrier))
                .shutdown(shutdown.clone())
                .args(args.clone())
                .error_policy(config.script_error_policy)
                .build()?;

            handles.push(tokio::spawn(worker.run()));
        }

        // Workers hold the only remaining senders; once they all exit, the
        // stats collector's receiver closes and it drains out.
        drop(timing_tx);

        // Arm the stop condition.
        let timer_handle = match config.stop_condition {
            StopCondition::Duration(duration) => {
                let shutdown = shutdown.clone();
                Some(tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    tracing::info!(?duration, "run duration elapsed, stopping");
                    shutdown.trigger();
                }))
            }
            StopCondition::Indefinite => None,
        };

        // Wait for all workers to complete.
        let mut results = Vec::with_capacity(pool_size);
        let mut first_error = None;
        let mut failures = 0;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(stats)) => {
                    tracing::debug!(
                        worker_id,
                        completed = stats.completed,
                        errors = stats.errors,
                        "worker completed"
                    );
                    results.push(stats);
                }
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!(worker_id, error = %e, "worker aborted the run");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(worker_id, error = %e, "worker task panicked");
                }
            }
        }

        if let Some(handle) = timer_handle {
            handle.abort();
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if results.is_empty() && failures > 0 {
            return Err(EngineError::coordination(format!(
                "all {failures} workers failed to complete"
            )));
        }

        let elapsed = start.elapsed();
        let aggregated = aggregate_worker_stats(&results);
        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            total_completed = aggregated.total_completed,
            total_errors = aggregated.total_errors,
            rps = aggregated.requests_per_second,
            "run completed"
        );

        Ok(results)
    }

    /// Run with Ctrl+C signal handling
    ///
    /// An interrupt triggers graceful shutdown; workers finish their
    /// in-flight request and the collected stats survive.
    pub async fn run_with_signal_handling(self) -> EngineResult<Vec<WorkerStats>> {
        let shutdown = self.shutdown.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received interrupt, stopping the run");
                    shutdown.trigger();
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to listen for interrupt");
                }
            }
        });

        let result = self.run().await;

        signal_handle.abort();

        result
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("script", &self.script.name())
            .finish()
    }
}
