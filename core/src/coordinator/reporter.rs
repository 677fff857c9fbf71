//! Once-a-second progress output for interactive runs

use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Counters;
use crate::shutdown::ShutdownSignal;

/// Prints the per-second request count while the run is live
///
/// Reads the shared counters once a second and prints the delta, so the
/// output tracks the achieved rate rather than a cumulative total. Exits
/// when shutdown triggers; the final summary is printed elsewhere.
pub struct ProgressReporter {
    counters: Arc<Counters>,
    shutdown: ShutdownSignal,
    interval: Duration,
}

impl ProgressReporter {
    /// Create a reporter over the run's shared counters.
    pub fn new(counters: Arc<Counters>, shutdown: ShutdownSignal) -> Self {
        Self {
            counters,
            shutdown,
            interval: Duration::from_secs(1),
        }
    }

    /// Override the reporting interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Tick until shutdown.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately; consume it so the first
        // printed line covers a full interval.
        ticker.tick().await;

        let mut last = 0u64;
        let mut seconds = 0u64;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    seconds += self.interval.as_secs();
                    let total = self.counters.completed();
                    println!("{:>5}s: {} requests", seconds, total - last);
                    last = total;
                }
            }
        }
    }
}
