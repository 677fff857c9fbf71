//! Timing aggregation, counters and percentile reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

/// One measured request latency, emitted by a worker for aggregation
///
/// Events from different workers carry no ordering; the collected sequence is
/// an unordered multiset until the final sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimingEvent(pub Duration);

/// Process-wide run counters
///
/// Incremented concurrently by every worker and read concurrently by the
/// periodic reporter; plain atomic increments, no locks.
#[derive(Debug, Default)]
pub struct Counters {
    completed: AtomicU64,
    success: AtomicU64,
    error: AtomicU64,
}

impl Counters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully dispatched request (a timing event exists).
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one request the script judged successful.
    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed request (transport failure or script judgment).
    pub fn record_error(&self) {
        self.error.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests dispatched so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Requests judged successful so far.
    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    /// Requests failed so far.
    pub fn error(&self) -> u64 {
        self.error.load(Ordering::Relaxed)
    }
}

/// Single consumer draining the timing channel into an append-only sequence
///
/// The sequence is owned solely by this task, so the hot append path needs no
/// locking. The drain ends when every worker has dropped its sender, which
/// means a finishing worker can never deadlock on a full channel after
/// shutdown: the collector keeps receiving until the channel closes.
pub struct StatsCollector {
    rx: mpsc::Receiver<TimingEvent>,
    counters: Arc<Counters>,
}

impl StatsCollector {
    /// Create a collector for the given channel.
    pub fn new(rx: mpsc::Receiver<TimingEvent>, counters: Arc<Counters>) -> Self {
        Self { rx, counters }
    }

    /// Drain the channel to completion and return every collected latency.
    pub async fn run(mut self) -> Vec<Duration> {
        let mut timings = Vec::new();
        while let Some(event) = self.rx.recv().await {
            self.counters.record_completed();
            timings.push(event.0);
        }
        timings
    }
}

/// Latency percentiles over a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    /// 50th percentile (median)
    pub p50: Duration,
    /// 75th percentile
    pub p75: Duration,
    /// 90th percentile
    pub p90: Duration,
    /// 99th percentile
    pub p99: Duration,
    /// Maximum observed latency
    pub max: Duration,
}

impl LatencySummary {
    /// Compute exact percentiles from the collected latencies.
    ///
    /// Sorts ascending and reads percentile `p` at index `floor(p * N)`,
    /// clamped to the last element so p100 is the maximum. Returns `None`
    /// when no request completed, rather than indexing an empty sequence.
    pub fn from_timings(timings: &mut [Duration]) -> Option<Self> {
        if timings.is_empty() {
            return None;
        }

        timings.sort_unstable();

        Some(Self {
            p50: percentile(timings, 0.50),
            p75: percentile(timings, 0.75),
            p90: percentile(timings, 0.90),
            p99: percentile(timings, 0.99),
            max: timings[timings.len() - 1],
        })
    }
}

/// Read percentile `p` from an ascending-sorted slice at index `floor(p*N)`.
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Final statistics for a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Total requests dispatched (one per timing event)
    pub total_requests: usize,
    /// Requests that failed (transport or script judgment)
    pub errors: u64,
    /// Wall-clock run length
    pub elapsed: Duration,
    /// Achieved requests per second
    pub requests_per_second: f64,
    /// Latency percentiles; `None` when no request completed
    pub latency: Option<LatencySummary>,
}

impl RunReport {
    /// Build the final report from the collected latencies and counters.
    pub fn new(mut timings: Vec<Duration>, errors: u64, elapsed: Duration) -> Self {
        let total_requests = timings.len();
        let secs = elapsed.as_secs_f64();
        let requests_per_second = if secs > 0.0 {
            total_requests as f64 / secs
        } else {
            0.0
        };

        Self {
            total_requests,
            errors,
            elapsed,
            requests_per_second,
            latency: LatencySummary::from_timings(&mut timings),
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} requests in {}s",
            self.total_requests,
            self.elapsed.as_secs()
        )?;
        writeln!(f, "{} error(s)", self.errors)?;
        writeln!(f, "requests/sec: {:.2}", self.requests_per_second)?;
        writeln!(f, "latency distribution:")?;
        match &self.latency {
            Some(latency) => {
                writeln!(f, "   50% {:?}", latency.p50)?;
                writeln!(f, "   75% {:?}", latency.p75)?;
                writeln!(f, "   90% {:?}", latency.p90)?;
                writeln!(f, "   99% {:?}", latency.p99)?;
                writeln!(f, "  100% {:?}", latency.max)
            }
            None => writeln!(f, "  no data"),
        }
    }
}
