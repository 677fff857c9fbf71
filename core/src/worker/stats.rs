//! Per-worker statistics tracking

use std::time::Instant;

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Requests the script judged successful
    pub completed: usize,

    /// Failed requests (transport failures and negative script judgments)
    pub errors: usize,

    /// Worker start time (after the start barrier released)
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time).
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time).
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Total number of judged requests (completed + errors).
    pub fn total_requests(&self) -> usize {
        self.completed + self.errors
    }

    /// Success rate in 0.0 - 1.0.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests() == 0 {
            0.0
        } else {
            self.completed as f64 / self.total_requests() as f64
        }
    }

    /// Elapsed time since start, up to the recorded end.
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Requests per second over the worker's lifetime.
    pub fn requests_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.total_requests() as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Record a successful request.
    pub fn record_success(&mut self) {
        self.completed += 1;
    }

    /// Record a failed request.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Merge stats from another worker.
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.errors += other.errors;
    }
}
