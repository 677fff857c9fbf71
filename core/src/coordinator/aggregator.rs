//! Result aggregation from multiple workers

use std::time::Duration;

use crate::worker::WorkerStats;

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    /// Number of workers that completed
    pub total_workers: usize,

    /// Total successful requests
    pub total_completed: usize,

    /// Total failed requests
    pub total_errors: usize,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Overall requests per second
    pub requests_per_second: f64,
}

impl AggregatedStats {
    /// Get the total number of requests (completed + errors)
    pub fn total_requests(&self) -> usize {
        self.total_completed + self.total_errors
    }

    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total > 0 {
            self.total_completed as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Get the error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let total_completed: usize = stats.iter().map(|s| s.completed).sum();
    let total_errors: usize = stats.iter().map(|s| s.errors).sum();

    // Use the maximum elapsed time across all workers.
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let requests_per_second = if secs > 0.0 {
        (total_completed + total_errors) as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_workers: stats.len(),
        total_completed,
        total_errors,
        total_duration,
        requests_per_second,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with(completed: usize, errors: usize) -> WorkerStats {
        let mut stats = WorkerStats::new();
        stats.completed = completed;
        stats.errors = errors;
        stats
    }

    #[test]
    fn test_aggregate_empty() {
        let aggregated = aggregate_worker_stats(&[]);
        assert_eq!(aggregated.total_workers, 0);
        assert_eq!(aggregated.total_requests(), 0);
        assert_eq!(aggregated.success_rate(), 0.0);
    }

    #[test]
    fn test_aggregate_sums_across_workers() {
        let stats = vec![stats_with(10, 2), stats_with(5, 0), stats_with(0, 3)];
        let aggregated = aggregate_worker_stats(&stats);

        assert_eq!(aggregated.total_workers, 3);
        assert_eq!(aggregated.total_completed, 15);
        assert_eq!(aggregated.total_errors, 5);
        assert_eq!(aggregated.total_requests(), 20);
        assert!((aggregated.success_rate() - 0.75).abs() < 0.001);
        assert!((aggregated.error_rate() - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_aggregate_duration_is_pool_maximum() {
        let mut fast = stats_with(1, 0);
        fast.start();
        fast.stop();

        let mut slow = stats_with(1, 0);
        slow.start();
        std::thread::sleep(Duration::from_millis(20));
        slow.stop();

        let aggregated = aggregate_worker_stats(&[fast, slow]);
        assert!(aggregated.total_duration >= Duration::from_millis(20));
        assert!(aggregated.requests_per_second > 0.0);
    }
}
