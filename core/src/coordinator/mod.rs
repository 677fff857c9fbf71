//! Coordinator for run lifecycle management
//!
//! The Coordinator drives a complete load-generation run:
//! - Spawning the worker pool and releasing it through a shared start barrier
//! - Wiring the shared rate limiter, counters and timing channel
//! - Managing graceful shutdown via the broadcast signal
//! - Collecting per-worker statistics at the end of the run
//!
//! # Example
//!
//! ```ignore
//! use pummel_core::{CoordinatorBuilder, RunConfig};
//!
//! let (coordinator, timing_rx) = CoordinatorBuilder::new()
//!     .config(RunConfig::new(100, 8))
//!     .script(script)
//!     .build()?;
//!
//! let stats = coordinator.run_with_signal_handling().await?;
//! ```

mod aggregator;
mod builder;
mod executor;
mod reporter;

pub use aggregator::{aggregate_worker_stats, AggregatedStats};
pub use builder::CoordinatorBuilder;
pub use executor::Coordinator;
pub use reporter::ProgressReporter;

#[cfg(test)]
mod tests;
