//! Worker pool execution units
//!
//! The Worker is the core execution unit of the engine, driving the loop:
//! **admit -> build -> perform -> measure -> judge -> repeat**.
//!
//! Each worker is an independent tokio task sharing four services with the
//! rest of the pool, all passed in at construction: the rate limiter, the
//! counters, the timing-event channel and the shutdown signal. The only
//! per-worker mutable state is the opaque `WorkerState` handed to the script
//! boundary, so workers never contend with each other outside those shared
//! services.
//!
//! # Example
//!
//! ```ignore
//! use pummel_core::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(0)
//!     .script(script)
//!     .transport(transport)
//!     .limiter(limiter)
//!     .counters(counters)
//!     .timing_tx(tx)
//!     .start_barrier(barrier)
//!     .shutdown(shutdown)
//!     .build()?;
//!
//! let stats = worker.run().await?;
//! println!("judged successful: {}", stats.completed);
//! ```

mod builder;
mod executor;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use stats::WorkerStats;
