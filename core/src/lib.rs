//! pummel-core: Engine for constant-rate HTTP load generation
//!
//! This crate provides everything behind the `pummel` binary:
//!
//! - A token-bucket rate limiter shared by the worker pool
//! - Worker and coordinator lifecycles (start barrier, graceful shutdown)
//! - The script boundary that builds requests and judges responses
//! - An HTTP transport with optional in-process DNS caching
//! - Timing collection and the end-of-run latency report
//!
//! # Example
//!
//! ```ignore
//! use pummel_core::{CoordinatorBuilder, DefaultScript, RunConfig};
//! use std::sync::Arc;
//!
//! let (coordinator, timing_rx) = CoordinatorBuilder::new()
//!     .config(RunConfig::new(100, 8))
//!     .script(Arc::new(DefaultScript::new("http://localhost:8080/")))
//!     .build()?;
//!
//! let stats = coordinator.run_with_signal_handling().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod dns;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod request;
pub mod response;
pub mod script;
pub mod shutdown;
pub mod transport;
pub mod worker;

pub use channel::ChannelConfig;
pub use config::{RunConfig, ScriptErrorPolicy, StopCondition};
pub use coordinator::{
    aggregate_worker_stats, AggregatedStats, Coordinator, CoordinatorBuilder, ProgressReporter,
};
pub use dns::DnsCache;
pub use error::{EngineError, EngineResult};
pub use limiter::{Admission, RateLimiter};
pub use metrics::{Counters, LatencySummary, RunReport, StatsCollector, TimingEvent};
pub use request::{HeaderValues, ScriptRequest};
pub use response::ResponseDescriptor;
pub use script::{
    DefaultScript, Scenario, ScenarioScript, ScriptBoundary, SerializedScript, WorkerState,
};
pub use shutdown::ShutdownSignal;
pub use transport::{HttpTransport, Transport};
pub use worker::{Worker, WorkerBuilder, WorkerStats};
