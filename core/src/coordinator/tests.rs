//! Tests for the Coordinator module

use super::builder::CoordinatorBuilder;
use crate::config::{RunConfig, StopCondition};
use crate::error::EngineError;
use crate::metrics::StatsCollector;
use crate::request::ScriptRequest;
use crate::response::ResponseDescriptor;
use crate::script::{ScriptBoundary, ScriptError, WorkerState};
use crate::transport::{Transport, TransportError};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Mock Transport
// ============================================================================

struct MockTransport {
    status: u16,
    delay: Option<Duration>,
    counter: AtomicUsize,
}

impl MockTransport {
    fn new(status: u16) -> Self {
        Self {
            status,
            delay: None,
            counter: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn perform(
        &self,
        _request: &ScriptRequest,
    ) -> Result<ResponseDescriptor, TransportError> {
        self.counter.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(ResponseDescriptor {
            status: self.status,
            headers: Default::default(),
            body: Vec::new(),
        })
    }
}

// ============================================================================
// Mock Scripts
// ============================================================================

struct MockScript;

impl ScriptBoundary for MockScript {
    fn name(&self) -> &str {
        "mock"
    }

    fn build_request(
        &self,
        _state: &mut WorkerState,
    ) -> Result<Option<ScriptRequest>, ScriptError> {
        Ok(Some(ScriptRequest::get("http://mock.invalid/")))
    }

    fn interpret_response(
        &self,
        response: &ResponseDescriptor,
        _state: &mut WorkerState,
    ) -> Result<bool, ScriptError> {
        Ok(response.is_success())
    }
}

struct BrokenScript;

impl ScriptBoundary for BrokenScript {
    fn name(&self) -> &str {
        "broken"
    }

    fn build_request(
        &self,
        _state: &mut WorkerState,
    ) -> Result<Option<ScriptRequest>, ScriptError> {
        Err(ScriptError::Eval("deliberately broken".into()))
    }

    fn interpret_response(
        &self,
        _response: &ResponseDescriptor,
        _state: &mut WorkerState,
    ) -> Result<bool, ScriptError> {
        Ok(true)
    }
}

// ============================================================================
// Builder tests
// ============================================================================

#[test]
fn test_builder_requires_a_script() {
    let result = CoordinatorBuilder::new().build();
    assert!(matches!(result, Err(EngineError::MissingField("script"))));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = CoordinatorBuilder::new()
        .rps(0)
        .script(Arc::new(MockScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build();
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[tokio::test]
async fn test_builder_wires_a_full_bucket() {
    let (coordinator, _timing_rx) = CoordinatorBuilder::new()
        .rps(5)
        .workers(1)
        .script(Arc::new(MockScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build()
        .unwrap();

    // All five admissions of the first second are available up front.
    assert!((coordinator.limiter.remaining() - 5.0).abs() < 0.1);
}

// ============================================================================
// Run tests
// ============================================================================

#[tokio::test]
async fn test_duration_run_collects_worker_stats() {
    let config = RunConfig::new(50, 4)
        .with_stop_condition(StopCondition::Duration(Duration::from_millis(500)));

    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .config(config)
        .script(Arc::new(MockScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build()
        .unwrap();

    let counters = coordinator.counters();
    let collector = StatsCollector::new(timing_rx, Arc::clone(&counters));
    let collector_handle = tokio::spawn(collector.run());

    let results = coordinator.run().await.unwrap();
    assert_eq!(results.len(), 4);

    let completed: usize = results.iter().map(|s| s.completed).sum();
    let errors: usize = results.iter().map(|s| s.errors).sum();
    assert_eq!(errors, 0);
    // Full bucket of 50 up front plus roughly 25 refilled over half a
    // second, ~75 total; the window allows scheduler jitter at the 500ms
    // scale but catches a pool-level admission regression.
    assert!(completed >= 55, "completed {completed}");
    assert!(completed <= 95, "completed {completed}");

    // Every dispatched request produced exactly one timing sample, and
    // nothing was lost to shutdown ordering.
    let timings = collector_handle.await.unwrap();
    assert_eq!(timings.len(), completed);
    assert_eq!(counters.completed() as usize, completed);
}

#[tokio::test]
async fn test_pool_of_four_tracks_a_ten_rps_budget() {
    // Four workers against a 10 rps budget for five seconds: the opening
    // bucket of 10 plus 50 refilled units, ~60 total. A limiter regression
    // at the pool level lands well outside +/-20% of that.
    let config = RunConfig::new(10, 4)
        .with_stop_condition(StopCondition::Duration(Duration::from_secs(5)));

    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .config(config)
        .script(Arc::new(MockScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build()
        .unwrap();
    drop(timing_rx);

    let results = coordinator.run().await.unwrap();
    assert_eq!(results.len(), 4);

    let completed: usize = results.iter().map(|s| s.completed).sum();
    let errors: usize = results.iter().map(|s| s.errors).sum();
    assert_eq!(errors, 0);
    assert!(completed >= 48, "completed {completed}");
    assert!(completed <= 72, "completed {completed}");
}

#[tokio::test]
async fn test_external_trigger_stops_an_indefinite_run() {
    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .rps(20)
        .workers(2)
        .script(Arc::new(MockScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build()
        .unwrap();

    let shutdown = coordinator.shutdown_signal();
    let counters = coordinator.counters();
    let collector_handle = tokio::spawn(StatsCollector::new(timing_rx, counters).run());

    let run_handle = tokio::spawn(coordinator.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.trigger();

    let results = tokio::time::timeout(Duration::from_secs(2), run_handle)
        .await
        .expect("run did not stop after trigger")
        .unwrap()
        .unwrap();
    assert_eq!(results.len(), 2);

    collector_handle.await.unwrap();
}

#[tokio::test]
async fn test_fatal_script_error_fails_the_run() {
    let config = RunConfig::new(10, 2)
        .with_stop_condition(StopCondition::Duration(Duration::from_secs(5)));

    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .config(config)
        .script(Arc::new(BrokenScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build()
        .unwrap();
    drop(timing_rx);

    let started = std::time::Instant::now();
    let result = coordinator.run().await;
    assert!(matches!(result, Err(EngineError::Worker { .. })));
    // The failing worker stops the run well before the duration timer.
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_slow_responses_survive_shutdown() {
    // Workers finish their in-flight request after the trigger; the stats
    // collector still sees every sample.
    let config = RunConfig::new(10, 2)
        .with_stop_condition(StopCondition::Duration(Duration::from_millis(100)));

    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .config(config)
        .script(Arc::new(MockScript))
        .transport(Arc::new(
            MockTransport::new(200).with_delay(Duration::from_millis(150)),
        ))
        .build()
        .unwrap();

    let counters = coordinator.counters();
    let collector_handle = tokio::spawn(StatsCollector::new(timing_rx, Arc::clone(&counters)).run());

    let results = coordinator.run().await.unwrap();
    let completed: usize = results.iter().map(|s| s.completed).sum();
    assert!(completed > 0);

    let timings = collector_handle.await.unwrap();
    assert_eq!(timings.len(), completed);
    assert!(timings.iter().all(|t| *t >= Duration::from_millis(150)));
}

#[tokio::test]
async fn test_worker_pool_is_clamped_to_the_rate() {
    let config = RunConfig::new(2, 100)
        .with_stop_condition(StopCondition::Duration(Duration::from_millis(100)));

    let (coordinator, timing_rx) = CoordinatorBuilder::new()
        .config(config)
        .script(Arc::new(MockScript))
        .transport(Arc::new(MockTransport::new(200)))
        .build()
        .unwrap();
    drop(timing_rx);

    let results = coordinator.run().await.unwrap();
    assert_eq!(results.len(), 2);
}
