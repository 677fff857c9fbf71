//! Script boundary: the pluggable contract for producing requests and
//! judging responses
//!
//! The engine is policy-agnostic; everything about *what* to request and
//! *what counts as success* flows through [`ScriptBoundary`]. Cross-call
//! memory lives in the per-worker [`WorkerState`], never in globals, so
//! workers stay independent.
//!
//! Two implementations ship with the engine: [`DefaultScript`] (a single GET,
//! used when no script is configured) and [`ScenarioScript`] (a declarative
//! JSON scenario file). A real scripting runtime plugs in at the same trait.

use crate::request::{HeaderValues, ScriptRequest};
use crate::response::ResponseDescriptor;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

/// Script boundary errors
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script could not be loaded or is structurally invalid
    #[error("failed to load script: {0}")]
    Load(String),

    /// A script call failed at run time
    #[error("script evaluation failed: {0}")]
    Eval(String),

    /// The script produced a request the engine cannot dispatch
    #[error("script returned an invalid request: {0}")]
    InvalidRequest(String),
}

/// Opaque per-worker context handed to every script call
///
/// Owned by exactly one worker; the script layer may stash counters, cookies
/// or any other cross-call state here without sharing anything across
/// workers.
#[derive(Debug)]
pub struct WorkerState {
    worker_id: usize,
    args: Vec<String>,
    iterations: u64,
    vars: HashMap<String, serde_json::Value>,
}

impl WorkerState {
    /// Create state for one worker, carrying the forwarded CLI arguments.
    pub fn new(worker_id: usize, args: Vec<String>) -> Self {
        Self {
            worker_id,
            args,
            iterations: 0,
            vars: HashMap::new(),
        }
    }

    /// Identifier of the owning worker.
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Positional arguments forwarded from the command line, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of requests this worker has dispatched.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Read a script variable.
    pub fn var(&self, key: &str) -> Option<&serde_json::Value> {
        self.vars.get(key)
    }

    /// Write a script variable.
    pub fn set_var(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.vars.insert(key.into(), value);
    }

    pub(crate) fn record_iteration(&mut self) {
        self.iterations += 1;
    }
}

/// Contract between the engine and external request/response logic
///
/// `build_request` and `interpret_response` are invoked with no network I/O
/// in progress, and must confine all cross-call memory to the given
/// [`WorkerState`].
pub trait ScriptBoundary: Send + Sync {
    /// Script name for identification.
    fn name(&self) -> &str;

    /// One-time per-worker bootstrap, run before the start barrier releases.
    fn on_worker_start(&self, _state: &mut WorkerState) -> Result<(), ScriptError> {
        Ok(())
    }

    /// Produce the next request, or `None` to signal "nothing to do" (the
    /// worker returns to waiting without counting an iteration).
    fn build_request(&self, state: &mut WorkerState)
        -> Result<Option<ScriptRequest>, ScriptError>;

    /// Judge a completed response; `true` marks it successful.
    fn interpret_response(
        &self,
        response: &ResponseDescriptor,
        state: &mut WorkerState,
    ) -> Result<bool, ScriptError>;
}

/// Wrapper serializing every boundary call through one mutex
///
/// For script runtimes that are not safe for concurrent reentry. The lock is
/// scoped to the call itself and released before any network I/O, so request
/// dispatch stays fully concurrent while script evaluation is serialized.
pub struct SerializedScript<S> {
    inner: S,
    gate: Mutex<()>,
}

impl<S: ScriptBoundary> SerializedScript<S> {
    /// Wrap a boundary implementation.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
        }
    }

    fn enter(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.gate.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<S: ScriptBoundary> ScriptBoundary for SerializedScript<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn on_worker_start(&self, state: &mut WorkerState) -> Result<(), ScriptError> {
        let _gate = self.enter();
        self.inner.on_worker_start(state)
    }

    fn build_request(
        &self,
        state: &mut WorkerState,
    ) -> Result<Option<ScriptRequest>, ScriptError> {
        let _gate = self.enter();
        self.inner.build_request(state)
    }

    fn interpret_response(
        &self,
        response: &ResponseDescriptor,
        state: &mut WorkerState,
    ) -> Result<bool, ScriptError> {
        let _gate = self.enter();
        self.inner.interpret_response(response, state)
    }
}

/// Built-in boundary used when no script is configured: a single GET against
/// one URL, judged by HTTP status.
pub struct DefaultScript {
    url: String,
}

impl DefaultScript {
    /// Target the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ScriptBoundary for DefaultScript {
    fn name(&self) -> &str {
        "default"
    }

    fn build_request(
        &self,
        _state: &mut WorkerState,
    ) -> Result<Option<ScriptRequest>, ScriptError> {
        Ok(Some(ScriptRequest::get(&self.url)))
    }

    fn interpret_response(
        &self,
        response: &ResponseDescriptor,
        _state: &mut WorkerState,
    ) -> Result<bool, ScriptError> {
        Ok(response.is_success())
    }
}

/// Declarative request scenario, loadable from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// HTTP method (defaults to GET)
    #[serde(default = "default_method")]
    pub method: String,

    /// Target URL
    pub url: String,

    /// Headers to send with every request
    #[serde(default)]
    pub headers: HashMap<String, HeaderValues>,

    /// Optional request body
    #[serde(default)]
    pub body: Option<String>,

    /// Exact status code counted as success (default: any 2xx)
    #[serde(default)]
    pub expect_status: Option<u16>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Boundary driven by a [`Scenario`] template
pub struct ScenarioScript {
    name: String,
    scenario: Scenario,
}

impl ScenarioScript {
    /// Use an in-memory scenario.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            name: "scenario".to_string(),
            scenario,
        }
    }

    /// Load a scenario from a JSON file. Failures here are configuration
    /// errors and abort the run before any worker starts.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScriptError::Load(format!("{}: {}", path.display(), e)))?;
        let scenario: Scenario = serde_json::from_str(&raw)
            .map_err(|e| ScriptError::Load(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            name: path.display().to_string(),
            scenario,
        })
    }
}

impl ScriptBoundary for ScenarioScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_request(
        &self,
        _state: &mut WorkerState,
    ) -> Result<Option<ScriptRequest>, ScriptError> {
        Ok(Some(ScriptRequest {
            method: self.scenario.method.clone(),
            url: self.scenario.url.clone(),
            headers: self.scenario.headers.clone(),
            body: self.scenario.body.as_ref().map(|b| b.clone().into_bytes()),
        }))
    }

    fn interpret_response(
        &self,
        response: &ResponseDescriptor,
        _state: &mut WorkerState,
    ) -> Result<bool, ScriptError> {
        Ok(match self.scenario.expect_status {
            Some(expected) => response.status == expected,
            None => response.is_success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_state_is_per_worker() {
        let mut state = WorkerState::new(3, vec!["http://example.com".into()]);
        assert_eq!(state.worker_id(), 3);
        assert_eq!(state.args(), ["http://example.com".to_string()]);
        assert_eq!(state.iterations(), 0);

        state.set_var("cookie", serde_json::json!("abc"));
        assert_eq!(state.var("cookie"), Some(&serde_json::json!("abc")));
        assert!(state.var("missing").is_none());
    }

    #[test]
    fn test_default_script_builds_get() {
        let script = DefaultScript::new("http://example.com/ping");
        let mut state = WorkerState::new(0, Vec::new());

        let req = script.build_request(&mut state).unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "http://example.com/ping");
    }

    #[test]
    fn test_default_script_judges_by_status() {
        let script = DefaultScript::new("http://example.com/");
        let mut state = WorkerState::new(0, Vec::new());

        let ok = ResponseDescriptor {
            status: 204,
            ..Default::default()
        };
        let bad = ResponseDescriptor {
            status: 500,
            ..Default::default()
        };

        assert!(script.interpret_response(&ok, &mut state).unwrap());
        assert!(!script.interpret_response(&bad, &mut state).unwrap());
    }

    #[test]
    fn test_serialized_script_delegates() {
        let script = SerializedScript::new(DefaultScript::new("http://example.com/"));
        let mut state = WorkerState::new(0, Vec::new());

        assert_eq!(script.name(), "default");
        script.on_worker_start(&mut state).unwrap();
        assert!(script.build_request(&mut state).unwrap().is_some());
    }

    #[test]
    fn test_serialized_script_excludes_concurrent_callers() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        // A runtime that is not safe for concurrent reentry: entering a call
        // while another is in progress is the failure being guarded against.
        struct NonReentrant {
            busy: AtomicBool,
        }

        impl ScriptBoundary for NonReentrant {
            fn name(&self) -> &str {
                "non-reentrant"
            }

            fn build_request(
                &self,
                _state: &mut WorkerState,
            ) -> Result<Option<ScriptRequest>, ScriptError> {
                assert!(
                    !self.busy.swap(true, Ordering::SeqCst),
                    "boundary entered concurrently"
                );
                std::thread::sleep(std::time::Duration::from_millis(1));
                self.busy.store(false, Ordering::SeqCst);
                Ok(Some(ScriptRequest::get("http://example.com/")))
            }

            fn interpret_response(
                &self,
                _response: &ResponseDescriptor,
                _state: &mut WorkerState,
            ) -> Result<bool, ScriptError> {
                Ok(true)
            }
        }

        let script = Arc::new(SerializedScript::new(NonReentrant {
            busy: AtomicBool::new(false),
        }));

        let handles: Vec<_> = (0..4)
            .map(|worker_id| {
                let script = Arc::clone(&script);
                std::thread::spawn(move || {
                    let mut state = WorkerState::new(worker_id, Vec::new());
                    for _ in 0..20 {
                        script.build_request(&mut state).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_scenario_defaults() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"url": "http://example.com/"}"#).unwrap();
        assert_eq!(scenario.method, "GET");
        assert!(scenario.headers.is_empty());
        assert!(scenario.body.is_none());
        assert!(scenario.expect_status.is_none());
    }

    #[test]
    fn test_scenario_script_expected_status() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"method": "POST", "url": "http://example.com/submit",
                "headers": {"content-type": "application/json"},
                "body": "{}", "expect_status": 201}"#,
        )
        .unwrap();
        let script = ScenarioScript::new(scenario);
        let mut state = WorkerState::new(0, Vec::new());

        let req = script.build_request(&mut state).unwrap().unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.body.as_deref(), Some(b"{}".as_slice()));

        let created = ResponseDescriptor {
            status: 201,
            ..Default::default()
        };
        let ok_but_wrong = ResponseDescriptor {
            status: 200,
            ..Default::default()
        };
        assert!(script.interpret_response(&created, &mut state).unwrap());
        assert!(!script.interpret_response(&ok_but_wrong, &mut state).unwrap());
    }

    #[test]
    fn test_scenario_script_from_file() {
        let path = std::env::temp_dir().join(format!(
            "pummel-scenario-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"url": "http://example.com/"}"#).unwrap();

        let script = ScenarioScript::from_file(&path).unwrap();
        let mut state = WorkerState::new(0, Vec::new());
        let req = script.build_request(&mut state).unwrap().unwrap();
        assert_eq!(req.url, "http://example.com/");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_scenario_script_load_errors_are_reported() {
        assert!(matches!(
            ScenarioScript::from_file("/nonexistent/script.json"),
            Err(ScriptError::Load(_))
        ));

        let path = std::env::temp_dir().join(format!(
            "pummel-broken-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ScenarioScript::from_file(&path),
            Err(ScriptError::Load(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
