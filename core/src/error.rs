//! Error types for pummel-core

use thiserror::Error;

/// Engine-level error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Script boundary failure escalated to the whole run
    #[error("script error: {0}")]
    Script(#[from] crate::script::ScriptError),

    /// Transport construction failure
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// A worker terminated abnormally
    #[error("worker {worker_id} failed: {message}")]
    Worker {
        /// Identifier of the failing worker
        worker_id: usize,
        /// Failure description
        message: String,
    },

    /// Run coordination failure (spawn/join)
    #[error("coordination error: {0}")]
    Coordination(String),

    /// A required builder field was not set
    #[error("missing builder field: {0}")]
    MissingField(&'static str),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Construct a worker failure error.
    pub fn worker(worker_id: usize, message: impl Into<String>) -> Self {
        EngineError::Worker {
            worker_id,
            message: message.into(),
        }
    }

    /// Construct a coordination error.
    pub fn coordination(message: impl Into<String>) -> Self {
        EngineError::Coordination(message.into())
    }
}

/// Result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;
