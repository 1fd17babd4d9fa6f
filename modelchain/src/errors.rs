//! Error types for the modelchain engine.
//!
//! Errors are layered the same way the call graph is: the HTTP client
//! produces [`BackendError`], the invoker folds those into the four
//! outcomes a stage can observe ([`InvokeError`]), and the orchestrator
//! reports [`ChainError`] to its caller.

use crate::core::StageRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by an inference backend client.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    /// The request exceeded its deadline.
    #[error("backend request timed out")]
    Timeout,

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body or reason phrase.
        message: String,
    },

    /// The backend answered with an explicit error payload.
    #[error("backend error: {0}")]
    Remote(String),

    /// The payload could not be decoded.
    #[error("malformed backend payload: {0}")]
    Malformed(String),

    /// The payload decoded but carried no content.
    #[error("backend returned an empty response")]
    Empty,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

/// The outcome of a single failed model invocation.
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    /// The caller cancelled the invocation. Not a failure.
    #[error("invocation cancelled")]
    Cancelled,

    /// The backend was unreachable or rejected the request.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend did not answer within the deadline.
    #[error("backend timed out after {seconds}s")]
    Timeout {
        /// The deadline that elapsed, in seconds.
        seconds: f64,
    },

    /// The backend answered without usable content.
    #[error("empty response: {0}")]
    EmptyResponse(String),
}

impl InvokeError {
    /// Returns true if this outcome is a cancellation rather than a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the stable error kind used in logs and payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled => "Cancelled",
            Self::BackendUnavailable(_) => "BackendUnavailable",
            Self::Timeout { .. } => "Timeout",
            Self::EmptyResponse(_) => "EmptyResponse",
        }
    }
}

impl From<BackendError> for InvokeError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(_) | BackendError::Status { .. } | BackendError::Remote(_) => {
                Self::BackendUnavailable(err.to_string())
            }
            // A client-level timeout carries no deadline; the invoker reports its own.
            BackendError::Timeout => Self::Timeout { seconds: 0.0 },
            BackendError::Malformed(_) | BackendError::Empty => {
                Self::EmptyResponse(err.to_string())
            }
        }
    }
}

/// The main error type for chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The topic was rejected before any work started.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A mandatory stage failed and the chain was aborted.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The stage that failed.
        stage: StageRole,
        /// The invocation failure.
        #[source]
        source: InvokeError,
    },

    /// The chain was cancelled by its caller.
    #[error("Chain cancelled")]
    Cancelled,

    /// The chain configuration is unusable.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An unexpected failure inside the orchestrator.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChainError {
    /// Builds a chain error from a stage invocation failure.
    ///
    /// Cancellation is folded into [`ChainError::Cancelled`] so callers never
    /// see it as a stage failure.
    #[must_use]
    pub fn from_invoke(stage: StageRole, err: InvokeError) -> Self {
        if err.is_cancellation() {
            Self::Cancelled
        } else {
            Self::Stage { stage, source: err }
        }
    }

    /// Returns true if the chain ended because it was cancelled.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the stage a failure belongs to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageRole> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Converts to a dictionary representation suitable for JSON payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::Stage { source, .. } => source.kind(),
            Self::Cancelled => "Cancelled",
            Self::Config(_) => "Config",
            Self::Internal(_) => "Internal",
        };
        map.insert("type".to_string(), serde_json::json!(kind));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        map
    }
}

/// Errors raised while loading or validating chain configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The stage list does not describe the fixed chain topology.
    #[error("{0}")]
    Topology(#[from] TopologyError),

    /// A cleanup or formatting pattern failed to compile.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compile error.
        #[source]
        source: regex::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Error raised when configured stages do not form the fixed chain.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TopologyError {
    /// The error message.
    pub message: String,
    /// The stage roles involved.
    pub stages: Vec<StageRole>,
}

impl TopologyError {
    /// Creates a new topology error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<StageRole>) -> Self {
        self.stages = stages;
        self
    }
}
