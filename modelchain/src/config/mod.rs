//! Chain configuration.
//!
//! Every field has a default, so an empty TOML document yields the stock
//! five-stage chain against a local Ollama instance:
//!
//! ```toml
//! word_budget = 750
//! quality_check = true
//!
//! [backend]
//! base_url = "http://localhost:11434"
//! timeout_seconds = 60
//! ```

mod defaults;
mod plan;

pub use defaults::default_stages;
pub use plan::ChainPlan;

use crate::core::StageDefinition;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Ollama runtime knobs forwarded with every request when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// CPU threads used for inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
    /// Context window size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    /// Prompt batch size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_batch: Option<u32>,
}

/// Connection settings for the inference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Ollama API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-call deadline.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// TCP connect deadline.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    /// Consume model output as an NDJSON stream instead of one response.
    #[serde(default)]
    pub stream: bool,
    /// Runtime options.
    #[serde(default)]
    pub runtime: RuntimeOptions,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            stream: false,
            runtime: RuntimeOptions::default(),
        }
    }
}

impl BackendConfig {
    /// Returns the per-call deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the connect deadline.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Top-level configuration for the chain engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Hard word limit for the final article.
    #[serde(default = "default_word_budget")]
    pub word_budget: usize,
    /// Maximum topic length in characters.
    #[serde(default = "default_max_topic_chars")]
    pub max_topic_chars: usize,
    /// Whether to run the quality stage.
    #[serde(default = "default_quality_check")]
    pub quality_check: bool,
    /// Stage definitions in execution order.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageDefinition>,
    /// Additional regexes stripped from model output.
    #[serde(default)]
    pub extra_cleanup_patterns: Vec<String>,
}

fn default_word_budget() -> usize {
    750
}

fn default_max_topic_chars() -> usize {
    200
}

fn default_quality_check() -> bool {
    true
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            word_budget: default_word_budget(),
            max_topic_chars: default_max_topic_chars(),
            quality_check: default_quality_check(),
            stages: default_stages(),
            extra_cleanup_patterns: Vec::new(),
        }
    }
}

impl ChainConfig {
    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Sets the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.backend.base_url = base_url.into();
        self
    }

    /// Enables or disables the quality stage.
    #[must_use]
    pub fn with_quality_check(mut self, enabled: bool) -> Self {
        self.quality_check = enabled;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.backend.timeout_seconds = seconds;
        self
    }

    /// Validates the stage list into a plan.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Topology`] if the stages do not form the
    /// fixed chain.
    pub fn plan(&self) -> Result<ChainPlan, ConfigError> {
        Ok(ChainPlan::from_definitions(&self.stages, self.quality_check)?)
    }
}
