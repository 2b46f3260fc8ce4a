//! Configuration management for depchain.
//!
//! Configuration lives in `.depchain/config.yaml`:
//!
//! ```yaml
//! storage:
//!   backend: memory
//!   data_file: .depchain/snapshot.jsonl
//! engine:
//!   max-depth: 8
//!   max-candidates: 1000
//!   closure-policy: rebuild
//! ```

use crate::error::{ConfigError, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Name of the depchain directory
pub const DEPCHAIN_DIR_NAME: &str = ".depchain";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the snapshot data file
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.jsonl";

/// Default bound on path length for resolution and closure construction
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Default bound on the number of candidates one resolution may create
pub const DEFAULT_MAX_CANDIDATES: usize = 1000;

/// Upper limit accepted for `max-depth`
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepchainConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Graph engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type ("memory" for in-memory with JSONL persistence)
    pub backend: String,

    /// Path to the data file, relative to the repository root
    pub data_file: String,
}

impl StorageConfig {
    /// Translate the configured backend into a [`StorageBackend`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unknown backend names.
    pub fn to_backend(&self, root_dir: &Path) -> Result<StorageBackend> {
        match self.backend.as_str() {
            "memory" => Ok(StorageBackend::Jsonl(root_dir.join(&self.data_file))),
            "ephemeral" => Ok(StorageBackend::InMemory),
            other => Err(ConfigError::InvalidValue {
                field: "storage.backend",
                reason: format!("unknown backend '{other}' (expected 'memory' or 'ephemeral')"),
            }
            .into()),
        }
    }
}

/// How the closure index is kept current after a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosurePolicy {
    /// Re-derive and atomically replace the whole project's closure
    #[default]
    Rebuild,

    /// Extend the closure with edges ending at each newly inserted occurrence.
    /// Re-scans of a source that already reported occurrences rebuild instead.
    Incremental,
}

/// Graph engine tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Maximum path length walked by the resolver and recorded in the closure
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of candidates a single resolution may create
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Closure maintenance policy
    #[serde(default)]
    pub closure_policy: ClosurePolicy,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            closure_policy: ClosurePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Builder: set the depth bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builder: set the candidate cap
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Builder: set the closure policy
    pub fn with_closure_policy(mut self, policy: ClosurePolicy) -> Self {
        self.closure_policy = policy;
        self
    }

    /// Validate ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a bound is zero or too large.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "engine.max-depth",
                reason: format!("must be between 1 and {MAX_DEPTH_LIMIT}, got {}", self.max_depth),
            });
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max-candidates",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl DepchainConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            storage: StorageConfig {
                backend: "memory".to_string(),
                data_file: format!("{DEPCHAIN_DIR_NAME}/{SNAPSHOT_FILE_NAME}"),
            },
            engine: EngineConfig::default(),
        }
    }

    /// Parse and validate configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns a configuration error on malformed YAML or out-of-range values.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file is unreadable, or a configuration error.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for DepchainConfig {
    fn default() -> Self {
        Self::new()
    }
}
