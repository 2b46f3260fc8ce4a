//! Error types for depchain operations.
//!
//! Read queries (`resolve`, `is_descendant`) are non-failing for unknown
//! occurrences and return empty results instead; errors here describe
//! infrastructure failures and invalid writes.

use crate::domain::{ComponentId, ComponentVersionId, OccurrenceId, ProjectId};
use std::io;
use thiserror::Error;

/// The error type for depchain operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage backend error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Component not found.
    #[error("Component not found: {0}")]
    ComponentNotFound(ComponentId),

    /// Component version not found.
    #[error("Component version not found: {0}")]
    ComponentVersionNotFound(ComponentVersionId),

    /// Occurrence not found.
    #[error("Occurrence not found: {0}")]
    OccurrenceNotFound(OccurrenceId),

    /// Write rejected because the input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Closure write raced with a change in occurrence membership.
    #[error(
        "Closure for project {project} is stale: derived at generation {expected}, store is at {actual}"
    )]
    StaleClosure {
        /// Project whose closure was being replaced
        project: ProjectId,
        /// Generation the rows were derived from
        expected: u64,
        /// Generation the store holds now
        actual: u64,
    },

    /// Occurrence uuid generation failed.
    #[error("ID generation failed: {0}")]
    IdGeneration(#[from] crate::id_generation::IdGenerationError),
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.depchain/` directory was found.
    #[error("Not a depchain repository (or any parent up to the filesystem root). Run 'depchain init' first.")]
    NotInitialized,

    /// `depchain init` ran where a `.depchain/` directory already exists.
    #[error("depchain is already initialized here. Found existing '{0}'")]
    AlreadyInitialized(String),

    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(String),
}

/// A specialized Result type for depchain operations.
pub type Result<T> = std::result::Result<T, Error>;
