//! Hash-based uuid generation for occurrences.
//!
//! Occurrence uuids are derived from the occurrence's identifying fields, a
//! wall-clock timestamp and a nonce, hashed with SHA256 and formatted in the
//! canonical 8-4-4-4-12 layout (version nibble 8, RFC 4122 variant). The
//! generator remembers every uuid it has issued or been told about and retries
//! with the next nonce on collision, so uuids stay globally unique within a
//! store even when two occurrences share every field.
//!
//! # Example
//!
//! ```
//! use depchain::id_generation::{UuidGenerator, UuidSeed};
//!
//! let mut generator = UuidGenerator::new();
//! let uuid = generator
//!     .generate(&UuidSeed {
//!         project_id: 1,
//!         component_version_id: 7,
//!         source_id: 3,
//!         commit_sha: "deadbeef",
//!         input_file_path: Some("package-lock.json"),
//!     })
//!     .unwrap();
//!
//! assert_eq!(uuid.len(), 36);
//! ```

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_NONCE: u32 = 100;

/// Errors that can occur during uuid generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique uuid after exhausting all nonces
    #[error("Unable to generate unique uuid after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonces tried
        attempts: u32,
    },
}

/// Fields an occurrence uuid is derived from
#[derive(Debug, Clone, Copy)]
pub struct UuidSeed<'a> {
    /// Project id
    pub project_id: u64,
    /// Component version id
    pub component_version_id: u64,
    /// Scan source id
    pub source_id: u64,
    /// Commit SHA of the scan
    pub commit_sha: &'a str,
    /// Manifest path, if known
    pub input_file_path: Option<&'a str>,
}

/// Hash-based uuid generator with collision detection
#[derive(Debug, Default)]
pub struct UuidGenerator {
    existing: HashSet<String>,
}

impl UuidGenerator {
    /// Create an empty generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing uuid to prevent collisions
    pub fn register(&mut self, uuid: String) {
        self.existing.insert(uuid);
    }

    /// Forget a uuid whose occurrence was removed
    pub fn release(&mut self, uuid: &str) {
        self.existing.remove(uuid);
    }

    /// Whether the uuid has been issued or registered
    pub fn contains(&self, uuid: &str) -> bool {
        self.existing.contains(uuid)
    }

    /// Generate a new unique uuid
    ///
    /// # Errors
    ///
    /// Returns an error if every nonce produced a collision.
    pub fn generate(&mut self, seed: &UuidSeed<'_>) -> Result<String, IdGenerationError> {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        for nonce in 0..MAX_NONCE {
            let uuid = hash_uuid(seed, timestamp, nonce);
            if self.existing.insert(uuid.clone()) {
                if nonce > 0 {
                    debug!(nonce, "Generated unique uuid after {} collision retries", nonce);
                }
                return Ok(uuid);
            }
        }

        warn!(max_nonce = MAX_NONCE, "All nonces exhausted generating occurrence uuid");
        Err(IdGenerationError::CollisionExhausted {
            attempts: MAX_NONCE,
        })
    }
}

fn hash_uuid(seed: &UuidSeed<'_>, timestamp: i64, nonce: u32) -> String {
    let content = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        seed.project_id,
        seed.component_version_id,
        seed.source_id,
        seed.commit_sha,
        seed.input_file_path.unwrap_or(""),
        timestamp,
        nonce
    );

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // Name-based uuid version 8 with the RFC 4122 variant bits
    bytes[6] = (bytes[6] & 0x0f) | 0x80;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    format_uuid(&bytes)
}

fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Validate the canonical uuid layout (lowercase hex, 8-4-4-4-12)
pub fn validate_uuid(uuid: &str) -> bool {
    let groups: Vec<&str> = uuid.split('-').collect();
    let expected = [8, 4, 4, 4, 12];
    groups.len() == expected.len()
        && groups
            .iter()
            .zip(expected)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')))
}
