//! In-memory storage backend.
//!
//! Holds the registry, occurrences and closure rows in ordered maps, with
//! secondary indexes for the lookups the engine issues in bulk:
//!
//! - `(name, purl_type, component_type, organization)` to component, so
//!   `lookup_or_create_component` is one hash probe under the lock
//! - `(component, version)` to version
//! - `(project, name, version)` to the occurrences carrying that coordinate,
//!   which backs the resolver's per-round batched lookup
//! - a per-project [`ClosureTable`](crate::closure::ClosureTable)
//!
//! # Persistence
//!
//! Storage created by [`new_in_memory_storage`] is ephemeral. Storage opened
//! with [`open_jsonl_storage`] or [`load_from_jsonl`] remembers its snapshot
//! path: the trait's `save()` writes the whole store there atomically and
//! `reload()` replaces the in-memory state with the file's contents.
//!
//! # Thread Safety
//!
//! State lives behind `Arc<tokio::sync::Mutex<_>>`. Each trait call takes the
//! lock once, so check-and-insert sequences (registry lookups, supersede,
//! generation-checked closure replacement) are atomic.

mod inner;
mod jsonl;
mod sorting;
mod trait_impl;

use crate::error::Result;
use crate::storage::DependencyStorage;
use inner::InMemoryStorageInner;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

// Re-export public API
pub use jsonl::{load_from_jsonl, save_to_jsonl, LoadWarning};

/// Thread-safe in-memory storage, optionally backed by a JSONL snapshot.
#[derive(Clone)]
pub(crate) struct InMemoryStorage {
    state: Arc<Mutex<InMemoryStorageInner>>,
    backing: Option<PathBuf>,
}

impl InMemoryStorage {
    fn from_inner(inner: InMemoryStorageInner, backing: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(inner)),
            backing,
        }
    }
}

/// Create a new ephemeral in-memory storage instance.
///
/// # Example
///
/// ```
/// use depchain::storage::in_memory::new_in_memory_storage;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let storage = new_in_memory_storage();
///     assert!(storage.project_ids().await.unwrap().is_empty());
/// }
/// ```
pub fn new_in_memory_storage() -> Arc<dyn DependencyStorage> {
    Arc::new(InMemoryStorage::from_inner(InMemoryStorageInner::new(), None))
}

/// Open storage backed by a JSONL snapshot, starting empty if the file
/// doesn't exist yet.
///
/// Load warnings are logged and otherwise ignored.
///
/// # Errors
///
/// Returns `Error::Io` if the file exists but can't be read.
pub async fn open_jsonl_storage(path: PathBuf) -> Result<Arc<dyn DependencyStorage>> {
    if !tokio::fs::try_exists(&path).await? {
        info!(path = %path.display(), "Snapshot not found, starting with empty storage");
        return Ok(Arc::new(InMemoryStorage::from_inner(
            InMemoryStorageInner::new(),
            Some(path),
        )));
    }

    let (inner, warnings) = jsonl::read_snapshot(&path).await?;
    jsonl::log_warnings(&path, &warnings);
    Ok(Arc::new(InMemoryStorage::from_inner(inner, Some(path))))
}
