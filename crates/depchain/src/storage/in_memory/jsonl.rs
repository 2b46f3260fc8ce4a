//! JSONL persistence for in-memory storage.
//!
//! A snapshot file holds one tagged [`SnapshotRecord`] per line, registry rows
//! first so references can be checked in a single forward pass.

use super::inner::InMemoryStorageInner;
use super::InMemoryStorage;
use crate::closure::ClosureTable;
use crate::domain::{ComponentId, ComponentVersionId, OccurrenceId};
use crate::error::{Error, Result, StorageError};
use crate::storage::{DependencyStorage, SnapshotRecord};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::warn;

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal: the offending record is skipped and loading
/// continues. They indicate data quality problems worth reporting.
///
/// **Example:**
/// ```no_run
/// # use depchain::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (storage, warnings) = load_from_jsonl(Path::new(".depchain/snapshot.jsonl")).await?;
///
/// for warning in &warnings {
///     if let LoadWarning::MalformedJson { line_number, .. } = warning {
///         eprintln!("Skipped line {line_number}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A line that couldn't be parsed as a snapshot record
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// A version referencing a component that isn't in the file
    OrphanedVersion {
        /// Skipped version
        version_id: ComponentVersionId,
        /// Missing component
        component_id: ComponentId,
    },

    /// An occurrence referencing a version that isn't in the file, or whose
    /// component disagrees with its version's component
    OrphanedOccurrence {
        /// Skipped occurrence
        occurrence_id: OccurrenceId,
        /// Referenced version
        component_version_id: ComponentVersionId,
    },

    /// An occurrence whose id or uuid was already loaded
    DuplicateOccurrence {
        /// Skipped occurrence
        occurrence_id: OccurrenceId,
        /// Its uuid
        uuid: String,
    },

    /// A closure row that doesn't join two loaded occurrences of its project
    InvalidGraphPath {
        /// Upstream end
        ancestor: OccurrenceId,
        /// Downstream end
        descendant: OccurrenceId,
        /// Why it was rejected
        reason: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed record: {error}")
            }
            LoadWarning::OrphanedVersion {
                version_id,
                component_id,
            } => write!(
                f,
                "version {version_id} references missing component {component_id}"
            ),
            LoadWarning::OrphanedOccurrence {
                occurrence_id,
                component_version_id,
            } => write!(
                f,
                "occurrence {occurrence_id} references missing or mismatched version {component_version_id}"
            ),
            LoadWarning::DuplicateOccurrence {
                occurrence_id,
                uuid,
            } => write!(f, "occurrence {occurrence_id} ({uuid}) is a duplicate"),
            LoadWarning::InvalidGraphPath {
                ancestor,
                descendant,
                reason,
            } => write!(f, "closure row {ancestor} -> {descendant} skipped: {reason}"),
        }
    }
}

/// Read a snapshot file into fresh storage state.
///
/// Parsing is resilient: bad lines and dangling references become warnings.
pub(super) async fn read_snapshot(path: &Path) -> Result<(InMemoryStorageInner, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut warnings = Vec::new();
    let mut components = Vec::new();
    let mut versions = Vec::new();
    let mut occurrences = Vec::new();
    let mut closure = Vec::new();

    let mut line_number = 0;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SnapshotRecord>(&line) {
            Ok(SnapshotRecord::Component(c)) => components.push(c),
            Ok(SnapshotRecord::ComponentVersion(v)) => versions.push(v),
            Ok(SnapshotRecord::Occurrence(o)) => occurrences.push(o),
            Ok(SnapshotRecord::GraphPath(p)) => closure.push(p),
            Err(e) => warnings.push(LoadWarning::MalformedJson {
                line_number,
                error: e.to_string(),
            }),
        }
    }

    let mut inner = InMemoryStorageInner::new();

    for component in components {
        inner.insert_component_row(component);
    }

    for version in versions {
        if !inner.components.contains_key(&version.component_id) {
            warnings.push(LoadWarning::OrphanedVersion {
                version_id: version.id,
                component_id: version.component_id,
            });
            continue;
        }
        inner.insert_version_row(version);
    }

    let mut seen_uuids = HashSet::new();
    for occurrence in occurrences {
        let consistent = inner
            .versions
            .get(&occurrence.component_version_id)
            .is_some_and(|v| v.component_id == occurrence.component_id);
        if !consistent {
            warnings.push(LoadWarning::OrphanedOccurrence {
                occurrence_id: occurrence.id,
                component_version_id: occurrence.component_version_id,
            });
            continue;
        }
        if inner.occurrences.contains_key(&occurrence.id) || !seen_uuids.insert(occurrence.uuid.clone()) {
            warnings.push(LoadWarning::DuplicateOccurrence {
                occurrence_id: occurrence.id,
                uuid: occurrence.uuid,
            });
            continue;
        }
        inner.insert_occurrence_row(occurrence);
    }

    for row in closure {
        if let Err(e) = inner.check_closure_rows(row.project_id, &[row]) {
            warnings.push(LoadWarning::InvalidGraphPath {
                ancestor: row.ancestor_occurrence_id,
                descendant: row.descendant_occurrence_id,
                reason: e.to_string(),
            });
            continue;
        }
        inner
            .closure
            .entry(row.project_id)
            .or_insert_with(ClosureTable::new)
            .insert_min(row.ancestor_occurrence_id, row.descendant_occurrence_id, row.path_length);
    }

    Ok((inner, warnings))
}

/// Emit load warnings through `tracing`
pub(super) fn log_warnings(path: &Path, warnings: &[LoadWarning]) {
    for warning in warnings {
        warn!(path = %path.display(), "{warning}");
    }
}

/// Load storage from a JSONL snapshot.
///
/// The returned storage is backed by `path`: `save()` writes back to it and
/// `reload()` re-reads it.
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be read. Record-level problems are
/// returned as warnings instead.
pub async fn load_from_jsonl(
    path: &Path,
) -> Result<(Arc<dyn DependencyStorage>, Vec<LoadWarning>)> {
    let (inner, warnings) = read_snapshot(path).await?;
    let storage = InMemoryStorage::from_inner(inner, Some(path.to_path_buf()));
    Ok((Arc::new(storage), warnings))
}

/// Save storage to a JSONL file with atomic writes.
///
/// Records are written to a temporary sibling file which is then renamed
/// over `path`. If the process is interrupted, the original file is intact.
///
/// # Errors
///
/// Returns an error if the export, serialization or any file operation fails.
pub async fn save_to_jsonl(storage: &dyn DependencyStorage, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("jsonl.tmp");

    let file = File::create(&temp_path).await.map_err(Error::Io)?;
    let mut writer = BufWriter::new(file);

    for record in storage.export_snapshot().await?.into_records() {
        let json = serde_json::to_string(&record).map_err(StorageError::Serialization)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    drop(writer);

    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
