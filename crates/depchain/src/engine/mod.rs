//! The dependency graph engine.
//!
//! [`Engine`] is the library entry point. It owns a storage handle and
//! coordinates the three moving parts:
//!
//! - scan ingestion through the registry and occurrence store
//! - closure index maintenance after every scan, per the configured
//!   [`ClosurePolicy`]
//! - path resolution and reachability queries
//!
//! Closure writes for a project are serialized by a per-project async lock.
//! Full rebuilds additionally pass the membership generation they read to
//! `replace_closure`, and retry if the store moved on in between.

mod scan;

pub use scan::{read_scan_entries, ScanEntry, ScanRequest};

use crate::closure::{build_project_closure, extend_closure};
use crate::config::{ClosurePolicy, EngineConfig};
use crate::domain::{
    NewComponent, NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceId, OccurrenceMetadata,
    OccurrenceSort, ProjectId, Resolution,
};
use crate::error::{Error, Result};
use crate::resolver::PathResolver;
use crate::storage::DependencyStorage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Attempts made to replace a project's closure before giving up
const MAX_REBUILD_ATTEMPTS: usize = 3;

/// Outcome of ingesting one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Newly stored occurrences, in entry order
    pub occurrences: Vec<Occurrence>,

    /// Closure rows written (total rows after a rebuild, new or shortened
    /// rows after an incremental update of a first-time source)
    pub closure_rows: usize,
}

/// Dependency graph engine over a shared storage handle.
pub struct Engine {
    storage: Arc<dyn DependencyStorage>,
    config: EngineConfig,
    resolver: PathResolver,
    project_locks: Mutex<HashMap<ProjectId, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is out of range.
    pub fn new(storage: Arc<dyn DependencyStorage>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            config,
            resolver: PathResolver::new(&config),
            project_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The underlying storage handle
    pub fn storage(&self) -> &Arc<dyn DependencyStorage> {
        &self.storage
    }

    /// Engine tuning in effect
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn project_lock(&self, project_id: ProjectId) -> Arc<Mutex<()>> {
        let mut locks = self.project_locks.lock().await;
        Arc::clone(locks.entry(project_id).or_default())
    }

    /// Ingest one scan.
    ///
    /// Registers every component and version, supersedes the occurrences the
    /// source previously reported for the project, then brings the project's
    /// closure up to date. Under [`ClosurePolicy::Incremental`] a scan that
    /// replaces earlier occurrences of its source still triggers a rebuild.
    ///
    /// # Errors
    ///
    /// Returns validation errors for blank names, versions or commit SHAs, and
    /// any storage failure. Nothing is written if registry lookups fail.
    pub async fn ingest_scan(&self, scan: ScanRequest) -> Result<ScanReport> {
        let ScanRequest {
            organization_id,
            project_id,
            source_id,
            commit_sha,
            entries,
        } = scan;

        let mut occurrences = Vec::with_capacity(entries.len());
        for entry in entries {
            let component = self
                .storage
                .lookup_or_create_component(NewComponent {
                    name: entry.name,
                    purl_type: entry.purl_type,
                    component_type: entry.component_type,
                    organization_id,
                })
                .await?;
            let version = self
                .storage
                .lookup_or_create_version(component.id, &entry.version)
                .await?;

            occurrences.push(NewOccurrence {
                project_id,
                component_version_id: version.id,
                source_id,
                commit_sha: commit_sha.clone(),
                ancestors: entry.ancestors,
                metadata: OccurrenceMetadata {
                    input_file_path: entry.input_file_path,
                    package_manager: entry.package_manager,
                    licenses: entry.licenses,
                    highest_severity: entry.highest_severity,
                },
            });
        }

        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        let replaces_existing = !self
            .storage
            .list_occurrences(
                &OccurrenceFilter {
                    project_id: Some(project_id),
                    source_id: Some(source_id),
                    limit: Some(1),
                    ..OccurrenceFilter::default()
                },
                OccurrenceSort::default(),
            )
            .await?
            .is_empty();

        let stored = self
            .storage
            .supersede_source(project_id, source_id, occurrences)
            .await?;

        // Removing occurrences can cut routes the incremental path can't re-derive
        let closure_rows = match self.config.closure_policy {
            ClosurePolicy::Rebuild => self.rebuild_locked(project_id).await?,
            ClosurePolicy::Incremental if replaces_existing => {
                debug!(
                    project = %project_id,
                    source = %source_id,
                    "Re-scan replaced occurrences; rebuilding closure"
                );
                self.rebuild_locked(project_id).await?
            }
            ClosurePolicy::Incremental => self.extend_locked(project_id, &stored).await?,
        };

        info!(
            project = %project_id,
            source = %source_id,
            occurrences = stored.len(),
            closure_rows,
            "Ingested scan"
        );

        Ok(ScanReport {
            occurrences: stored,
            closure_rows,
        })
    }

    /// Re-derive a project's closure from its occurrences.
    ///
    /// Returns the number of rows in the new closure.
    ///
    /// # Errors
    ///
    /// Returns `Error::StaleClosure` if membership kept changing across every
    /// attempt, or any storage failure.
    pub async fn rebuild_closure(&self, project_id: ProjectId) -> Result<usize> {
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;
        self.rebuild_locked(project_id).await
    }

    /// Rebuild every project's closure; returns `(project, rows)` pairs
    ///
    /// # Errors
    ///
    /// Stops at the first project that fails.
    pub async fn rebuild_all(&self) -> Result<Vec<(ProjectId, usize)>> {
        let mut rebuilt = Vec::new();
        for project_id in self.storage.project_ids().await? {
            rebuilt.push((project_id, self.rebuild_closure(project_id).await?));
        }
        Ok(rebuilt)
    }

    async fn rebuild_locked(&self, project_id: ProjectId) -> Result<usize> {
        let mut last_error = None;

        for attempt in 1..=MAX_REBUILD_ATTEMPTS {
            let graph = self.storage.project_graph(project_id).await?;
            let rows = build_project_closure(&graph, self.config.max_depth).to_rows(project_id);
            let count = rows.len();

            match self
                .storage
                .replace_closure(project_id, graph.generation, rows)
                .await
            {
                Ok(()) => {
                    info!(
                        project = %project_id,
                        nodes = graph.nodes.len(),
                        rows = count,
                        "Rebuilt closure index"
                    );
                    return Ok(count);
                }
                Err(e @ Error::StaleClosure { .. }) => {
                    warn!(project = %project_id, attempt, "{e}; retrying");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(Error::StaleClosure {
            project: project_id,
            expected: 0,
            actual: 0,
        }))
    }

    /// Extend the closure for each stored occurrence, in insertion order
    async fn extend_locked(&self, project_id: ProjectId, stored: &[Occurrence]) -> Result<usize> {
        let mut written = 0;

        for occurrence in stored {
            let Some(node) = self.storage.occurrence_node(project_id, occurrence.id).await? else {
                continue;
            };
            let coordinates: Vec<_> = node.ancestors.iter().filter_map(|r| r.coordinate()).collect();
            if coordinates.is_empty() {
                continue;
            }

            let matches = self
                .storage
                .occurrence_nodes_by_coordinates(project_id, &coordinates)
                .await?;
            let mut parents = Vec::with_capacity(matches.len());
            for parent in matches {
                let upstream = self
                    .storage
                    .closure_rows_to(parent.id)
                    .await?
                    .into_iter()
                    .map(|row| (row.ancestor_occurrence_id, row.path_length))
                    .collect();
                parents.push((parent.id, upstream));
            }

            let rows = extend_closure(&node, &parents, self.config.max_depth);
            debug!(occurrence = %occurrence.id, rows = rows.len(), "Extending closure index");
            written += self.storage.merge_closure(project_id, rows).await?;
        }

        Ok(written)
    }

    /// Resolve every dependency path to an occurrence.
    ///
    /// # Errors
    ///
    /// Only storage failures; an unknown occurrence yields an empty resolution.
    pub async fn resolve(
        &self,
        occurrence_id: OccurrenceId,
        project_id: ProjectId,
    ) -> Result<Resolution> {
        self.resolver
            .resolve(self.storage.as_ref(), occurrence_id, project_id)
            .await
    }

    /// Resolve several targets concurrently, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure.
    pub async fn resolve_many(
        &self,
        targets: &[(OccurrenceId, ProjectId)],
    ) -> Result<Vec<Resolution>> {
        self.resolver
            .resolve_many(self.storage.as_ref(), targets)
            .await
    }

    /// Minimum recorded distance from `ancestor` to `descendant`.
    ///
    /// `None` means no row is recorded, which includes pairs farther apart
    /// than `max_depth`.
    ///
    /// # Errors
    ///
    /// Only storage failures.
    pub async fn is_descendant(
        &self,
        ancestor: OccurrenceId,
        descendant: OccurrenceId,
    ) -> Result<Option<u32>> {
        self.storage.is_descendant(ancestor, descendant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrganizationId, SourceId};
    use crate::storage::in_memory::new_in_memory_storage;

    fn scan(entries: Vec<ScanEntry>) -> ScanRequest {
        ScanRequest {
            organization_id: OrganizationId::new(1),
            project_id: ProjectId::new(1),
            source_id: SourceId::new(1),
            commit_sha: "c0ffee".to_string(),
            entries,
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let result = Engine::new(
            new_in_memory_storage(),
            EngineConfig::default().with_max_depth(0),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ingest_builds_closure() {
        let engine = Engine::new(new_in_memory_storage(), EngineConfig::default()).unwrap();
        let report = engine
            .ingest_scan(scan(vec![
                ScanEntry::new("openssl", "1.1"),
                ScanEntry::new("curl", "7.0").with_parent("openssl", "1.1"),
            ]))
            .await
            .unwrap();

        assert_eq!(report.occurrences.len(), 2);
        assert_eq!(report.closure_rows, 1);
        let (openssl, curl) = (report.occurrences[0].id, report.occurrences[1].id);
        assert_eq!(engine.is_descendant(openssl, curl).await.unwrap(), Some(1));
        assert_eq!(engine.is_descendant(curl, openssl).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rescan_supersedes_source() {
        let engine = Engine::new(new_in_memory_storage(), EngineConfig::default()).unwrap();
        let first = engine
            .ingest_scan(scan(vec![
                ScanEntry::new("a", "1"),
                ScanEntry::new("b", "1").with_parent("a", "1"),
            ]))
            .await
            .unwrap();
        let second = engine
            .ingest_scan(scan(vec![ScanEntry::new("a", "1")]))
            .await
            .unwrap();

        assert_eq!(second.closure_rows, 0);
        let old = first.occurrences[0].id;
        assert!(engine.storage().get_occurrence(old).await.unwrap().is_none());
        assert_eq!(
            engine
                .storage()
                .closure_rows(ProjectId::new(1))
                .await
                .unwrap()
                .len(),
            0
        );
    }
}
