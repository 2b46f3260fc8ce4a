//! Storage abstraction layer for depchain.
//!
//! This module provides the core storage trait and factory for creating
//! storage backends:
//!
//! - **In-memory**: Fast, ephemeral storage backed by ordered maps and a
//!   `(project, name, version)` coordinate index
//! - **JSONL**: The in-memory backend persisted as a JSON Lines snapshot
//!
//! # Architecture
//!
//! The storage layer uses an async trait so that database-backed
//! implementations can be added without changing callers. Every method takes
//! `&self`; implementations use interior mutability so one handle can be
//! shared as `Arc<dyn DependencyStorage>` between concurrent readers (path
//! resolution) and writers (scan ingestion, closure maintenance).
//!
//! # Example
//!
//! ```no_run
//! use depchain::domain::{ComponentType, NewComponent, OrganizationId, PurlType};
//! use depchain::storage::{create_storage, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = create_storage(StorageBackend::InMemory).await?;
//!
//!     let component = storage
//!         .lookup_or_create_component(NewComponent {
//!             name: "openssl".to_string(),
//!             purl_type: PurlType::Generic,
//!             component_type: ComponentType::Library,
//!             organization_id: OrganizationId::new(1),
//!         })
//!         .await?;
//!     let version = storage.lookup_or_create_version(component.id, "1.1").await?;
//!     println!("Registered {}@{}", component.name, version.version);
//!
//!     Ok(())
//! }
//! ```

use crate::domain::{
    Component, ComponentId, ComponentVersion, ComponentVersionId, Coordinate, GraphPath,
    NewComponent, NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceId, OccurrenceNode,
    OccurrenceSort, OrganizationId, ProjectGraph, ProjectId, SourceId,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

// Storage backend implementations
pub mod in_memory;

/// Core storage trait for the dependency graph.
///
/// # Method Categories
///
/// - **Registry**: `lookup_or_create_component`, `lookup_or_create_version`, `search_components`
/// - **Occurrences**: `insert_occurrence`, `insert_occurrences`, `supersede_source`, `list_occurrences`
/// - **Graph lookups**: `occurrence_node`, `occurrence_nodes_by_coordinates`, `project_graph`
/// - **Closure index**: `replace_closure`, `merge_closure`, `closure_rows_to`, `is_descendant`
/// - **Persistence**: `export_snapshot`, `import_snapshot`, `save`, `reload`
///
/// # Thread Safety
///
/// Each call is atomic with respect to other calls on the same handle.
/// Multi-call sequences (read the project graph, derive rows, write them) are
/// guarded by the membership generation passed to [`replace_closure`].
///
/// [`replace_closure`]: DependencyStorage::replace_closure
#[async_trait]
pub trait DependencyStorage: Send + Sync {
    // ========== Component / Version Registry ==========

    /// Return the component with this identity, registering it if absent.
    ///
    /// Idempotent under concurrent callers: the unique key
    /// `(name, purl_type, component_type, organization)` is checked and
    /// inserted atomically, so racing callers observe the same row.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the name is blank.
    async fn lookup_or_create_component(&self, component: NewComponent) -> Result<Component>;

    /// Return the version row for `(component, version)`, registering it if absent.
    ///
    /// # Errors
    ///
    /// - `Error::ComponentNotFound` if the component doesn't exist
    /// - `Error::InvalidInput` if the version string is blank
    async fn lookup_or_create_version(
        &self,
        component_id: ComponentId,
        version: &str,
    ) -> Result<ComponentVersion>;

    /// Get a component by ID.
    async fn get_component(&self, id: ComponentId) -> Result<Option<Component>>;

    /// Get a component version by ID.
    async fn get_component_version(
        &self,
        id: ComponentVersionId,
    ) -> Result<Option<ComponentVersion>>;

    /// Case-insensitive substring search on component names within an organization.
    ///
    /// Results are ordered by name, then id.
    async fn search_components(
        &self,
        organization_id: OrganizationId,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Component>>;

    // ========== Occurrence Store ==========

    /// Insert one occurrence.
    ///
    /// # Implementation Requirements
    ///
    /// Implementations **MUST** call `occurrence.validate()` and assign a
    /// globally unique uuid.
    ///
    /// # Errors
    ///
    /// - `Error::ComponentVersionNotFound` if the version doesn't exist
    /// - `Error::InvalidInput` if validation fails
    async fn insert_occurrence(&self, occurrence: NewOccurrence) -> Result<Occurrence>;

    /// Insert a batch of occurrences. Validation runs for the whole batch
    /// before anything is written.
    async fn insert_occurrences(&self, occurrences: Vec<NewOccurrence>) -> Result<Vec<Occurrence>>;

    /// Replace every occurrence a source previously reported for a project.
    ///
    /// Removes the old rows and every closure row that may route through
    /// them, then inserts `occurrences`, in one atomic step. Each new occurrence must belong to
    /// `project_id` and `source_id`.
    async fn supersede_source(
        &self,
        project_id: ProjectId,
        source_id: SourceId,
        occurrences: Vec<NewOccurrence>,
    ) -> Result<Vec<Occurrence>>;

    /// Get an occurrence by ID.
    async fn get_occurrence(&self, id: OccurrenceId) -> Result<Option<Occurrence>>;

    /// List occurrences matching the filter in a deterministic order.
    async fn list_occurrences(
        &self,
        filter: &OccurrenceFilter,
        sort: OccurrenceSort,
    ) -> Result<Vec<Occurrence>>;

    // ========== Graph Lookups ==========

    /// The graph projection of an occurrence, if it exists in `project_id`.
    async fn occurrence_node(
        &self,
        project_id: ProjectId,
        id: OccurrenceId,
    ) -> Result<Option<OccurrenceNode>>;

    /// Every occurrence of `project_id` whose component name and version
    /// match one of `coordinates`, in one lookup.
    ///
    /// Results are ordered by occurrence id.
    async fn occurrence_nodes_by_coordinates(
        &self,
        project_id: ProjectId,
        coordinates: &[Coordinate],
    ) -> Result<Vec<OccurrenceNode>>;

    /// Every node of a project along with the current membership generation.
    async fn project_graph(&self, project_id: ProjectId) -> Result<ProjectGraph>;

    /// Projects that have at least one occurrence.
    async fn project_ids(&self) -> Result<Vec<ProjectId>>;

    // ========== Closure Index ==========

    /// Atomically replace a project's closure rows.
    ///
    /// `generation` is the membership generation the rows were derived from
    /// (see [`ProjectGraph::generation`]).
    ///
    /// # Errors
    ///
    /// - `Error::StaleClosure` if occurrence membership changed since `generation`
    /// - `Error::InvalidInput` if a row violates the closure invariants
    async fn replace_closure(
        &self,
        project_id: ProjectId,
        generation: u64,
        rows: Vec<GraphPath>,
    ) -> Result<()>;

    /// Upsert rows, keeping the minimum length per `(ancestor, descendant)`.
    ///
    /// Returns the number of rows inserted or shortened.
    async fn merge_closure(&self, project_id: ProjectId, rows: Vec<GraphPath>) -> Result<usize>;

    /// All closure rows of a project, ordered by `(ancestor, descendant)`.
    async fn closure_rows(&self, project_id: ProjectId) -> Result<Vec<GraphPath>>;

    /// Closure rows whose descendant is `descendant`.
    async fn closure_rows_to(&self, descendant: OccurrenceId) -> Result<Vec<GraphPath>>;

    /// Distance from `ancestor` to `descendant`, if recorded.
    ///
    /// `None` means *unknown*, not *unreachable*: edges beyond the depth bound
    /// are never recorded.
    async fn is_descendant(
        &self,
        ancestor: OccurrenceId,
        descendant: OccurrenceId,
    ) -> Result<Option<u32>>;

    // ========== Persistence ==========

    /// Export every stored record.
    async fn export_snapshot(&self) -> Result<Snapshot>;

    /// Import records, keeping their ids. Used for bulk loading.
    async fn import_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Save changes to persistent storage.
    ///
    /// For in-memory storage with JSONL backing, this writes to disk.
    async fn save(&self) -> Result<()>;

    /// Reload state from persistent storage, discarding in-memory changes.
    ///
    /// No-op for purely in-memory storage.
    async fn reload(&self) -> Result<()>;
}

/// Every record held by a storage backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Registered components
    pub components: Vec<Component>,

    /// Registered component versions
    pub versions: Vec<ComponentVersion>,

    /// Occurrences
    pub occurrences: Vec<Occurrence>,

    /// Closure rows
    pub closure: Vec<GraphPath>,
}

/// One line of a JSONL snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotRecord {
    /// A component row
    Component(Component),
    /// A component version row
    ComponentVersion(ComponentVersion),
    /// An occurrence row
    Occurrence(Occurrence),
    /// A closure row
    GraphPath(GraphPath),
}

impl Snapshot {
    /// Flatten into records, registry rows first so a reader can validate references in order.
    pub fn into_records(self) -> Vec<SnapshotRecord> {
        let mut records = Vec::with_capacity(
            self.components.len()
                + self.versions.len()
                + self.occurrences.len()
                + self.closure.len(),
        );
        records.extend(self.components.into_iter().map(SnapshotRecord::Component));
        records.extend(self.versions.into_iter().map(SnapshotRecord::ComponentVersion));
        records.extend(self.occurrences.into_iter().map(SnapshotRecord::Occurrence));
        records.extend(self.closure.into_iter().map(SnapshotRecord::GraphPath));
        records
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// In-memory storage persisted to a JSONL snapshot
    Jsonl(PathBuf),
}

/// Create a storage backend.
///
/// # Errors
///
/// - `Error::Io` if the snapshot file exists but cannot be read
/// - `Error::Storage` for backend-specific initialization errors
pub async fn create_storage(backend: StorageBackend) -> Result<Arc<dyn DependencyStorage>> {
    match backend {
        StorageBackend::InMemory => Ok(in_memory::new_in_memory_storage()),
        StorageBackend::Jsonl(path) => in_memory::open_jsonl_storage(path).await,
    }
}

// ========== Test Utilities ==========

/// Mock implementation of [`DependencyStorage`] for testing.
///
/// Stateless: lookups return nothing, registry calls echo back a row with
/// id 1, and occurrence writes are unimplemented.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Copy, Default)]
#[non_exhaustive]
pub struct MockStorage;

#[cfg(any(test, feature = "test-util"))]
impl MockStorage {
    /// Create a new MockStorage instance.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl DependencyStorage for MockStorage {
    async fn lookup_or_create_component(&self, component: NewComponent) -> Result<Component> {
        Ok(Component {
            id: ComponentId::new(1),
            name: component.name,
            purl_type: component.purl_type,
            component_type: component.component_type,
            organization_id: component.organization_id,
        })
    }

    async fn lookup_or_create_version(
        &self,
        component_id: ComponentId,
        version: &str,
    ) -> Result<ComponentVersion> {
        Ok(ComponentVersion {
            id: ComponentVersionId::new(1),
            component_id,
            version: version.to_string(),
        })
    }

    async fn get_component(&self, _id: ComponentId) -> Result<Option<Component>> {
        Ok(None)
    }

    async fn get_component_version(
        &self,
        _id: ComponentVersionId,
    ) -> Result<Option<ComponentVersion>> {
        Ok(None)
    }

    async fn search_components(
        &self,
        _organization_id: OrganizationId,
        _query: &str,
        _limit: Option<usize>,
    ) -> Result<Vec<Component>> {
        Ok(vec![])
    }

    async fn insert_occurrence(&self, _occurrence: NewOccurrence) -> Result<Occurrence> {
        unimplemented!(
            "MockStorage::insert_occurrence() is not implemented. Use in_memory::new_in_memory_storage() for writes."
        )
    }

    async fn insert_occurrences(
        &self,
        _occurrences: Vec<NewOccurrence>,
    ) -> Result<Vec<Occurrence>> {
        unimplemented!(
            "MockStorage::insert_occurrences() is not implemented. Use in_memory::new_in_memory_storage() for writes."
        )
    }

    async fn supersede_source(
        &self,
        _project_id: ProjectId,
        _source_id: SourceId,
        _occurrences: Vec<NewOccurrence>,
    ) -> Result<Vec<Occurrence>> {
        unimplemented!(
            "MockStorage::supersede_source() is not implemented. Use in_memory::new_in_memory_storage() for writes."
        )
    }

    async fn get_occurrence(&self, _id: OccurrenceId) -> Result<Option<Occurrence>> {
        Ok(None)
    }

    async fn list_occurrences(
        &self,
        _filter: &OccurrenceFilter,
        _sort: OccurrenceSort,
    ) -> Result<Vec<Occurrence>> {
        Ok(vec![])
    }

    async fn occurrence_node(
        &self,
        _project_id: ProjectId,
        _id: OccurrenceId,
    ) -> Result<Option<OccurrenceNode>> {
        Ok(None)
    }

    async fn occurrence_nodes_by_coordinates(
        &self,
        _project_id: ProjectId,
        _coordinates: &[Coordinate],
    ) -> Result<Vec<OccurrenceNode>> {
        Ok(vec![])
    }

    async fn project_graph(&self, _project_id: ProjectId) -> Result<ProjectGraph> {
        Ok(ProjectGraph::default())
    }

    async fn project_ids(&self) -> Result<Vec<ProjectId>> {
        Ok(vec![])
    }

    async fn replace_closure(
        &self,
        _project_id: ProjectId,
        _generation: u64,
        _rows: Vec<GraphPath>,
    ) -> Result<()> {
        Ok(())
    }

    async fn merge_closure(&self, _project_id: ProjectId, rows: Vec<GraphPath>) -> Result<usize> {
        Ok(rows.len())
    }

    async fn closure_rows(&self, _project_id: ProjectId) -> Result<Vec<GraphPath>> {
        Ok(vec![])
    }

    async fn closure_rows_to(&self, _descendant: OccurrenceId) -> Result<Vec<GraphPath>> {
        Ok(vec![])
    }

    async fn is_descendant(
        &self,
        _ancestor: OccurrenceId,
        _descendant: OccurrenceId,
    ) -> Result<Option<u32>> {
        Ok(None)
    }

    async fn export_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn import_snapshot(&self, _snapshot: Snapshot) -> Result<()> {
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}
