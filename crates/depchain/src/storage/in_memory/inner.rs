//! Core in-memory storage data structures.
//!
//! This module contains the inner storage structure that holds all data
//! and is wrapped in `Arc<Mutex<>>` for thread safety. Every index is kept in
//! step with the primary maps by the `insert_*_row` and `remove_occurrences`
//! helpers; nothing else mutates them.

use crate::closure::ClosureTable;
use crate::domain::{
    Component, ComponentId, ComponentVersion, ComponentVersionId, Coordinate, GraphPath,
    NewComponent, NewOccurrence, Occurrence, OccurrenceId, OccurrenceNode, ProjectId, SourceId,
};
use crate::error::{Error, Result};
use crate::id_generation::{UuidGenerator, UuidSeed};
use crate::storage::Snapshot;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Inner storage structure (not thread-safe).
#[derive(Debug, Default)]
pub(crate) struct InMemoryStorageInner {
    /// Components by id
    pub(super) components: BTreeMap<ComponentId, Component>,

    /// Unique key `(name, purl_type, component_type, organization)` to id
    component_keys: HashMap<NewComponent, ComponentId>,

    /// Versions by id
    pub(super) versions: BTreeMap<ComponentVersionId, ComponentVersion>,

    /// Unique key `(component, version)` to id
    version_keys: HashMap<(ComponentId, String), ComponentVersionId>,

    /// Occurrences by id
    pub(super) occurrences: BTreeMap<OccurrenceId, Occurrence>,

    /// `(project, name, version)` to the occurrences carrying that coordinate
    coordinate_index: HashMap<(ProjectId, Coordinate), BTreeSet<OccurrenceId>>,

    /// Occurrence ids per project
    project_occurrences: HashMap<ProjectId, BTreeSet<OccurrenceId>>,

    /// Membership generation per project, bumped on every insert or removal
    generations: HashMap<ProjectId, u64>,

    /// Closure rows per project
    pub(super) closure: HashMap<ProjectId, ClosureTable>,

    next_component_id: u64,
    next_version_id: u64,
    next_occurrence_id: u64,

    uuids: UuidGenerator,
}

impl InMemoryStorageInner {
    /// Create a new empty storage instance
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ========== Registry ==========

    pub(super) fn lookup_or_create_component(&mut self, key: NewComponent) -> Result<Component> {
        key.validate().map_err(Error::InvalidInput)?;

        if let Some(id) = self.component_keys.get(&key) {
            return Ok(self.components[id].clone());
        }

        self.next_component_id += 1;
        let component = Component {
            id: ComponentId::new(self.next_component_id),
            name: key.name,
            purl_type: key.purl_type,
            component_type: key.component_type,
            organization_id: key.organization_id,
        };
        self.insert_component_row(component.clone());
        Ok(component)
    }

    pub(super) fn lookup_or_create_version(
        &mut self,
        component_id: ComponentId,
        version: &str,
    ) -> Result<ComponentVersion> {
        if !self.components.contains_key(&component_id) {
            return Err(Error::ComponentNotFound(component_id));
        }
        if version.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Version string cannot be empty".to_string(),
            ));
        }

        if let Some(id) = self.version_keys.get(&(component_id, version.to_string())) {
            return Ok(self.versions[id].clone());
        }

        self.next_version_id += 1;
        let row = ComponentVersion {
            id: ComponentVersionId::new(self.next_version_id),
            component_id,
            version: version.to_string(),
        };
        self.insert_version_row(row.clone());
        Ok(row)
    }

    pub(super) fn insert_component_row(&mut self, component: Component) {
        self.next_component_id = self.next_component_id.max(component.id.get());
        self.component_keys.insert(
            NewComponent {
                name: component.name.clone(),
                purl_type: component.purl_type,
                component_type: component.component_type,
                organization_id: component.organization_id,
            },
            component.id,
        );
        self.components.insert(component.id, component);
    }

    pub(super) fn insert_version_row(&mut self, version: ComponentVersion) {
        self.next_version_id = self.next_version_id.max(version.id.get());
        self.version_keys
            .insert((version.component_id, version.version.clone()), version.id);
        self.versions.insert(version.id, version);
    }

    // ========== Occurrences ==========

    /// Validate a batch before anything is written
    pub(super) fn check_new_occurrences(&self, batch: &[NewOccurrence]) -> Result<()> {
        for occurrence in batch {
            occurrence.validate().map_err(Error::InvalidInput)?;
            if !self.versions.contains_key(&occurrence.component_version_id) {
                return Err(Error::ComponentVersionNotFound(
                    occurrence.component_version_id,
                ));
            }
        }
        Ok(())
    }

    /// Store an occurrence that already passed [`check_new_occurrences`].
    ///
    /// [`check_new_occurrences`]: Self::check_new_occurrences
    pub(super) fn create_occurrence(&mut self, new: NewOccurrence) -> Result<Occurrence> {
        let version = self
            .versions
            .get(&new.component_version_id)
            .ok_or(Error::ComponentVersionNotFound(new.component_version_id))?;
        let component_id = version.component_id;

        let uuid = self.uuids.generate(&UuidSeed {
            project_id: new.project_id.get(),
            component_version_id: new.component_version_id.get(),
            source_id: new.source_id.get(),
            commit_sha: &new.commit_sha,
            input_file_path: new.metadata.input_file_path.as_deref(),
        })?;

        self.next_occurrence_id += 1;
        let occurrence = Occurrence {
            id: OccurrenceId::new(self.next_occurrence_id),
            uuid,
            project_id: new.project_id,
            component_id,
            component_version_id: new.component_version_id,
            source_id: new.source_id,
            commit_sha: new.commit_sha,
            ancestors: new.ancestors,
            metadata: new.metadata,
            created_at: Utc::now(),
        };
        self.insert_occurrence_row(occurrence.clone());
        Ok(occurrence)
    }

    /// Index and store an occurrence row, bumping its project's generation
    pub(super) fn insert_occurrence_row(&mut self, occurrence: Occurrence) {
        self.next_occurrence_id = self.next_occurrence_id.max(occurrence.id.get());
        self.uuids.register(occurrence.uuid.clone());

        if let Some(coordinate) = self.coordinate_of(&occurrence) {
            self.coordinate_index
                .entry((occurrence.project_id, coordinate))
                .or_default()
                .insert(occurrence.id);
        }
        self.project_occurrences
            .entry(occurrence.project_id)
            .or_default()
            .insert(occurrence.id);
        self.bump_generation(occurrence.project_id);
        self.occurrences.insert(occurrence.id, occurrence);
    }

    /// Remove occurrences along with every closure row that may route through them.
    ///
    /// Returns the number of closure rows dropped.
    pub(super) fn remove_occurrences(&mut self, ids: &HashSet<OccurrenceId>) -> usize {
        let mut touched_projects = BTreeSet::new();
        for id in ids {
            let Some(occurrence) = self.occurrences.remove(id) else {
                continue;
            };
            self.uuids.release(&occurrence.uuid);
            if let Some(coordinate) = self.coordinate_of(&occurrence) {
                let key = (occurrence.project_id, coordinate);
                if let Some(set) = self.coordinate_index.get_mut(&key) {
                    set.remove(id);
                    if set.is_empty() {
                        self.coordinate_index.remove(&key);
                    }
                }
            }
            if let Some(set) = self.project_occurrences.get_mut(&occurrence.project_id) {
                set.remove(id);
            }
            touched_projects.insert(occurrence.project_id);
        }

        let mut dropped = 0;
        for project in touched_projects {
            self.bump_generation(project);
            if let Some(table) = self.closure.get_mut(&project) {
                dropped += table.remove_through(ids);
            }
        }
        dropped
    }

    /// Ids of the occurrences a source reported for a project
    pub(super) fn source_occurrences(
        &self,
        project_id: ProjectId,
        source_id: SourceId,
    ) -> HashSet<OccurrenceId> {
        self.project_occurrences
            .get(&project_id)
            .into_iter()
            .flatten()
            .filter(|id| self.occurrences[*id].source_id == source_id)
            .copied()
            .collect()
    }

    fn bump_generation(&mut self, project_id: ProjectId) {
        *self.generations.entry(project_id).or_default() += 1;
    }

    pub(super) fn generation(&self, project_id: ProjectId) -> u64 {
        self.generations.get(&project_id).copied().unwrap_or_default()
    }

    // ========== Graph projection ==========

    /// Component name and version of an occurrence
    pub(super) fn coordinate_of(&self, occurrence: &Occurrence) -> Option<Coordinate> {
        let component = self.components.get(&occurrence.component_id)?;
        let version = self.versions.get(&occurrence.component_version_id)?;
        Some(Coordinate::new(&component.name, &version.version))
    }

    pub(super) fn component_name(&self, occurrence: &Occurrence) -> &str {
        self.components
            .get(&occurrence.component_id)
            .map_or("", |c| c.name.as_str())
    }

    pub(super) fn node_of(&self, occurrence: &Occurrence) -> Option<OccurrenceNode> {
        Some(OccurrenceNode {
            id: occurrence.id,
            project_id: occurrence.project_id,
            coordinate: self.coordinate_of(occurrence)?,
            ancestors: occurrence.ancestors.clone(),
        })
    }

    pub(super) fn nodes_by_coordinates(
        &self,
        project_id: ProjectId,
        coordinates: &[Coordinate],
    ) -> Vec<OccurrenceNode> {
        let ids: BTreeSet<OccurrenceId> = coordinates
            .iter()
            .filter_map(|c| self.coordinate_index.get(&(project_id, c.clone())))
            .flatten()
            .copied()
            .collect();
        ids.iter()
            .filter_map(|id| self.occurrences.get(id))
            .filter_map(|o| self.node_of(o))
            .collect()
    }

    pub(super) fn project_nodes(&self, project_id: ProjectId) -> Vec<OccurrenceNode> {
        self.project_occurrences
            .get(&project_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.occurrences.get(id))
            .filter_map(|o| self.node_of(o))
            .collect()
    }

    pub(super) fn project_ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self
            .project_occurrences
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // ========== Closure ==========

    /// Check that every row is a well-formed pair of occurrences in `project_id`
    pub(super) fn check_closure_rows(&self, project_id: ProjectId, rows: &[GraphPath]) -> Result<()> {
        let members = self.project_occurrences.get(&project_id);
        let is_member = |id: &OccurrenceId| members.is_some_and(|set| set.contains(id));

        for row in rows {
            if row.project_id != project_id {
                return Err(Error::InvalidInput(format!(
                    "Closure row {} -> {} belongs to project {}, expected {}",
                    row.ancestor_occurrence_id, row.descendant_occurrence_id, row.project_id, project_id
                )));
            }
            if row.path_length == 0 || row.ancestor_occurrence_id == row.descendant_occurrence_id {
                return Err(Error::InvalidInput(format!(
                    "Closure row {} -> {} must join distinct occurrences with length >= 1",
                    row.ancestor_occurrence_id, row.descendant_occurrence_id
                )));
            }
            for id in [row.ancestor_occurrence_id, row.descendant_occurrence_id] {
                if !is_member(&id) {
                    return Err(Error::OccurrenceNotFound(id));
                }
            }
        }
        Ok(())
    }

    // ========== Snapshot ==========

    pub(super) fn export(&self) -> Snapshot {
        let mut closure: Vec<GraphPath> = self
            .closure
            .iter()
            .flat_map(|(project, table)| table.to_rows(*project))
            .collect();
        closure.sort_by_key(|r| (r.project_id, r.ancestor_occurrence_id, r.descendant_occurrence_id));

        Snapshot {
            components: self.components.values().cloned().collect(),
            versions: self.versions.values().cloned().collect(),
            occurrences: self.occurrences.values().cloned().collect(),
            closure,
        }
    }
}
