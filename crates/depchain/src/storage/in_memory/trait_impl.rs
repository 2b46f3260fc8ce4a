//! DependencyStorage trait implementation for in-memory storage.

use super::inner::InMemoryStorageInner;
use super::jsonl::{log_warnings, read_snapshot, save_to_jsonl};
use super::sorting::{sort_listing, Listed};
use super::InMemoryStorage;
use crate::closure::ClosureTable;
use crate::domain::{
    Component, ComponentId, ComponentVersion, ComponentVersionId, Coordinate, GraphPath,
    LicenseFilter, NewComponent, NewOccurrence, Occurrence, OccurrenceFilter, OccurrenceId,
    OccurrenceNode, OccurrenceSort, OrganizationId, ProjectGraph, ProjectId, SourceId,
};
use crate::error::{Error, Result};
use crate::storage::{DependencyStorage, Snapshot};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
impl DependencyStorage for InMemoryStorage {
    async fn lookup_or_create_component(&self, component: NewComponent) -> Result<Component> {
        let mut inner = self.state.lock().await;
        inner.lookup_or_create_component(component)
    }

    async fn lookup_or_create_version(
        &self,
        component_id: ComponentId,
        version: &str,
    ) -> Result<ComponentVersion> {
        let mut inner = self.state.lock().await;
        inner.lookup_or_create_version(component_id, version)
    }

    async fn get_component(&self, id: ComponentId) -> Result<Option<Component>> {
        let inner = self.state.lock().await;
        Ok(inner.components.get(&id).cloned())
    }

    async fn get_component_version(
        &self,
        id: ComponentVersionId,
    ) -> Result<Option<ComponentVersion>> {
        let inner = self.state.lock().await;
        Ok(inner.versions.get(&id).cloned())
    }

    async fn search_components(
        &self,
        organization_id: OrganizationId,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Component>> {
        let inner = self.state.lock().await;
        let needle = query.to_lowercase();

        let mut matches: Vec<Component> = inner
            .components
            .values()
            .filter(|c| c.organization_id == organization_id)
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    async fn insert_occurrence(&self, occurrence: NewOccurrence) -> Result<Occurrence> {
        let mut inner = self.state.lock().await;
        inner.check_new_occurrences(std::slice::from_ref(&occurrence))?;
        inner.create_occurrence(occurrence)
    }

    async fn insert_occurrences(&self, occurrences: Vec<NewOccurrence>) -> Result<Vec<Occurrence>> {
        let mut inner = self.state.lock().await;
        inner.check_new_occurrences(&occurrences)?;
        occurrences
            .into_iter()
            .map(|o| inner.create_occurrence(o))
            .collect()
    }

    async fn supersede_source(
        &self,
        project_id: ProjectId,
        source_id: SourceId,
        occurrences: Vec<NewOccurrence>,
    ) -> Result<Vec<Occurrence>> {
        let mut inner = self.state.lock().await;

        if let Some(stray) = occurrences
            .iter()
            .find(|o| o.project_id != project_id || o.source_id != source_id)
        {
            return Err(Error::InvalidInput(format!(
                "Occurrence for project {} / source {} can't supersede project {project_id} / source {source_id}",
                stray.project_id, stray.source_id
            )));
        }
        inner.check_new_occurrences(&occurrences)?;

        let previous = inner.source_occurrences(project_id, source_id);
        let dropped_rows = inner.remove_occurrences(&previous);
        debug!(
            project = %project_id,
            source = %source_id,
            removed = previous.len(),
            dropped_rows,
            "Superseded source occurrences"
        );

        occurrences
            .into_iter()
            .map(|o| inner.create_occurrence(o))
            .collect()
    }

    async fn get_occurrence(&self, id: OccurrenceId) -> Result<Option<Occurrence>> {
        let inner = self.state.lock().await;
        Ok(inner.occurrences.get(&id).cloned())
    }

    async fn list_occurrences(
        &self,
        filter: &OccurrenceFilter,
        sort: OccurrenceSort,
    ) -> Result<Vec<Occurrence>> {
        let inner = self.state.lock().await;
        let name_needle = filter.name.as_ref().map(|n| n.to_lowercase());

        let mut rows: Vec<Listed<'_>> = inner
            .occurrences
            .values()
            .filter(|o| filter.project_id.is_none_or(|p| o.project_id == p))
            .filter(|o| filter.source_id.is_none_or(|s| o.source_id == s))
            .filter(|o| {
                filter.package_managers.is_empty()
                    || o.metadata
                        .package_manager
                        .as_ref()
                        .is_some_and(|pm| filter.package_managers.contains(pm))
            })
            .filter(|o| filter.licenses.is_empty() || filter.licenses.iter().any(|l| license_matches(l, o)))
            .map(|occurrence| Listed {
                occurrence,
                name: inner.component_name(occurrence),
            })
            .filter(|row| {
                name_needle
                    .as_ref()
                    .is_none_or(|needle| row.name.to_lowercase().contains(needle))
            })
            .collect();

        sort_listing(&mut rows, sort);

        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|row| row.occurrence.clone())
            .collect())
    }

    async fn occurrence_node(
        &self,
        project_id: ProjectId,
        id: OccurrenceId,
    ) -> Result<Option<OccurrenceNode>> {
        let inner = self.state.lock().await;
        Ok(inner
            .occurrences
            .get(&id)
            .filter(|o| o.project_id == project_id)
            .and_then(|o| inner.node_of(o)))
    }

    async fn occurrence_nodes_by_coordinates(
        &self,
        project_id: ProjectId,
        coordinates: &[Coordinate],
    ) -> Result<Vec<OccurrenceNode>> {
        let inner = self.state.lock().await;
        Ok(inner.nodes_by_coordinates(project_id, coordinates))
    }

    async fn project_graph(&self, project_id: ProjectId) -> Result<ProjectGraph> {
        let inner = self.state.lock().await;
        Ok(ProjectGraph {
            generation: inner.generation(project_id),
            nodes: inner.project_nodes(project_id),
        })
    }

    async fn project_ids(&self) -> Result<Vec<ProjectId>> {
        let inner = self.state.lock().await;
        Ok(inner.project_ids())
    }

    async fn replace_closure(
        &self,
        project_id: ProjectId,
        generation: u64,
        rows: Vec<GraphPath>,
    ) -> Result<()> {
        let mut inner = self.state.lock().await;

        let actual = inner.generation(project_id);
        if actual != generation {
            return Err(Error::StaleClosure {
                project: project_id,
                expected: generation,
                actual,
            });
        }
        inner.check_closure_rows(project_id, &rows)?;

        inner.closure.insert(project_id, ClosureTable::from_rows(rows));
        Ok(())
    }

    async fn merge_closure(&self, project_id: ProjectId, rows: Vec<GraphPath>) -> Result<usize> {
        let mut inner = self.state.lock().await;
        inner.check_closure_rows(project_id, &rows)?;

        let table = inner.closure.entry(project_id).or_default();
        Ok(rows
            .iter()
            .filter(|r| {
                table.insert_min(r.ancestor_occurrence_id, r.descendant_occurrence_id, r.path_length)
            })
            .count())
    }

    async fn closure_rows(&self, project_id: ProjectId) -> Result<Vec<GraphPath>> {
        let inner = self.state.lock().await;
        Ok(inner
            .closure
            .get(&project_id)
            .map(|t| t.to_rows(project_id))
            .unwrap_or_default())
    }

    async fn closure_rows_to(&self, descendant: OccurrenceId) -> Result<Vec<GraphPath>> {
        let inner = self.state.lock().await;
        let Some(project_id) = inner.occurrences.get(&descendant).map(|o| o.project_id) else {
            return Ok(vec![]);
        };
        Ok(inner
            .closure
            .get(&project_id)
            .into_iter()
            .flat_map(|t| t.ancestors_of(descendant))
            .map(|(ancestor, path_length)| GraphPath {
                ancestor_occurrence_id: ancestor,
                descendant_occurrence_id: descendant,
                path_length,
                project_id,
            })
            .collect())
    }

    async fn is_descendant(
        &self,
        ancestor: OccurrenceId,
        descendant: OccurrenceId,
    ) -> Result<Option<u32>> {
        let inner = self.state.lock().await;
        let Some(project_id) = inner.occurrences.get(&descendant).map(|o| o.project_id) else {
            return Ok(None);
        };
        Ok(inner
            .closure
            .get(&project_id)
            .and_then(|t| t.get(ancestor, descendant)))
    }

    async fn export_snapshot(&self) -> Result<Snapshot> {
        let inner = self.state.lock().await;
        Ok(inner.export())
    }

    async fn import_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut inner = self.state.lock().await;

        for component in snapshot.components {
            inner.insert_component_row(component);
        }
        for version in snapshot.versions {
            if !inner.components.contains_key(&version.component_id) {
                return Err(Error::ComponentNotFound(version.component_id));
            }
            inner.insert_version_row(version);
        }
        for occurrence in snapshot.occurrences {
            if !inner.versions.contains_key(&occurrence.component_version_id) {
                return Err(Error::ComponentVersionNotFound(
                    occurrence.component_version_id,
                ));
            }
            inner.insert_occurrence_row(occurrence);
        }
        for row in snapshot.closure {
            inner.check_closure_rows(row.project_id, &[row])?;
            inner.closure.entry(row.project_id).or_default().insert_min(
                row.ancestor_occurrence_id,
                row.descendant_occurrence_id,
                row.path_length,
            );
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        match &self.backing {
            Some(path) => save_to_jsonl(self, path).await,
            None => Ok(()),
        }
    }

    async fn reload(&self) -> Result<()> {
        let Some(path) = &self.backing else {
            return Ok(());
        };

        let fresh = if tokio::fs::try_exists(path).await? {
            let (inner, warnings) = read_snapshot(path).await?;
            log_warnings(path, &warnings);
            inner
        } else {
            InMemoryStorageInner::new()
        };
        *self.state.lock().await = fresh;
        Ok(())
    }
}

fn license_matches(filter: &LicenseFilter, occurrence: &Occurrence) -> bool {
    let licenses = &occurrence.metadata.licenses;
    match filter {
        LicenseFilter::Unknown => licenses.is_empty(),
        LicenseFilter::Spdx(id) => licenses
            .iter()
            .any(|l| l.spdx_identifier.eq_ignore_ascii_case(id)),
    }
}
