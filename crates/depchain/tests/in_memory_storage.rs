//! Integration tests for the in-memory storage backend.
//!
//! Covers the registry under concurrent callers, occurrence listings,
//! source supersession and the closure write protocol.

use depchain::config::EngineConfig;
use depchain::domain::{
    ComponentType, GraphPath, LicenseFilter, NewComponent, NewOccurrence, NullsOrder,
    OccurrenceFilter, OccurrenceMetadata, OccurrenceSort, OrganizationId, ProjectId, PurlType,
    Severity, SortDirection, SortField, SourceId,
};
use depchain::engine::ScanEntry;
use depchain::error::Error;
use depchain::storage::in_memory::new_in_memory_storage;
use depchain::storage::DependencyStorage;
use rstest::{fixture, rstest};
use std::sync::Arc;

mod common;
use common::{engine, id_of, ingest_named, scan, scan_for};

const PROJECT: ProjectId = ProjectId::new(1);

fn new_component(name: &str) -> NewComponent {
    NewComponent {
        name: name.to_string(),
        purl_type: PurlType::Npm,
        component_type: ComponentType::Library,
        organization_id: OrganizationId::new(1),
    }
}

#[fixture]
fn storage() -> Arc<dyn DependencyStorage> {
    new_in_memory_storage()
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookup_or_create_yields_one_component() {
    let storage = new_in_memory_storage();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let storage = Arc::clone(&storage);
            tokio::spawn(async move {
                let component = storage
                    .lookup_or_create_component(new_component("left-pad"))
                    .await
                    .unwrap();
                let version = storage
                    .lookup_or_create_version(component.id, "1.3.0")
                    .await
                    .unwrap();
                (component.id, version.id)
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results.dedup();
    assert_eq!(results.len(), 1);

    let found = storage
        .search_components(OrganizationId::new(1), "left", None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_component_identity_includes_type_and_organization(storage: Arc<dyn DependencyStorage>) {
    let npm = storage
        .lookup_or_create_component(new_component("ms"))
        .await
        .unwrap();
    let pypi = storage
        .lookup_or_create_component(NewComponent {
            purl_type: PurlType::Pypi,
            ..new_component("ms")
        })
        .await
        .unwrap();
    let other_org = storage
        .lookup_or_create_component(NewComponent {
            organization_id: OrganizationId::new(2),
            ..new_component("ms")
        })
        .await
        .unwrap();

    assert_ne!(npm.id, pypi.id);
    assert_ne!(npm.id, other_org.id);
    assert_eq!(
        storage
            .lookup_or_create_component(new_component("ms"))
            .await
            .unwrap(),
        npm
    );
}

#[rstest]
#[tokio::test]
async fn test_registry_rejects_blank_and_unknown(storage: Arc<dyn DependencyStorage>) {
    let blank = storage.lookup_or_create_component(new_component("  ")).await;
    assert!(matches!(blank, Err(Error::InvalidInput(_))));

    let component = storage
        .lookup_or_create_component(new_component("zlib"))
        .await
        .unwrap();
    let blank_version = storage.lookup_or_create_version(component.id, "").await;
    assert!(matches!(blank_version, Err(Error::InvalidInput(_))));

    let missing = storage
        .lookup_or_create_version(depchain::domain::ComponentId::new(999), "1.0")
        .await;
    assert!(matches!(missing, Err(Error::ComponentNotFound(_))));
}

#[rstest]
#[tokio::test]
async fn test_search_is_case_insensitive_and_ordered(storage: Arc<dyn DependencyStorage>) {
    for name in ["React-DOM", "react", "preact", "vue"] {
        storage
            .lookup_or_create_component(new_component(name))
            .await
            .unwrap();
    }

    let names: Vec<_> = storage
        .search_components(OrganizationId::new(1), "REACT", None)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["React-DOM", "preact", "react"]);

    let limited = storage
        .search_components(OrganizationId::new(1), "react", Some(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

// ============================================================================
// Occurrence Listings
// ============================================================================

async fn listing_fixture() -> depchain::engine::Engine {
    let engine = engine(EngineConfig::default());
    let mut critical = ScanEntry::new("lodash", "4.17.20")
        .with_package_manager("npm")
        .with_license("MIT");
    critical.highest_severity = Some(Severity::Critical);
    let mut low = ScanEntry::new("rails", "7.0")
        .with_package_manager("bundler")
        .with_license("MIT");
    low.highest_severity = Some(Severity::Low);
    let unlicensed = ScanEntry::new("mystery", "0.1").with_package_manager("npm");
    let gpl = ScanEntry::new("readline", "8.2").with_license("GPL-3.0-only");

    ingest_named(&engine, scan(vec![critical, low, unlicensed, gpl])).await;
    ingest_named(
        &engine,
        scan_for(ProjectId::new(2), SourceId::new(1), vec![ScanEntry::new("other", "1")]),
    )
    .await;
    engine
}

async fn listed_names(
    engine: &depchain::engine::Engine,
    filter: OccurrenceFilter,
    sort: OccurrenceSort,
) -> Vec<String> {
    let storage = engine.storage();
    let mut names = Vec::new();
    for occurrence in storage.list_occurrences(&filter, sort).await.unwrap() {
        let component = storage
            .get_component(occurrence.component_id)
            .await
            .unwrap()
            .unwrap();
        names.push(component.name);
    }
    names
}

fn project_filter() -> OccurrenceFilter {
    OccurrenceFilter {
        project_id: Some(PROJECT),
        ..OccurrenceFilter::default()
    }
}

#[tokio::test]
async fn test_list_filters_by_package_manager() {
    let engine = listing_fixture().await;
    let filter = OccurrenceFilter {
        package_managers: vec!["npm".to_string()],
        ..project_filter()
    };

    let names = listed_names(&engine, filter, OccurrenceSort::default()).await;
    assert_eq!(names, vec!["lodash", "mystery"]);
}

#[rstest]
#[case::unknown(vec![LicenseFilter::Unknown], vec!["mystery"])]
#[case::spdx_case_insensitive(vec![LicenseFilter::Spdx("mit".to_string())], vec!["lodash", "rails"])]
#[case::either(
    vec![LicenseFilter::Unknown, LicenseFilter::Spdx("GPL-3.0-only".to_string())],
    vec!["mystery", "readline"]
)]
#[tokio::test]
async fn test_list_filters_by_license(
    #[case] licenses: Vec<LicenseFilter>,
    #[case] expected: Vec<&str>,
) {
    let engine = listing_fixture().await;
    let filter = OccurrenceFilter {
        licenses,
        ..project_filter()
    };

    let names = listed_names(&engine, filter, OccurrenceSort::default()).await;
    assert_eq!(names, expected);
}

#[rstest]
#[case::desc_nulls_last(SortDirection::Desc, NullsOrder::Last, vec!["lodash", "rails", "mystery", "readline"])]
#[case::asc_nulls_last(SortDirection::Asc, NullsOrder::Last, vec!["rails", "lodash", "mystery", "readline"])]
#[case::desc_nulls_first(SortDirection::Desc, NullsOrder::First, vec!["mystery", "readline", "lodash", "rails"])]
#[tokio::test]
async fn test_list_sorts_by_severity(
    #[case] direction: SortDirection,
    #[case] nulls: NullsOrder,
    #[case] expected: Vec<&str>,
) {
    let engine = listing_fixture().await;
    let sort = OccurrenceSort::by(SortField::Severity)
        .direction(direction)
        .nulls(nulls);

    let names = listed_names(&engine, project_filter(), sort).await;
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_list_name_filter_and_limit() {
    let engine = listing_fixture().await;

    let by_name = OccurrenceFilter {
        name: Some("READ".to_string()),
        ..project_filter()
    };
    assert_eq!(
        listed_names(&engine, by_name, OccurrenceSort::default()).await,
        vec!["readline"]
    );

    let limited = OccurrenceFilter {
        limit: Some(2),
        ..project_filter()
    };
    assert_eq!(
        listed_names(&engine, limited, OccurrenceSort::default()).await,
        vec!["lodash", "mystery"]
    );
}

// ============================================================================
// Supersession and Closure Writes
// ============================================================================

#[tokio::test]
async fn test_supersede_only_replaces_the_same_source() {
    let engine = engine(EngineConfig::default());
    let first = ingest_named(
        &engine,
        scan(vec![
            ScanEntry::new("a", "1"),
            ScanEntry::new("b", "1").with_parent("a", "1"),
        ]),
    )
    .await;
    let other = ingest_named(
        &engine,
        scan_for(PROJECT, SourceId::new(2), vec![ScanEntry::new("c", "1").with_parent("b", "1")]),
    )
    .await;
    let storage = engine.storage();
    assert_eq!(storage.closure_rows(PROJECT).await.unwrap().len(), 3);

    ingest_named(&engine, scan(vec![ScanEntry::new("a", "1")])).await;

    assert!(storage.get_occurrence(id_of(&first, "b")).await.unwrap().is_none());
    assert!(storage.get_occurrence(id_of(&other, "c")).await.unwrap().is_some());
    let rows = storage.closure_rows(PROJECT).await.unwrap();
    assert!(rows.iter().all(|r| r.ancestor_occurrence_id != id_of(&first, "a")
        && r.descendant_occurrence_id != id_of(&first, "b")));
}

#[tokio::test]
async fn test_supersede_drops_rows_routed_through_removed_occurrences() {
    let engine = engine(EngineConfig::default());
    let a = ingest_named(&engine, scan(vec![ScanEntry::new("a", "1")])).await;
    ingest_named(
        &engine,
        scan_for(PROJECT, SourceId::new(2), vec![ScanEntry::new("b", "1").with_parent("a", "1")]),
    )
    .await;
    let c = ingest_named(
        &engine,
        scan_for(PROJECT, SourceId::new(3), vec![ScanEntry::new("c", "1").with_parent("b", "1")]),
    )
    .await;
    let storage = engine.storage();
    let (a, c) = (id_of(&a, "a"), id_of(&c, "c"));
    assert_eq!(storage.is_descendant(a, c).await.unwrap(), Some(2));

    storage
        .supersede_source(PROJECT, SourceId::new(2), vec![])
        .await
        .unwrap();

    assert_eq!(storage.is_descendant(a, c).await.unwrap(), None);
    assert!(storage.closure_rows(PROJECT).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_supersede_rejects_foreign_rows(storage: Arc<dyn DependencyStorage>) {
    let component = storage
        .lookup_or_create_component(new_component("a"))
        .await
        .unwrap();
    let version = storage
        .lookup_or_create_version(component.id, "1")
        .await
        .unwrap();

    let result = storage
        .supersede_source(
            PROJECT,
            SourceId::new(1),
            vec![NewOccurrence {
                project_id: PROJECT,
                component_version_id: version.id,
                source_id: SourceId::new(2),
                commit_sha: "abc".to_string(),
                ancestors: vec![],
                metadata: OccurrenceMetadata::default(),
            }],
        )
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(storage.project_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replace_closure_detects_stale_generation() {
    let engine = engine(EngineConfig::default());
    let ids = ingest_named(
        &engine,
        scan(vec![
            ScanEntry::new("a", "1"),
            ScanEntry::new("b", "1").with_parent("a", "1"),
        ]),
    )
    .await;
    let storage = engine.storage();
    let graph = storage.project_graph(PROJECT).await.unwrap();

    // Membership changes after the graph was read
    ingest_named(
        &engine,
        scan_for(PROJECT, SourceId::new(2), vec![ScanEntry::new("z", "1")]),
    )
    .await;

    let rows = vec![GraphPath {
        ancestor_occurrence_id: id_of(&ids, "a"),
        descendant_occurrence_id: id_of(&ids, "b"),
        path_length: 1,
        project_id: PROJECT,
    }];
    let result = storage.replace_closure(PROJECT, graph.generation, rows).await;

    assert!(matches!(
        result,
        Err(Error::StaleClosure { expected, actual, .. }) if actual > expected
    ));
}

#[tokio::test]
async fn test_closure_writes_validate_rows() {
    let engine = engine(EngineConfig::default());
    let ids = ingest_named(&engine, scan(vec![ScanEntry::new("a", "1")])).await;
    let storage = engine.storage();
    let a = id_of(&ids, "a");

    let self_pair = GraphPath {
        ancestor_occurrence_id: a,
        descendant_occurrence_id: a,
        path_length: 1,
        project_id: PROJECT,
    };
    assert!(matches!(
        storage.merge_closure(PROJECT, vec![self_pair]).await,
        Err(Error::InvalidInput(_))
    ));

    let dangling = GraphPath {
        descendant_occurrence_id: depchain::domain::OccurrenceId::new(500),
        ..self_pair
    };
    assert!(matches!(
        storage.merge_closure(PROJECT, vec![dangling]).await,
        Err(Error::OccurrenceNotFound(_))
    ));
}

#[tokio::test]
async fn test_merge_closure_keeps_minimum() {
    let engine = engine(EngineConfig::default());
    let ids = ingest_named(
        &engine,
        scan(vec![ScanEntry::new("a", "1"), ScanEntry::new("b", "1")]),
    )
    .await;
    let storage = engine.storage();
    let row = |path_length| GraphPath {
        ancestor_occurrence_id: id_of(&ids, "a"),
        descendant_occurrence_id: id_of(&ids, "b"),
        path_length,
        project_id: PROJECT,
    };

    assert_eq!(storage.merge_closure(PROJECT, vec![row(3)]).await.unwrap(), 1);
    assert_eq!(storage.merge_closure(PROJECT, vec![row(5)]).await.unwrap(), 0);
    assert_eq!(storage.merge_closure(PROJECT, vec![row(2)]).await.unwrap(), 1);
    assert_eq!(
        storage
            .is_descendant(id_of(&ids, "a"), id_of(&ids, "b"))
            .await
            .unwrap(),
        Some(2)
    );
}

// ============================================================================
// Direct Inserts and Snapshots
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_insert_occurrences_validates_whole_batch(storage: Arc<dyn DependencyStorage>) {
    let component = storage
        .lookup_or_create_component(new_component("express"))
        .await
        .unwrap();
    let version = storage
        .lookup_or_create_version(component.id, "4.18.2")
        .await
        .unwrap();
    let occurrence = |commit_sha: &str| NewOccurrence {
        project_id: PROJECT,
        component_version_id: version.id,
        source_id: SourceId::new(1),
        commit_sha: commit_sha.to_string(),
        ancestors: vec![],
        metadata: OccurrenceMetadata::default(),
    };

    let result = storage
        .insert_occurrences(vec![occurrence("abc"), occurrence("not-hex")])
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(storage.project_ids().await.unwrap().is_empty());

    let stored = storage.insert_occurrence(occurrence("abc")).await.unwrap();
    assert_eq!(stored.component_id, component.id);
    assert_eq!(
        storage
            .get_component_version(stored.component_version_id)
            .await
            .unwrap()
            .map(|v| v.version),
        Some("4.18.2".to_string())
    );
}

#[tokio::test]
async fn test_import_snapshot_keeps_ids_and_closure() {
    let engine = engine(EngineConfig::default());
    let ids = ingest_named(&engine, scan(common::chain(2))).await;
    let snapshot = engine.storage().export_snapshot().await.unwrap();

    let copy = new_in_memory_storage();
    copy.import_snapshot(snapshot.clone()).await.unwrap();

    assert_eq!(copy.export_snapshot().await.unwrap(), snapshot);
    assert_eq!(
        copy.is_descendant(id_of(&ids, "pkg2"), id_of(&ids, "pkg0"))
            .await
            .unwrap(),
        Some(2)
    );
}
