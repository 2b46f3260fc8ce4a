//! Integration tests for JSONL snapshot persistence.
//!
//! # Test Coverage
//!
//! - Round trip through `save_to_jsonl` and `load_from_jsonl`
//! - Resilient loading: malformed and dangling records become warnings
//! - Storage opened on a missing file, then saved and reloaded
//! - Identifier allocation continues after a load

use depchain::config::EngineConfig;
use depchain::domain::{OccurrenceId, ProjectId};
use depchain::engine::{Engine, ScanEntry};
use depchain::storage::in_memory::{
    load_from_jsonl, new_in_memory_storage, open_jsonl_storage, save_to_jsonl, LoadWarning,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

mod common;
use common::{id_of, ingest_named, scan, signatures};

const PROJECT: ProjectId = ProjectId::new(1);

// =============================================================================
// Test Helpers
// =============================================================================

fn entries() -> Vec<ScanEntry> {
    vec![
        ScanEntry::new("myapp", "1.0"),
        ScanEntry::new("curl", "7.0")
            .with_parent("myapp", "1.0")
            .with_package_manager("apk")
            .with_license("curl"),
        ScanEntry::new("openssl", "1.1").with_parent("curl", "7.0"),
    ]
}

/// Ingest the sample scan into fresh storage and save it to a temp file
async fn saved_snapshot() -> (NamedTempFile, Vec<(OccurrenceId, String)>) {
    let storage = new_in_memory_storage();
    let engine = Engine::new(storage.clone(), EngineConfig::default()).unwrap();
    let ids = ingest_named(&engine, scan(entries())).await;

    let file = NamedTempFile::new().expect("Failed to create temp file");
    save_to_jsonl(storage.as_ref(), file.path()).await.unwrap();
    (file, ids)
}

fn append_lines(file: &NamedTempFile, lines: &[&str]) {
    let mut handle = std::fs::OpenOptions::new()
        .append(true)
        .open(file.path())
        .expect("Failed to open temp file");
    for line in lines {
        writeln!(handle, "{line}").expect("Failed to append line");
    }
}

// =============================================================================
// Round Trip
// =============================================================================

#[tokio::test]
async fn test_round_trip_preserves_resolution_and_closure() {
    let (file, ids) = saved_snapshot().await;

    let (storage, warnings) = load_from_jsonl(file.path()).await.unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let engine = Engine::new(storage, EngineConfig::default()).unwrap();
    let resolution = engine.resolve(id_of(&ids, "openssl"), PROJECT).await.unwrap();
    assert_eq!(signatures(&resolution), vec!["myapp@1.0>curl@7.0>openssl@1.1"]);
    assert_eq!(
        engine
            .is_descendant(id_of(&ids, "myapp"), id_of(&ids, "openssl"))
            .await
            .unwrap(),
        Some(2)
    );

    let curl = engine
        .storage()
        .get_occurrence(id_of(&ids, "curl"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(curl.metadata.package_manager.as_deref(), Some("apk"));
    assert_eq!(curl.metadata.licenses[0].spdx_identifier, "curl");
}

#[tokio::test]
async fn test_snapshot_is_stable_across_save_cycles() {
    let (file, _) = saved_snapshot().await;
    let first = std::fs::read_to_string(file.path()).unwrap();

    let (storage, _) = load_from_jsonl(file.path()).await.unwrap();
    storage.save().await.unwrap();
    let second = std::fs::read_to_string(file.path()).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_ids_continue_after_load() {
    let (file, ids) = saved_snapshot().await;
    let (storage, _) = load_from_jsonl(file.path()).await.unwrap();
    let engine = Engine::new(storage, EngineConfig::default()).unwrap();

    let added = ingest_named(
        &engine,
        common::scan_for(
            PROJECT,
            depchain::domain::SourceId::new(2),
            vec![ScanEntry::new("zlib", "1.3").with_parent("openssl", "1.1")],
        ),
    )
    .await;

    let max_loaded = ids.iter().map(|(id, _)| *id).max().unwrap();
    assert!(id_of(&added, "zlib") > max_loaded);
    assert!(engine
        .storage()
        .get_occurrence(id_of(&ids, "openssl"))
        .await
        .unwrap()
        .is_some());
}

// =============================================================================
// Resilient Loading
// =============================================================================

#[tokio::test]
async fn test_malformed_lines_become_warnings() {
    let (file, ids) = saved_snapshot().await;
    let valid_lines = std::fs::read_to_string(file.path()).unwrap().lines().count();
    append_lines(&file, &["{not json", ""]);

    let (storage, warnings) = load_from_jsonl(file.path()).await.unwrap();

    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        LoadWarning::MalformedJson { line_number, .. } if *line_number == valid_lines + 1
    ));
    assert!(storage
        .get_occurrence(id_of(&ids, "myapp"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_dangling_records_are_skipped() {
    let (file, ids) = saved_snapshot().await;
    let myapp = id_of(&ids, "myapp");
    let dangling_row = format!(
        r#"{{"kind":"graph_path","ancestor_occurrence_id":{myapp},"descendant_occurrence_id":9999,"path_length":1,"project_id":1}}"#
    );
    append_lines(
        &file,
        &[
            r#"{"kind":"component_version","id":77,"component_id":404,"version":"0.0.1"}"#,
            &dangling_row,
        ],
    );

    let (storage, warnings) = load_from_jsonl(file.path()).await.unwrap();

    assert_eq!(warnings.len(), 2);
    assert!(warnings
        .iter()
        .any(|w| matches!(w, LoadWarning::OrphanedVersion { .. })));
    assert!(warnings
        .iter()
        .any(|w| matches!(w, LoadWarning::InvalidGraphPath { .. })));
    assert_eq!(
        storage
            .is_descendant(myapp, OccurrenceId::new(9999))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_duplicate_occurrence_keeps_first() {
    let (file, _) = saved_snapshot().await;
    let occurrence_line = std::fs::read_to_string(file.path())
        .unwrap()
        .lines()
        .find(|l| l.contains(r#""kind":"occurrence""#))
        .unwrap()
        .to_string();
    append_lines(&file, &[&occurrence_line]);

    let (_, warnings) = load_from_jsonl(file.path()).await.unwrap();

    assert_eq!(warnings.len(), 1);
    assert!(matches!(warnings[0], LoadWarning::DuplicateOccurrence { .. }));
}

// =============================================================================
// Backed Storage
// =============================================================================

#[tokio::test]
async fn test_open_missing_file_then_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("snapshot.jsonl");

    let storage = open_jsonl_storage(path.clone()).await.unwrap();
    assert!(storage.project_ids().await.unwrap().is_empty());

    let engine = Engine::new(storage.clone(), EngineConfig::default()).unwrap();
    let ids = ingest_named(&engine, scan(entries())).await;
    storage.save().await.unwrap();
    assert!(path.exists());

    // Unsaved changes are discarded by reload
    ingest_named(
        &engine,
        common::scan_for(ProjectId::new(2), depchain::domain::SourceId::new(1), entries()),
    )
    .await;
    storage.reload().await.unwrap();

    assert_eq!(storage.project_ids().await.unwrap(), vec![PROJECT]);
    assert!(storage
        .get_occurrence(id_of(&ids, "curl"))
        .await
        .unwrap()
        .is_some());
}
