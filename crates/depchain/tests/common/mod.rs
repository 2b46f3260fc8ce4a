//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use depchain::config::EngineConfig;
use depchain::domain::{OccurrenceId, OrganizationId, ProjectId, SourceId};
use depchain::engine::{Engine, ScanEntry, ScanRequest};
use depchain::storage::in_memory::new_in_memory_storage;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Path of the compiled depchain binary
pub fn depchain_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_depchain"))
}

/// Run the depchain binary in the specified directory
pub fn run_depchain_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(depchain_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute depchain binary")
}

/// An engine over fresh ephemeral storage
pub fn engine(config: EngineConfig) -> Engine {
    Engine::new(new_in_memory_storage(), config).expect("valid engine config")
}

/// A scan of project 1, source 1
pub fn scan(entries: Vec<ScanEntry>) -> ScanRequest {
    scan_for(ProjectId::new(1), SourceId::new(1), entries)
}

/// A scan of an arbitrary project and source
pub fn scan_for(project_id: ProjectId, source_id: SourceId, entries: Vec<ScanEntry>) -> ScanRequest {
    ScanRequest {
        organization_id: OrganizationId::new(1),
        project_id,
        source_id,
        commit_sha: "c0ffee".to_string(),
        entries,
    }
}

/// `length + 1` entries `pkg0 <- pkg1 <- ... <- pkg{length}`, where `pkg0`
/// is the deepest package and `pkg{length}` is the root.
pub fn chain(length: usize) -> Vec<ScanEntry> {
    (0..=length)
        .map(|i| {
            let entry = ScanEntry::new(format!("pkg{i}"), "1.0");
            if i == length {
                entry
            } else {
                entry.with_parent(format!("pkg{}", i + 1), "1.0")
            }
        })
        .collect()
}

/// Ingest a scan and return `(occurrence id, component name)` pairs in entry order
pub async fn ingest_named(engine: &Engine, request: ScanRequest) -> Vec<(OccurrenceId, String)> {
    let names: Vec<String> = request.entries.iter().map(|e| e.name.clone()).collect();
    let report = engine.ingest_scan(request).await.expect("ingest");
    report
        .occurrences
        .iter()
        .map(|o| o.id)
        .zip(names)
        .collect()
}

/// Look up an id by name in the pairs returned from [`ingest_named`]
pub fn id_of(names: &[(OccurrenceId, String)], name: &str) -> OccurrenceId {
    names
        .iter()
        .find(|(_, n)| n == name)
        .map(|(id, _)| *id)
        .unwrap_or_else(|| panic!("no occurrence named {name}"))
}

/// Render each path of a resolution as its signature
pub fn signatures(resolution: &depchain::domain::Resolution) -> Vec<String> {
    resolution.paths.iter().map(|p| p.signature()).collect()
}
