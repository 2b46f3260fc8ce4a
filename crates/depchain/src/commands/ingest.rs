//! Implementation of the `ingest` command.

use crate::domain::{OrganizationId, ProjectId, SourceId};
use crate::engine::{read_scan_entries, Engine, ScanReport, ScanRequest};
use crate::error::{Error, Result};
use std::path::Path;

/// Where a scan file came from
#[derive(Debug, Clone)]
pub struct ScanOrigin {
    /// Organization owning the component namespace
    pub organization_id: OrganizationId,
    /// Scanned project
    pub project_id: ProjectId,
    /// Scan source
    pub source_id: SourceId,
    /// Commit the scan ran against
    pub commit_sha: String,
}

/// Read a JSONL scan file and ingest it as one scan.
///
/// # Errors
///
/// Returns an error if the file is unreadable, an entry is malformed, the
/// file is empty, or ingestion fails.
pub async fn ingest_file(engine: &Engine, path: &Path, origin: ScanOrigin) -> Result<ScanReport> {
    let entries = read_scan_entries(path).await?;
    if entries.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} contains no scan entries",
            path.display()
        )));
    }

    engine
        .ingest_scan(ScanRequest {
            organization_id: origin.organization_id,
            project_id: origin.project_id,
            source_id: origin.source_id,
            commit_sha: origin.commit_sha,
            entries,
        })
        .await
}
