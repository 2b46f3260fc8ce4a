//! Scan ingestion input.

use crate::domain::{
    AncestorRef, ComponentType, License, OrganizationId, ProjectId, PurlType, Severity, SourceId,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One component reported by a scanner.
///
/// Scan files are JSON Lines with one entry per line:
///
/// ```json
/// {"name":"curl","version":"7.0","purl_type":"generic","ancestors":[{"name":"myapp","version":"1.0"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    /// Package URL type
    #[serde(default = "default_purl_type")]
    pub purl_type: PurlType,

    /// Component type
    #[serde(default = "default_component_type")]
    pub component_type: ComponentType,

    /// Direct parents by coordinate; empty for a root
    #[serde(default)]
    pub ancestors: Vec<AncestorRef>,

    /// Manifest the package was found in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file_path: Option<String>,

    /// Package manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,

    /// Licenses
    #[serde(default)]
    pub licenses: Vec<License>,

    /// Highest vulnerability severity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<Severity>,
}

fn default_purl_type() -> PurlType {
    PurlType::Generic
}

fn default_component_type() -> ComponentType {
    ComponentType::Library
}

impl ScanEntry {
    /// A library entry with no metadata
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            purl_type: default_purl_type(),
            component_type: default_component_type(),
            ancestors: Vec::new(),
            input_file_path: None,
            package_manager: None,
            licenses: Vec::new(),
            highest_severity: None,
        }
    }

    /// Builder: add a direct parent
    pub fn with_parent(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.ancestors.push(AncestorRef::new(name, version));
        self
    }

    /// Builder: set the package manager
    pub fn with_package_manager(mut self, package_manager: impl Into<String>) -> Self {
        self.package_manager = Some(package_manager.into());
        self
    }

    /// Builder: add a license
    pub fn with_license(mut self, spdx: impl Into<String>) -> Self {
        self.licenses.push(License::spdx(spdx));
        self
    }
}

/// Everything one scan of one source reported for a project.
///
/// Ingesting a scan supersedes whatever the same source reported before.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Organization that owns the component namespace
    pub organization_id: OrganizationId,

    /// Scanned project
    pub project_id: ProjectId,

    /// Scan source
    pub source_id: SourceId,

    /// Commit the scan ran against
    pub commit_sha: String,

    /// Reported components, in scanner order
    pub entries: Vec<ScanEntry>,
}

/// Read scan entries from a JSONL file, skipping blank lines.
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be read and `Error::InvalidInput`
/// naming the line if an entry doesn't parse.
pub async fn read_scan_entries(path: &Path) -> Result<Vec<ScanEntry>> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| {
            Error::InvalidInput(format!("{}:{line_number}: {e}", path.display()))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entry_defaults() {
        let entry: ScanEntry = serde_json::from_str(r#"{"name":"zlib","version":"1.3"}"#).unwrap();
        assert_eq!(entry, ScanEntry::new("zlib", "1.3"));
    }

    #[tokio::test]
    async fn test_read_scan_entries_reports_bad_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.jsonl");
        tokio::fs::write(
            &path,
            "{\"name\":\"a\",\"version\":\"1\"}\n\n{\"name\":\"b\"}\n",
        )
        .await
        .unwrap();

        let err = read_scan_entries(&path).await.unwrap_err();
        assert!(err.to_string().contains(":3:"), "{err}");
    }
}
