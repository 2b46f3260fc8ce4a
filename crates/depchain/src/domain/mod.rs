//! Domain types for dependency graph storage.
//!
//! This module contains the registry, occurrence and closure records the
//! engine stores, plus the value types the graph walk operates on.

mod ancestry;
mod query;

pub use ancestry::{AncestorRef, Coordinate, OccurrenceNode, PathNode, ResolvedPath, Resolution};
pub use query::{
    LicenseFilter, NullsOrder, OccurrenceFilter, OccurrenceSort, SortDirection, SortField,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new identifier
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw numeric value
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of the organization owning a component namespace
    OrganizationId
);
numeric_id!(
    /// Identifier of a scanned project
    ProjectId
);
numeric_id!(
    /// Identifier of the scan source (e.g. a lockfile or container image) that produced occurrences
    SourceId
);
numeric_id!(
    /// Identifier of a registered component
    ComponentId
);
numeric_id!(
    /// Identifier of a registered component version
    ComponentVersionId
);
numeric_id!(
    /// Identifier of an occurrence row
    OccurrenceId
);

/// Package URL type of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurlType {
    /// npm registry
    Npm,
    /// Maven repositories
    Maven,
    /// Python Package Index
    Pypi,
    /// Go modules
    Golang,
    /// RubyGems
    Gem,
    /// NuGet
    Nuget,
    /// crates.io
    Cargo,
    /// Packagist
    Composer,
    /// Conan
    Conan,
    /// Alpine packages
    Apk,
    /// Debian packages
    Deb,
    /// RPM packages
    Rpm,
    /// Swift packages
    Swift,
    /// CocoaPods
    Cocoapods,
    /// Anything else
    Generic,
}

/// Kind of software a component represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    /// Reusable library
    Library,
    /// Standalone application
    Application,
    /// Framework
    Framework,
    /// Container image
    Container,
    /// Operating system
    OperatingSystem,
    /// Hardware device
    Device,
    /// Firmware blob
    Firmware,
    /// Loose file
    File,
}

/// A logical package within an organization.
///
/// `(name, purl_type, component_type, organization_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique identifier
    pub id: ComponentId,

    /// Package name as reported by scanners
    pub name: String,

    /// Package URL type
    pub purl_type: PurlType,

    /// Component type
    pub component_type: ComponentType,

    /// Owning organization
    pub organization_id: OrganizationId,
}

/// Data for looking up or registering a component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewComponent {
    /// Package name
    pub name: String,

    /// Package URL type
    pub purl_type: PurlType,

    /// Component type
    pub component_type: ComponentType,

    /// Owning organization
    pub organization_id: OrganizationId,
}

impl NewComponent {
    /// Validate the component data.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Component name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A version string registered for a component. Unique per `(component_id, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentVersion {
    /// Unique identifier
    pub id: ComponentVersionId,

    /// Component this version belongs to
    pub component_id: ComponentId,

    /// Version string
    pub version: String,
}

/// A license attached to an occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct License {
    /// SPDX identifier (e.g. "MIT")
    pub spdx_identifier: String,

    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// License text URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    /// Create a license from its SPDX identifier
    pub fn spdx(identifier: impl Into<String>) -> Self {
        Self {
            spdx_identifier: identifier.into(),
            name: None,
            url: None,
        }
    }
}

/// Highest vulnerability severity recorded for an occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Severity not assessed
    Unknown,
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Descriptive metadata recorded with an occurrence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceMetadata {
    /// Manifest or lockfile the component was detected in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file_path: Option<String>,

    /// Package manager that installed the component (e.g. "npm", "bundler")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,

    /// Licenses; empty means unknown
    #[serde(default)]
    pub licenses: Vec<License>,

    /// Highest vulnerability severity, if any was assessed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_severity: Option<Severity>,
}

/// One detected instance of a component version in a project.
///
/// Occurrences are immutable once stored; a re-scan supersedes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Unique identifier
    pub id: OccurrenceId,

    /// Globally unique identifier
    pub uuid: String,

    /// Project the component was detected in
    pub project_id: ProjectId,

    /// Component
    pub component_id: ComponentId,

    /// Component version
    pub component_version_id: ComponentVersionId,

    /// Scan source that produced the occurrence
    pub source_id: SourceId,

    /// Commit the scan ran against
    pub commit_sha: String,

    /// Direct parents, by coordinate, in scanner order
    #[serde(default)]
    pub ancestors: Vec<AncestorRef>,

    /// Descriptive metadata
    #[serde(flatten)]
    pub metadata: OccurrenceMetadata,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a new occurrence
#[derive(Debug, Clone)]
pub struct NewOccurrence {
    /// Project
    pub project_id: ProjectId,

    /// Component version detected
    pub component_version_id: ComponentVersionId,

    /// Scan source
    pub source_id: SourceId,

    /// Commit the scan ran against
    pub commit_sha: String,

    /// Direct parents by coordinate
    pub ancestors: Vec<AncestorRef>,

    /// Descriptive metadata
    pub metadata: OccurrenceMetadata,
}

impl NewOccurrence {
    /// Validate the occurrence data.
    ///
    /// Ancestor references are not validated here: malformed references are
    /// stored as reported and treated as roots by the graph walk.
    pub fn validate(&self) -> Result<(), String> {
        if self.commit_sha.trim().is_empty() {
            return Err("Commit SHA cannot be empty".to_string());
        }
        if !self.commit_sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "Commit SHA must be hexadecimal, got '{}'",
                self.commit_sha
            ));
        }
        Ok(())
    }
}

/// A closure-index row: `descendant` is reachable from `ancestor` in `path_length` hops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphPath {
    /// Upstream occurrence
    pub ancestor_occurrence_id: OccurrenceId,

    /// Downstream occurrence
    pub descendant_occurrence_id: OccurrenceId,

    /// Minimum known number of hops, always >= 1
    pub path_length: u32,

    /// Project both endpoints belong to
    pub project_id: ProjectId,
}

/// All graph nodes of a project together with the membership generation they were read at.
#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    /// Generation counter, bumped whenever occurrence membership changes
    pub generation: u64,

    /// Every occurrence of the project, projected for graph walks
    pub nodes: Vec<OccurrenceNode>,
}
