//! Ancestor references and resolved dependency paths.

use super::{OccurrenceId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A textual pointer from an occurrence to one of its direct parents.
///
/// Scanners identify ancestry by coordinate, not by internal id. Both fields
/// absent is the explicit root sentinel; exactly one absent is malformed and
/// is treated like a root by the graph walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AncestorRef {
    /// Parent package name
    #[serde(default)]
    pub name: Option<String>,

    /// Parent package version
    #[serde(default)]
    pub version: Option<String>,
}

impl AncestorRef {
    /// Reference a parent by name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
        }
    }

    /// The explicit "no parent" sentinel
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this is the root sentinel (both parts absent)
    pub fn is_root(&self) -> bool {
        self.name.is_none() && self.version.is_none()
    }

    /// Whether exactly one part is missing or a present part is blank
    pub fn is_malformed(&self) -> bool {
        !self.is_root() && self.coordinate().is_none()
    }

    /// The resolvable coordinate, if both parts are present and non-blank
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.name.as_deref(), self.version.as_deref()) {
            (Some(name), Some(version)) if !name.trim().is_empty() && !version.trim().is_empty() => {
                Some(Coordinate::new(name, version))
            }
            _ => None,
        }
    }
}

impl From<Coordinate> for AncestorRef {
    fn from(c: Coordinate) -> Self {
        Self {
            name: Some(c.name),
            version: Some(c.version),
        }
    }
}

/// A fully specified `(name, version)` pair.
///
/// Displays as the hop token `name@version` used in path signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,
}

impl Coordinate {
    /// Create a coordinate
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// The projection of an occurrence that graph algorithms walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceNode {
    /// Occurrence id
    pub id: OccurrenceId,

    /// Project the occurrence belongs to
    pub project_id: ProjectId,

    /// Component name and version of the occurrence
    pub coordinate: Coordinate,

    /// Direct parents by coordinate
    pub ancestors: Vec<AncestorRef>,
}

impl OccurrenceNode {
    /// Whether the occurrence has no ancestor references at all
    pub fn is_rootless(&self) -> bool {
        self.ancestors.is_empty()
    }
}

/// One hop in a resolved dependency path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathNode {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,
}

impl From<&Coordinate> for PathNode {
    fn from(c: &Coordinate) -> Self {
        Self {
            name: c.name.clone(),
            version: c.version.clone(),
        }
    }
}

/// A literal dependency chain from a root package down to the target occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Hops, root first, target last
    pub path: Vec<PathNode>,

    /// The chain loops back onto a hop it already contains
    pub is_cyclic: bool,

    /// The chain was cut at the depth bound while more ancestry remained
    pub max_depth_reached: bool,
}

impl ResolvedPath {
    /// Number of edges in the path (hops minus one)
    pub fn length(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Signature of the path: `name@version` tokens joined by `>`
    pub fn signature(&self) -> String {
        self.path
            .iter()
            .map(|n| format!("{}@{}", n.name, n.version))
            .collect::<Vec<_>>()
            .join(">")
    }
}

/// Result of resolving the paths to one occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Distinct paths, ordered by signature
    pub paths: Vec<ResolvedPath>,

    /// The candidate cap was hit; some paths may be missing or incomplete
    pub truncated: bool,
}

impl Resolution {
    /// An empty resolution (unknown occurrence)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no path was found
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths that reached a true root without a cycle or depth cut
    pub fn clean_paths(&self) -> impl Iterator<Item = &ResolvedPath> {
        self.paths
            .iter()
            .filter(|p| !p.is_cyclic && !p.max_depth_reached)
    }
}
