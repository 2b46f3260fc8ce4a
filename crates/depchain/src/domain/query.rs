//! Filters and orderings for occurrence listings.

use super::{ProjectId, SourceId};
use serde::{Deserialize, Serialize};

/// License criterion for occurrence listings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseFilter {
    /// Matches occurrences whose license list is empty
    Unknown,

    /// Matches occurrences carrying this SPDX identifier (case-insensitive)
    Spdx(String),
}

impl LicenseFilter {
    /// Parse a CLI/API value; `"unknown"` selects the empty-license sentinel.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("unknown") {
            LicenseFilter::Unknown
        } else {
            LicenseFilter::Spdx(value.to_string())
        }
    }
}

/// Filter for querying occurrences
#[derive(Debug, Clone, Default)]
pub struct OccurrenceFilter {
    /// Filter by project
    pub project_id: Option<ProjectId>,

    /// Filter by scan source
    pub source_id: Option<SourceId>,

    /// Case-insensitive substring of the component name
    pub name: Option<String>,

    /// Any of these package managers (exact match)
    pub package_managers: Vec<String>,

    /// Any of these license criteria
    pub licenses: Vec<LicenseFilter>,

    /// Limit number of results
    pub limit: Option<usize>,
}

/// Field used to order occurrence listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Component name
    #[default]
    Name,
    /// Package manager
    PackageManager,
    /// Highest vulnerability severity
    Severity,
    /// First license identifier
    License,
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// Placement of rows whose sort key is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsOrder {
    /// Absent keys first
    First,
    /// Absent keys last
    #[default]
    Last,
}

/// Ordering for occurrence listings. Ties are always broken by ascending id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceSort {
    /// Sort key
    pub field: SortField,

    /// Direction applied to present keys
    pub direction: SortDirection,

    /// Placement of absent keys, independent of direction
    pub nulls: NullsOrder,
}

impl OccurrenceSort {
    /// Sort by the given field ascending with nulls last
    pub fn by(field: SortField) -> Self {
        Self {
            field,
            ..Self::default()
        }
    }

    /// Builder: set direction
    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Builder: set null placement
    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = nulls;
        self
    }
}
