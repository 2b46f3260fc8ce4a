//! Minimal-length closure table.

use crate::domain::{GraphPath, OccurrenceId, ProjectId};
use std::collections::{BTreeMap, HashSet};

/// Reachability pairs of one project, keyed by `(descendant, ancestor)`.
///
/// Holds at most one length per pair and only ever lowers it. Self pairs and
/// zero lengths are rejected, so every stored row satisfies `path_length >= 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureTable {
    rows: BTreeMap<(OccurrenceId, OccurrenceId), u32>,
}

impl ClosureTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows, keeping the minimum length of duplicate pairs
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = GraphPath>,
    {
        let mut table = Self::new();
        for row in rows {
            table.insert_min(
                row.ancestor_occurrence_id,
                row.descendant_occurrence_id,
                row.path_length,
            );
        }
        table
    }

    /// Record `ancestor -> descendant` at `length` unless a shorter or equal
    /// length is already known.
    ///
    /// Returns `true` if the table changed.
    pub fn insert_min(
        &mut self,
        ancestor: OccurrenceId,
        descendant: OccurrenceId,
        length: u32,
    ) -> bool {
        if ancestor == descendant || length == 0 {
            return false;
        }
        match self.rows.get_mut(&(descendant, ancestor)) {
            Some(existing) if *existing <= length => false,
            Some(existing) => {
                *existing = length;
                true
            }
            None => {
                self.rows.insert((descendant, ancestor), length);
                true
            }
        }
    }

    /// Recorded distance between the pair
    pub fn get(&self, ancestor: OccurrenceId, descendant: OccurrenceId) -> Option<u32> {
        self.rows.get(&(descendant, ancestor)).copied()
    }

    /// Every recorded ancestor of `descendant` with its distance
    pub fn ancestors_of(
        &self,
        descendant: OccurrenceId,
    ) -> impl Iterator<Item = (OccurrenceId, u32)> + '_ {
        self.rows
            .range((descendant, OccurrenceId::new(0))..=(descendant, OccurrenceId::new(u64::MAX)))
            .map(|(&(_, ancestor), &length)| (ancestor, length))
    }

    /// Drop every row that may route through an occurrence in `ids`.
    ///
    /// That is every row with an endpoint in `ids` plus every row ending at a
    /// recorded descendant of one of them. Surviving rows stay true; pairs
    /// whose shortest route is lost become unknown until the next rebuild.
    /// Returns how many rows were removed.
    pub fn remove_through(&mut self, ids: &HashSet<OccurrenceId>) -> usize {
        let downstream: HashSet<OccurrenceId> = self
            .rows
            .keys()
            .filter(|(_, ancestor)| ids.contains(ancestor))
            .map(|&(descendant, _)| descendant)
            .collect();

        let before = self.rows.len();
        self.rows.retain(|(descendant, ancestor), _| {
            !ids.contains(descendant) && !ids.contains(ancestor) && !downstream.contains(descendant)
        });
        before - self.rows.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered by `(ancestor, descendant)`
    pub fn to_rows(&self, project_id: ProjectId) -> Vec<GraphPath> {
        let mut rows: Vec<GraphPath> = self
            .rows
            .iter()
            .map(|(&(descendant, ancestor), &length)| GraphPath {
                ancestor_occurrence_id: ancestor,
                descendant_occurrence_id: descendant,
                path_length: length,
                project_id,
            })
            .collect();
        rows.sort_by_key(|r| (r.ancestor_occurrence_id, r.descendant_occurrence_id));
        rows
    }
}
