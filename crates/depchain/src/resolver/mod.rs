//! Literal dependency path resolution.
//!
//! Given an occurrence, enumerate the chains that pulled it into its project,
//! walking the textual ancestor references upward until a root. The walk runs
//! in breadth-first rounds; each round issues a single batched coordinate
//! lookup for the distinct heads of every active candidate.
//!
//! A branch ends when:
//!
//! - its head matches no occurrence, matches one with no ancestors, or the
//!   reference is the root sentinel or malformed (a clean root)
//! - the parent it would add is already in the path (`is_cyclic`, the
//!   repeated hop is kept, so a cyclic path may be `max_depth + 1` long)
//! - otherwise, adding the parent would exceed `max_depth`
//!   (`max_depth_reached`, the path stops at its current length)
//!
//! Paths are deduplicated by signature with flags OR-ed across duplicates and
//! returned in signature order.

mod candidate;

use crate::config::EngineConfig;
use crate::domain::{AncestorRef, Coordinate, OccurrenceId, OccurrenceNode, ProjectId, Resolution, ResolvedPath};
use crate::error::Result;
use crate::storage::DependencyStorage;
use candidate::Candidate;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Breadth-first resolver of literal dependency paths.
///
/// Stateless between calls; one resolver can serve many concurrent
/// resolutions.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver {
    max_depth: usize,
    max_candidates: usize,
}

impl PathResolver {
    /// Create a resolver with the engine's depth and candidate bounds
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_candidates: config.max_candidates,
        }
    }

    /// Resolve every path from a root down to `occurrence_id`.
    ///
    /// An occurrence that doesn't exist in `project_id` yields an empty
    /// resolution. An occurrence without ancestor references yields exactly
    /// one path containing only itself.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned; malformed data never errors.
    pub async fn resolve(
        &self,
        storage: &dyn DependencyStorage,
        occurrence_id: OccurrenceId,
        project_id: ProjectId,
    ) -> Result<Resolution> {
        let Some(target) = storage.occurrence_node(project_id, occurrence_id).await? else {
            debug!(occurrence = %occurrence_id, project = %project_id, "Occurrence not found, nothing to resolve");
            return Ok(Resolution::empty());
        };

        let mut walk = Walk::new(self.max_depth, self.max_candidates);
        walk.seed(&target);

        let mut round = 0usize;
        while !walk.active.is_empty() {
            round += 1;
            let heads: Vec<Coordinate> = walk
                .active
                .iter()
                .map(|c| c.head().clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            debug!(
                round,
                active = walk.active.len(),
                heads = heads.len(),
                "Expanding dependency path candidates"
            );

            let matches = group_by_coordinate(
                storage
                    .occurrence_nodes_by_coordinates(project_id, &heads)
                    .await?,
            );
            walk.expand(&matches);
        }

        if walk.truncated {
            warn!(
                occurrence = %occurrence_id,
                project = %project_id,
                max_candidates = self.max_candidates,
                "Candidate cap reached, dependency paths truncated"
            );
        }

        Ok(walk.finish())
    }

    /// Resolve several independent targets concurrently.
    ///
    /// Results are returned in the order of `targets`.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn resolve_many(
        &self,
        storage: &dyn DependencyStorage,
        targets: &[(OccurrenceId, ProjectId)],
    ) -> Result<Vec<Resolution>> {
        join_all(
            targets
                .iter()
                .map(|&(occurrence_id, project_id)| self.resolve(storage, occurrence_id, project_id)),
        )
        .await
        .into_iter()
        .collect()
    }
}

fn group_by_coordinate(nodes: Vec<OccurrenceNode>) -> HashMap<Coordinate, Vec<OccurrenceNode>> {
    let mut grouped: HashMap<Coordinate, Vec<OccurrenceNode>> = HashMap::new();
    for node in nodes {
        grouped.entry(node.coordinate.clone()).or_default().push(node);
    }
    grouped
}

/// State of one resolution
struct Walk {
    max_depth: usize,
    max_candidates: usize,
    created: usize,
    truncated: bool,
    active: Vec<Candidate>,
    done: Vec<Candidate>,
}

impl Walk {
    fn new(max_depth: usize, max_candidates: usize) -> Self {
        Self {
            max_depth,
            max_candidates,
            created: 0,
            truncated: false,
            active: Vec::new(),
            done: Vec::new(),
        }
    }

    fn seed(&mut self, target: &OccurrenceNode) {
        let start = Candidate::target(target.coordinate.clone());
        if target.is_rootless() {
            self.done.push(start);
            return;
        }
        self.created = 1;
        self.branch(&start, &target.ancestors);
    }

    /// Run one round of expansion against the batched lookup results
    fn expand(&mut self, matches: &HashMap<Coordinate, Vec<OccurrenceNode>>) {
        let active = std::mem::take(&mut self.active);
        let mut pending = active.into_iter();

        while let Some(candidate) = pending.next() {
            if self.truncated {
                self.done.push(candidate);
                self.done.extend(pending);
                return;
            }

            let parents = matches.get(candidate.head()).map_or(&[][..], Vec::as_slice);
            if parents.is_empty() {
                self.done.push(candidate);
                continue;
            }
            for parent in parents {
                if parent.is_rootless() {
                    self.done.push(candidate.clone());
                } else {
                    self.branch(&candidate, &parent.ancestors);
                }
            }
        }
    }

    /// Follow each reference from `candidate`'s head one hop upward
    fn branch(&mut self, candidate: &Candidate, references: &[AncestorRef]) {
        for reference in references {
            let Some(parent) = reference.coordinate() else {
                self.done.push(candidate.clone());
                continue;
            };
            // A hop closing a loop is kept even one past the bound
            if !candidate.contains(&parent) && candidate.length() + 1 > self.max_depth {
                self.done.push(candidate.cut_at_depth());
                continue;
            }
            if self.created >= self.max_candidates {
                self.truncated = true;
                self.done.push(candidate.clone());
                return;
            }

            self.created += 1;
            let next = candidate.extended(parent);
            if next.is_cyclic() {
                self.done.push(next);
            } else {
                self.active.push(next);
            }
        }
    }

    fn finish(self) -> Resolution {
        let mut by_signature: BTreeMap<String, ResolvedPath> = BTreeMap::new();
        for candidate in self.done {
            let signature = candidate.signature();
            let path = candidate.into_path();
            by_signature
                .entry(signature)
                .and_modify(|existing| {
                    existing.is_cyclic |= path.is_cyclic;
                    existing.max_depth_reached |= path.max_depth_reached;
                })
                .or_insert(path);
        }

        Resolution {
            paths: by_signature.into_values().collect(),
            truncated: self.truncated,
        }
    }
}
