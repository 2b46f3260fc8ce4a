//! Closure index construction.
//!
//! The closure index answers "is B reachable from A, and how far?" without a
//! runtime walk. Rows are derived from the textual ancestor references on
//! occurrences, so every reference is first resolved against the occurrences
//! of the same project by `(name, version)`. A coordinate shared by several
//! occurrences fans out to all of them.
//!
//! Two derivations are provided:
//!
//! - [`build_project_closure`]: full rebuild. Direct edges are loaded into a
//!   `petgraph::DiGraph` (parent -> child) and a depth-bounded breadth-first
//!   search runs from every node. First-visit depth is the minimum length.
//! - [`extend_closure`]: incremental extension for one newly inserted
//!   occurrence, seeded from the rows that already end at its parents.
//!
//! Both stop at `max_depth` hops. A cycle therefore never causes unbounded
//! insertion, and a missing row means *unknown*, not *unreachable*.

mod table;

pub use table::ClosureTable;

use crate::domain::{Coordinate, GraphPath, OccurrenceId, OccurrenceNode, ProjectGraph};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};

/// Direct parent -> child edges of a project, with every ambiguous coordinate
/// fanned out to all matching occurrences.
///
/// Self references (an occurrence naming its own coordinate) are skipped.
pub fn direct_edges(graph: &ProjectGraph) -> Vec<(OccurrenceId, OccurrenceId)> {
    let mut by_coordinate: HashMap<&Coordinate, Vec<OccurrenceId>> = HashMap::new();
    for node in &graph.nodes {
        by_coordinate.entry(&node.coordinate).or_default().push(node.id);
    }

    let mut edges = Vec::new();
    for node in &graph.nodes {
        for reference in &node.ancestors {
            let Some(coordinate) = reference.coordinate() else {
                continue;
            };
            let Some(parents) = by_coordinate.get(&coordinate) else {
                continue;
            };
            edges.extend(
                parents
                    .iter()
                    .filter(|&&parent| parent != node.id)
                    .map(|&parent| (parent, node.id)),
            );
        }
    }
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Derive the complete closure of a project.
///
/// Every pair reachable within `max_depth` hops appears exactly once with its
/// minimum length.
pub fn build_project_closure(graph: &ProjectGraph, max_depth: usize) -> ClosureTable {
    let mut dag: DiGraph<OccurrenceId, ()> = DiGraph::new();
    let node_map: HashMap<OccurrenceId, NodeIndex> = graph
        .nodes
        .iter()
        .map(|node| (node.id, dag.add_node(node.id)))
        .collect();

    for (parent, child) in direct_edges(graph) {
        dag.add_edge(node_map[&parent], node_map[&child], ());
    }

    let mut table = ClosureTable::new();
    for &start in node_map.values() {
        let ancestor = dag[start];
        let mut depth_of: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let depth = depth_of[&current];
            if depth >= max_depth {
                continue;
            }
            for next in dag.neighbors(current) {
                if depth_of.contains_key(&next) {
                    continue;
                }
                depth_of.insert(next, depth + 1);
                table.insert_min(ancestor, dag[next], to_length(depth + 1));
                queue.push_back(next);
            }
        }
    }

    table
}

/// Rows to add when `node` is inserted.
///
/// `parents` lists each occurrence matching one of `node`'s ancestor
/// references, paired with the closure rows that already end at it
/// (`(ancestor, length)`). Produces `(parent -> node, 1)` plus
/// `(A -> node, n + 1)` for every `(A -> parent, n)` with `n + 1 <= max_depth`,
/// deduplicated to the minimum length.
pub fn extend_closure(
    node: &OccurrenceNode,
    parents: &[(OccurrenceId, Vec<(OccurrenceId, u32)>)],
    max_depth: usize,
) -> Vec<GraphPath> {
    let bound = to_length(max_depth);
    let mut table = ClosureTable::new();

    for (parent, upstream) in parents {
        if *parent == node.id {
            continue;
        }
        table.insert_min(*parent, node.id, 1);
        for &(ancestor, length) in upstream {
            if ancestor == node.id {
                continue;
            }
            let extended = length.saturating_add(1);
            if extended <= bound {
                table.insert_min(ancestor, node.id, extended);
            }
        }
    }

    table.to_rows(node.project_id)
}

fn to_length(depth: usize) -> u32 {
    u32::try_from(depth).unwrap_or(u32::MAX)
}
