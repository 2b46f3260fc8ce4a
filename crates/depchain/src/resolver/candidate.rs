//! Partial paths tracked while walking ancestry upward.

use crate::domain::{Coordinate, PathNode, ResolvedPath};

/// A path under construction.
///
/// `hops` is ordered root first with the target last; walking upward
/// prepends. The head (`hops[0]`) is the coordinate looked up next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Candidate {
    hops: Vec<Coordinate>,
    is_cyclic: bool,
    max_depth_reached: bool,
}

impl Candidate {
    /// A path holding only the target
    pub(super) fn target(coordinate: Coordinate) -> Self {
        Self {
            hops: vec![coordinate],
            is_cyclic: false,
            max_depth_reached: false,
        }
    }

    /// Coordinate to look up in the next round
    pub(super) fn head(&self) -> &Coordinate {
        &self.hops[0]
    }

    /// Edges in the path
    pub(super) fn length(&self) -> usize {
        self.hops.len() - 1
    }

    /// Whether `coordinate` is already a hop of this path
    pub(super) fn contains(&self, coordinate: &Coordinate) -> bool {
        self.hops.contains(coordinate)
    }

    /// A copy extended by one hop upward. The copy is marked cyclic if the
    /// parent already appears in the path; the repeated hop is kept.
    pub(super) fn extended(&self, parent: Coordinate) -> Self {
        let is_cyclic = self.contains(&parent);
        let mut hops = Vec::with_capacity(self.hops.len() + 1);
        hops.push(parent);
        hops.extend(self.hops.iter().cloned());
        Self {
            hops,
            is_cyclic,
            max_depth_reached: false,
        }
    }

    /// A copy flagged as cut at the depth bound
    pub(super) fn cut_at_depth(&self) -> Self {
        Self {
            max_depth_reached: true,
            ..self.clone()
        }
    }

    pub(super) fn is_cyclic(&self) -> bool {
        self.is_cyclic
    }

    /// `name@version` tokens joined by `>`, root first
    pub(super) fn signature(&self) -> String {
        self.hops
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(">")
    }

    pub(super) fn into_path(self) -> ResolvedPath {
        ResolvedPath {
            path: self.hops.iter().map(PathNode::from).collect(),
            is_cyclic: self.is_cyclic,
            max_depth_reached: self.max_depth_reached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_prepends() {
        let candidate = Candidate::target(Coordinate::new("myapp", "1.0"))
            .extended(Coordinate::new("curl", "7.0"))
            .extended(Coordinate::new("openssl", "1.1"));

        assert_eq!(candidate.head(), &Coordinate::new("openssl", "1.1"));
        assert_eq!(candidate.length(), 2);
        assert_eq!(candidate.signature(), "openssl@1.1>curl@7.0>myapp@1.0");
        assert!(!candidate.is_cyclic());
    }

    #[test]
    fn test_repeated_hop_marks_cycle() {
        let candidate = Candidate::target(Coordinate::new("a", "1"))
            .extended(Coordinate::new("b", "1"))
            .extended(Coordinate::new("a", "1"));

        assert!(candidate.is_cyclic());
        assert_eq!(candidate.signature(), "a@1>b@1>a@1");
    }

    #[test]
    fn test_cycle_check_is_exact() {
        // "lib@1.0" must not match "lib@1.0.1" or "mylib@1.0"
        let candidate = Candidate::target(Coordinate::new("lib", "1.0.1"))
            .extended(Coordinate::new("mylib", "1.0"))
            .extended(Coordinate::new("lib", "1.0"));
        assert!(!candidate.is_cyclic());
    }

    #[test]
    fn test_cut_keeps_hops() {
        let candidate = Candidate::target(Coordinate::new("a", "1")).extended(Coordinate::new("b", "1"));
        let path = candidate.cut_at_depth().into_path();
        assert!(path.max_depth_reached);
        assert_eq!(path.length(), 1);
    }
}
