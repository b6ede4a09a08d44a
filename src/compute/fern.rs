//! The fern: an evolvable binary space-partitioning tree.
//!
//! Forks store only the dimension they split on. The split threshold is always
//! the midpoint of the region reached at that fork, so changing a fork's
//! dimension or grafting a subtree elsewhere never leaves stale thresholds.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::cursor::{LeafIter, NodeHandle, NodeHandleMut};
use super::error::{FernError, NodeKind};
use super::region::Region;
use crate::schema::MutationConfig;

/// Direction taken at a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    Left,
    Right,
}

impl Branch {
    /// True for the right (upper) child.
    #[inline]
    pub fn is_upper(self) -> bool {
        matches!(self, Branch::Right)
    }
}

/// Position of a node, as the branches taken from the root.
pub type Path = Vec<Branch>;

/// Tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Internal node splitting its region at the midpoint of `dimension`.
    Fork {
        dimension: usize,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Terminal node carrying an output label.
    Leaf { bin: u32 },
}

impl Node {
    /// Create a fork.
    pub fn fork(dimension: usize, left: Node, right: Node) -> Self {
        Node::Fork {
            dimension,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a leaf.
    pub fn leaf(bin: u32) -> Self {
        Node::Leaf { bin }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Child on the given side, `None` for leaves.
    pub fn child(&self, branch: Branch) -> Option<&Node> {
        match (self, branch) {
            (Node::Fork { left, .. }, Branch::Left) => Some(&**left),
            (Node::Fork { right, .. }, Branch::Right) => Some(&**right),
            (Node::Leaf { .. }, _) => None,
        }
    }

    /// Mutable child on the given side, `None` for leaves.
    pub fn child_mut(&mut self, branch: Branch) -> Option<&mut Node> {
        match (self, branch) {
            (Node::Fork { left, .. }, Branch::Left) => Some(&mut **left),
            (Node::Fork { right, .. }, Branch::Right) => Some(&mut **right),
            (Node::Leaf { .. }, _) => None,
        }
    }

    /// Node reached by following `path`.
    pub fn at(&self, path: &[Branch]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &branch| node.child(branch))
    }

    /// Mutable node reached by following `path`.
    pub fn at_mut(&mut self, path: &[Branch]) -> Option<&mut Node> {
        let mut node = self;
        for &branch in path {
            node = node.child_mut(branch)?;
        }
        Some(node)
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        match self {
            Node::Fork { left, right, .. } => 1 + left.size() + right.size(),
            Node::Leaf { .. } => 1,
        }
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Fork { left, right, .. } => left.leaf_count() + right.leaf_count(),
            Node::Leaf { .. } => 1,
        }
    }

    /// Number of fork levels on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Node::Fork { left, right, .. } => 1 + left.depth().max(right.depth()),
            Node::Leaf { .. } => 0,
        }
    }

    /// Bin of the leftmost leaf.
    pub fn leftmost_bin(&self) -> u32 {
        let mut node = self;
        loop {
            match node {
                Node::Fork { left, .. } => node = &**left,
                Node::Leaf { bin } => return *bin,
            }
        }
    }

    /// Positions of every node in preorder (root first).
    pub fn paths(&self) -> Vec<Path> {
        let mut paths = Vec::with_capacity(self.size());
        self.collect_paths(&mut Vec::new(), &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &mut Path, paths: &mut Vec<Path>) {
        paths.push(prefix.clone());
        if let Node::Fork { left, right, .. } = self {
            prefix.push(Branch::Left);
            left.collect_paths(prefix, paths);
            prefix.pop();
            prefix.push(Branch::Right);
            right.collect_paths(prefix, paths);
            prefix.pop();
        }
    }

    /// Balanced subtree with `depth` fork levels, dimensions cycling by level.
    fn balanced(level: usize, depth: usize, dimensions: usize) -> Node {
        if level == depth {
            return Node::leaf(0);
        }
        Node::fork(
            level % dimensions,
            Node::balanced(level + 1, depth, dimensions),
            Node::balanced(level + 1, depth, dimensions),
        )
    }

    pub(crate) fn check(&self, dimensions: usize, num_bins: u32) -> Result<(), FernError> {
        match self {
            Node::Fork {
                dimension,
                left,
                right,
            } => {
                if *dimension >= dimensions {
                    return Err(FernError::DimensionMismatch {
                        expected: dimensions,
                        found: dimension + 1,
                    });
                }
                left.check(dimensions, num_bins)?;
                right.check(dimensions, num_bins)
            }
            Node::Leaf { bin } => {
                if *bin >= num_bins {
                    return Err(FernError::BinOutOfRange {
                        bin: *bin,
                        num_bins,
                    });
                }
                Ok(())
            }
        }
    }

    fn clamp_bins(&mut self, max_bin: u32) {
        match self {
            Node::Fork { left, right, .. } => {
                left.clamp_bins(max_bin);
                right.clamp_bins(max_bin);
            }
            Node::Leaf { bin } => *bin = (*bin).min(max_bin),
        }
    }
}

/// Something that maps a point to an output label.
///
/// Implemented by [`Fern`] and by hand-written baselines so fitness functions
/// can score either.
pub trait Controller {
    /// Number of coordinates expected by [`Controller::query`].
    fn dimensions(&self) -> usize;

    /// Output label for `point`.
    fn query(&self, point: &[f64]) -> Result<u32, FernError>;
}

/// Evolvable spatial classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fern {
    root: Node,
    domain: Region,
    num_bins: u32,
    #[serde(default)]
    config: MutationConfig,
}

/// Deepest balanced tree [`Fern::new_uniform`] builds, `2^24` leaves.
pub const MAX_UNIFORM_DEPTH: usize = 24;

impl Fern {
    /// Minimal tree: one fork on dimension 0 with two leaves in bin 0.
    pub fn new(domain: Region, num_bins: u32) -> Result<Self, FernError> {
        Self::from_root(Node::fork(0, Node::leaf(0), Node::leaf(0)), domain, num_bins)
    }

    /// Balanced tree with `depth` fork levels, split dimensions cycling
    /// round-robin by level and every leaf in bin 0.
    pub fn new_uniform(domain: Region, depth: usize, num_bins: u32) -> Result<Self, FernError> {
        if depth > MAX_UNIFORM_DEPTH {
            return Err(FernError::DepthTooLarge {
                depth,
                max: MAX_UNIFORM_DEPTH,
            });
        }
        let root = Node::balanced(0, depth, domain.dimensions().max(1));
        Self::from_root(root, domain, num_bins)
    }

    /// Wrap an existing node tree, checking it against the domain and bin count.
    pub fn from_root(root: Node, domain: Region, num_bins: u32) -> Result<Self, FernError> {
        let fern = Self {
            root,
            domain,
            num_bins,
            config: MutationConfig::default(),
        };
        fern.validate()?;
        Ok(fern)
    }

    /// Builder-style mutation configuration.
    pub fn with_config(mut self, config: MutationConfig) -> Self {
        self.config = config;
        self
    }

    /// Check the domain, bin count, fork dimensions and leaf bins.
    pub fn validate(&self) -> Result<(), FernError> {
        self.domain.validate()?;
        if self.num_bins == 0 {
            return Err(FernError::InvalidBinCount);
        }
        self.root.check(self.dimensions(), self.num_bins)
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.domain.dimensions()
    }

    #[inline]
    pub fn num_bins(&self) -> u32 {
        self.num_bins
    }

    /// Full input domain.
    pub fn domain(&self) -> &Region {
        &self.domain
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MutationConfig) {
        self.config = config;
    }

    /// Replace the domain; the dimensionality must not change.
    pub fn set_domain(&mut self, domain: Region) -> Result<(), FernError> {
        domain.validate()?;
        if domain.dimensions() != self.dimensions() {
            return Err(FernError::DimensionMismatch {
                expected: self.dimensions(),
                found: domain.dimensions(),
            });
        }
        self.domain = domain;
        Ok(())
    }

    /// Change the number of bins, clamping leaf bins into the new range.
    pub fn set_num_bins(&mut self, num_bins: u32) -> Result<(), FernError> {
        if num_bins == 0 {
            return Err(FernError::InvalidBinCount);
        }
        self.num_bins = num_bins;
        self.root.clamp_bins(num_bins - 1);
        Ok(())
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.root.size()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Read-only cursor at the root.
    pub fn handle(&self) -> NodeHandle<'_> {
        NodeHandle::new(&self.root)
    }

    /// Editing cursor at the root.
    pub fn handle_mut(&mut self) -> NodeHandleMut<'_> {
        NodeHandleMut::new(self)
    }

    /// Editing cursor at `path`, `None` if no node lives there.
    pub fn handle_mut_at(&mut self, path: &[Branch]) -> Option<NodeHandleMut<'_>> {
        self.root.at(path)?;
        Some(NodeHandleMut::at_path(self, path.to_vec()))
    }

    /// Leaves in left-to-right order with their reconstructed regions.
    pub fn leaves(&self) -> LeafIter<'_> {
        LeafIter::new(self)
    }

    /// Output label for `point`.
    ///
    /// At each fork the point goes left when its coordinate is less than or
    /// equal to the midpoint, so points on a boundary belong to the lower cell.
    pub fn query(&self, point: &[f64]) -> Result<u32, FernError> {
        if point.len() != self.dimensions() {
            return Err(FernError::DimensionMismatch {
                expected: self.dimensions(),
                found: point.len(),
            });
        }

        let mut handle = self.handle();
        let mut region = self.domain.clone();
        while let Some(dimension) = handle.current_dimension() {
            let take_upper = point[dimension] > region[dimension].midpoint();
            region.split(dimension, take_upper)?;
            if take_upper {
                handle.right();
            } else {
                handle.left();
            }
        }

        handle
            .current_bin()
            .ok_or(FernError::WrongNodeKind {
                expected: NodeKind::Leaf,
            })
    }
}

impl Controller for Fern {
    fn dimensions(&self) -> usize {
        Fern::dimensions(self)
    }

    fn query(&self, point: &[f64]) -> Result<u32, FernError> {
        Fern::query(self, point)
    }
}

impl fmt::Display for Fern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Region: {}", self.domain)?;
        writeln!(f, "Number of bins: {}", self.num_bins)?;

        let mut stack = vec![(&self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            write!(f, "{}", "=".repeat(depth))?;
            match node {
                Node::Fork {
                    dimension,
                    left,
                    right,
                } => {
                    writeln!(f, "Fork(dimension {})", dimension)?;
                    stack.push((&**right, depth + 1));
                    stack.push((&**left, depth + 1));
                }
                Node::Leaf { bin } => writeln!(f, "Leaf(bin {})", bin)?,
            }
        }
        Ok(())
    }
}
