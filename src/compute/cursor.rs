//! Cursors over fern nodes and the ordered leaf traversal.
//!
//! Nodes have no parent pointers. A cursor remembers how it got where it is as a
//! stack of `(parent, branch)` steps, which is all that is needed to move back
//! up and to restore the region narrowed on the way down.

use super::error::{FernError, NodeKind};
use super::fern::{Branch, Fern, Node, Path};
use super::region::{Interval, Region};

/// Read-only cursor into a fern.
#[derive(Debug, Clone)]
pub struct NodeHandle<'a> {
    root: &'a Node,
    current: &'a Node,
    stack: Vec<(&'a Node, Branch)>,
}

impl<'a> NodeHandle<'a> {
    /// Cursor at `root`.
    pub fn new(root: &'a Node) -> Self {
        Self {
            root,
            current: root,
            stack: Vec::new(),
        }
    }

    /// Node under the cursor.
    pub fn node(&self) -> &'a Node {
        self.current
    }

    /// Move to the parent. Returns false at the root.
    pub fn up(&mut self) -> bool {
        match self.stack.pop() {
            Some((parent, _)) => {
                self.current = parent;
                true
            }
            None => false,
        }
    }

    /// Move to the left child. Returns false at a leaf.
    pub fn left(&mut self) -> bool {
        self.descend(Branch::Left)
    }

    /// Move to the right child. Returns false at a leaf.
    pub fn right(&mut self) -> bool {
        self.descend(Branch::Right)
    }

    fn descend(&mut self, branch: Branch) -> bool {
        let current = self.current;
        match current.child(branch) {
            Some(child) => {
                self.stack.push((current, branch));
                self.current = child;
                true
            }
            None => false,
        }
    }

    /// Return to the root.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.current = self.root;
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.current.is_leaf()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.stack.is_empty()
    }

    /// Split dimension of the current fork.
    pub fn current_dimension(&self) -> Option<usize> {
        match self.current {
            Node::Fork { dimension, .. } => Some(*dimension),
            Node::Leaf { .. } => None,
        }
    }

    /// Bin of the current leaf.
    pub fn current_bin(&self) -> Option<u32> {
        match self.current {
            Node::Leaf { bin } => Some(*bin),
            Node::Fork { .. } => None,
        }
    }

    /// Number of steps below the root.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Branches taken from the root.
    pub fn path(&self) -> Path {
        self.stack.iter().map(|&(_, branch)| branch).collect()
    }

    /// Dimension of the parent fork and the branch taken from it.
    pub fn last_step(&self) -> Option<(usize, Branch)> {
        self.stack.last().and_then(|&(parent, branch)| match parent {
            Node::Fork { dimension, .. } => Some((*dimension, branch)),
            Node::Leaf { .. } => None,
        })
    }
}

impl PartialEq for NodeHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.root, other.root)
            && self.stack.len() == other.stack.len()
            && self
                .stack
                .iter()
                .zip(&other.stack)
                .all(|(a, b)| a.1 == b.1)
    }
}

/// Editing cursor into a fern.
///
/// Holds the path only; the current node is resolved from the root on each
/// access.
pub struct NodeHandleMut<'a> {
    fern: &'a mut Fern,
    path: Path,
}

impl<'a> NodeHandleMut<'a> {
    pub(crate) fn new(fern: &'a mut Fern) -> Self {
        Self {
            fern,
            path: Vec::new(),
        }
    }

    pub(crate) fn at_path(fern: &'a mut Fern, path: Path) -> Self {
        Self { fern, path }
    }

    fn node(&self) -> Option<&Node> {
        self.fern.root().at(&self.path)
    }

    fn node_mut(&mut self) -> Option<&mut Node> {
        self.fern.root_mut().at_mut(&self.path)
    }

    /// Branches taken from the root.
    pub fn path(&self) -> &[Branch] {
        &self.path
    }

    /// Move to the parent. Returns false at the root.
    pub fn up(&mut self) -> bool {
        self.path.pop().is_some()
    }

    /// Move to the left child. Returns false at a leaf.
    pub fn left(&mut self) -> bool {
        self.descend(Branch::Left)
    }

    /// Move to the right child. Returns false at a leaf.
    pub fn right(&mut self) -> bool {
        self.descend(Branch::Right)
    }

    fn descend(&mut self, branch: Branch) -> bool {
        if self.is_leaf() {
            return false;
        }
        self.path.push(branch);
        true
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_none_or(Node::is_leaf)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Split dimension of the current fork.
    pub fn current_dimension(&self) -> Option<usize> {
        match self.node()? {
            Node::Fork { dimension, .. } => Some(*dimension),
            Node::Leaf { .. } => None,
        }
    }

    /// Bin of the current leaf.
    pub fn current_bin(&self) -> Option<u32> {
        match self.node()? {
            Node::Leaf { bin } => Some(*bin),
            Node::Fork { .. } => None,
        }
    }

    /// Reconstruct the region covered by the current node.
    pub fn region(&self) -> Result<Region, FernError> {
        let mut region = self.fern.domain().clone();
        let mut node = self.fern.root();
        for &branch in &self.path {
            let Node::Fork { dimension, .. } = node else {
                return Err(FernError::WrongNodeKind {
                    expected: NodeKind::Fork,
                });
            };
            region.split(*dimension, branch.is_upper())?;
            node = node.child(branch).ok_or(FernError::WrongNodeKind {
                expected: NodeKind::Fork,
            })?;
        }
        Ok(region)
    }

    /// Relabel the current leaf.
    pub fn set_bin(&mut self, bin: u32) -> Result<(), FernError> {
        self.check_bin(bin)?;
        match self.node_mut() {
            Some(Node::Leaf { bin: slot }) => {
                *slot = bin;
                Ok(())
            }
            _ => Err(FernError::WrongNodeKind {
                expected: NodeKind::Leaf,
            }),
        }
    }

    /// Change the split dimension of the current fork.
    pub fn set_dimension(&mut self, dimension: usize) -> Result<(), FernError> {
        self.check_dimension(dimension)?;
        match self.node_mut() {
            Some(Node::Fork { dimension: slot, .. }) => {
                *slot = dimension;
                Ok(())
            }
            _ => Err(FernError::WrongNodeKind {
                expected: NodeKind::Fork,
            }),
        }
    }

    /// Replace the current leaf with a fork over two new leaves. The cursor
    /// stays on the new fork.
    pub fn split_leaf(
        &mut self,
        dimension: usize,
        left_bin: u32,
        right_bin: u32,
    ) -> Result<(), FernError> {
        self.check_dimension(dimension)?;
        self.check_bin(left_bin)?;
        self.check_bin(right_bin)?;
        match self.node_mut() {
            Some(node @ Node::Leaf { .. }) => {
                *node = Node::fork(dimension, Node::leaf(left_bin), Node::leaf(right_bin));
                Ok(())
            }
            _ => Err(FernError::WrongNodeKind {
                expected: NodeKind::Leaf,
            }),
        }
    }

    /// Replace the current fork, and everything below it, with a leaf.
    pub fn collapse(&mut self, bin: u32) -> Result<(), FernError> {
        self.check_bin(bin)?;
        match self.node_mut() {
            Some(node @ Node::Fork { .. }) => {
                *node = Node::leaf(bin);
                Ok(())
            }
            _ => Err(FernError::WrongNodeKind {
                expected: NodeKind::Fork,
            }),
        }
    }

    /// Replace the current subtree with `subtree`.
    pub fn splice(&mut self, subtree: Node) -> Result<(), FernError> {
        subtree.check(self.fern.dimensions(), self.fern.num_bins())?;
        match self.node_mut() {
            Some(node) => {
                *node = subtree;
                Ok(())
            }
            None => Err(FernError::WrongNodeKind {
                expected: NodeKind::Fork,
            }),
        }
    }

    fn check_bin(&self, bin: u32) -> Result<(), FernError> {
        let num_bins = self.fern.num_bins();
        if bin >= num_bins {
            return Err(FernError::BinOutOfRange { bin, num_bins });
        }
        Ok(())
    }

    fn check_dimension(&self, dimension: usize) -> Result<(), FernError> {
        let dimensions = self.fern.dimensions();
        if dimension >= dimensions {
            return Err(FernError::DimensionMismatch {
                expected: dimensions,
                found: dimension + 1,
            });
        }
        Ok(())
    }
}

/// Cursor that visits leaves left to right while tracking each leaf's region.
#[derive(Debug, Clone)]
pub struct LeafCursor<'a> {
    domain: &'a Region,
    handle: NodeHandle<'a>,
    region: Region,
    // Interval of the split dimension before each step, one per level.
    parents: Vec<Interval>,
}

impl<'a> LeafCursor<'a> {
    /// Cursor at the first (leftmost) leaf.
    pub fn new(fern: &'a Fern) -> Result<Self, FernError> {
        let mut cursor = Self {
            domain: fern.domain(),
            handle: fern.handle(),
            region: fern.domain().clone(),
            parents: Vec::new(),
        };
        cursor.left_most()?;
        Ok(cursor)
    }

    /// Region of the current leaf.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Bin of the current leaf.
    pub fn bin(&self) -> Option<u32> {
        self.handle.current_bin()
    }

    pub fn handle(&self) -> &NodeHandle<'a> {
        &self.handle
    }

    fn left_most(&mut self) -> Result<(), FernError> {
        while let Some(dimension) = self.handle.current_dimension() {
            self.parents.push(self.region[dimension]);
            self.region.split(dimension, false)?;
            self.handle.left();
        }
        Ok(())
    }

    /// Move to the next leaf. Returns true when the last leaf has been passed
    /// and the cursor has wrapped around to the first one.
    pub fn advance(&mut self) -> Result<bool, FernError> {
        // Exact parent bounds; `Region::expand` drifts on non-dyadic domains.
        while let Some(parent) = self.parents.pop() {
            let Some((dimension, branch)) = self.handle.last_step() else {
                break;
            };
            self.region[dimension] = parent;
            self.handle.up();

            if branch == Branch::Left {
                self.parents.push(parent);
                self.region.split(dimension, true)?;
                self.handle.right();
                self.left_most()?;
                return Ok(false);
            }
        }

        self.parents.clear();
        self.handle.reset();
        self.region = self.domain.clone();
        self.left_most()?;
        Ok(true)
    }
}

/// Iterator over `(region, bin)` for every leaf, left to right.
pub struct LeafIter<'a> {
    cursor: Option<LeafCursor<'a>>,
    pending: Option<FernError>,
}

impl<'a> LeafIter<'a> {
    pub(crate) fn new(fern: &'a Fern) -> Self {
        match LeafCursor::new(fern) {
            Ok(cursor) => Self {
                cursor: Some(cursor),
                pending: None,
            },
            Err(error) => Self {
                cursor: None,
                pending: Some(error),
            },
        }
    }
}

impl Iterator for LeafIter<'_> {
    type Item = Result<(Region, u32), FernError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending.take() {
            return Some(Err(error));
        }

        let cursor = self.cursor.as_mut()?;
        let bin = cursor.bin()?;
        let item = (cursor.region().clone(), bin);

        match cursor.advance() {
            Ok(false) => {}
            Ok(true) => self.cursor = None,
            Err(error) => {
                self.cursor = None;
                self.pending = Some(error);
            }
        }

        Some(Ok(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(lower: f64, upper: f64) -> Region {
        Region::new(vec![Interval::new(lower, upper)])
    }

    #[test]
    fn test_handle_navigation() {
        let fern = Fern::new_uniform(line(0.0, 1.0), 2, 2).unwrap();
        let mut handle = fern.handle();
        assert!(handle.is_root());
        assert_eq!(handle.current_dimension(), Some(0));
        assert_eq!(handle.current_bin(), None);

        assert!(handle.left());
        assert!(handle.right());
        assert!(handle.is_leaf());
        assert_eq!(handle.current_bin(), Some(0));
        assert!(!handle.left());
        assert_eq!(handle.path(), vec![Branch::Left, Branch::Right]);
        assert_eq!(handle.last_step(), Some((0, Branch::Right)));

        assert!(handle.up());
        assert!(handle.up());
        assert!(!handle.up());
        assert!(handle.is_root());
    }

    #[test]
    fn test_handle_equality() {
        let fern = Fern::new_uniform(line(0.0, 1.0), 2, 2).unwrap();
        let mut a = fern.handle();
        let mut b = fern.handle();
        a.left();
        b.right();
        assert_ne!(a, b);
        b.reset();
        b.left();
        assert_eq!(a, b);
    }

    #[test]
    fn test_uniform_leaf_regions() {
        let fern = Fern::new_uniform(line(-3.0, 3.0), 2, 2).unwrap();
        let leaves: Vec<(Region, u32)> = fern.leaves().collect::<Result<_, _>>().unwrap();

        let expected = [(-3.0, -1.5), (-1.5, 0.0), (0.0, 1.5), (1.5, 3.0)];
        assert_eq!(leaves.len(), expected.len());
        for ((region, bin), (lower, upper)) in leaves.iter().zip(expected) {
            assert_eq!(region, &line(lower, upper));
            assert_eq!(*bin, 0);
        }
    }

    #[test]
    fn test_single_leaf_iteration() {
        let fern = Fern::new_uniform(line(0.0, 2.0), 0, 1).unwrap();
        let leaves: Vec<_> = fern.leaves().collect::<Result<_, _>>().unwrap();
        assert_eq!(leaves, vec![(line(0.0, 2.0), 0)]);
    }

    #[test]
    fn test_leaf_cursor_wraps_to_first_leaf() {
        let root = Node::fork(
            0,
            Node::leaf(1),
            Node::fork(0, Node::leaf(0), Node::fork(0, Node::leaf(1), Node::leaf(0))),
        );
        let fern = Fern::from_root(root, line(0.0, 8.0), 2).unwrap();
        let mut cursor = LeafCursor::new(&fern).unwrap();
        let first = cursor.handle().clone();

        let mut visited = vec![cursor.region().clone()];
        while !cursor.advance().unwrap() {
            visited.push(cursor.region().clone());
        }

        assert_eq!(
            visited,
            vec![line(0.0, 4.0), line(4.0, 6.0), line(6.0, 7.0), line(7.0, 8.0)]
        );
        assert_eq!(cursor.handle(), &first);
        assert_eq!(cursor.region(), &line(0.0, 4.0));
    }

    fn zigzag(levels: usize) -> Node {
        let mut node = Node::leaf(1);
        for level in 0..levels {
            node = if level % 2 == 0 {
                Node::fork(0, node, Node::leaf(0))
            } else {
                Node::fork(0, Node::leaf(1), node)
            };
        }
        node
    }

    fn leaves_with_paths(fern: &Fern) -> Vec<(Path, Region)> {
        let mut cursor = LeafCursor::new(fern).unwrap();
        let mut leaves = vec![(cursor.handle().path(), cursor.region().clone())];
        while !cursor.advance().unwrap() {
            leaves.push((cursor.handle().path(), cursor.region().clone()));
        }
        leaves
    }

    #[test]
    fn test_deep_leaves_tile_non_dyadic_domain() {
        let root = Node::fork(0, zigzag(40), zigzag(40));
        let mut fern = Fern::from_root(root, line(0.1, 0.7), 2).unwrap();
        let leaves = leaves_with_paths(&fern);
        assert_eq!(leaves.len(), 82);

        assert_eq!(leaves[0].1[0].lower, 0.1);
        assert_eq!(leaves[leaves.len() - 1].1[0].upper, 0.7);
        for pair in leaves.windows(2) {
            assert_eq!(pair[0].1[0].upper, pair[1].1[0].lower);
        }

        for (path, region) in &leaves {
            let exact = fern.handle_mut_at(path).unwrap().region().unwrap();
            assert_eq!(region, &exact);
        }
    }

    #[test]
    fn test_two_dimensional_regions() {
        let root = Node::fork(1, Node::fork(0, Node::leaf(0), Node::leaf(1)), Node::leaf(2));
        let domain = Region::new(vec![Interval::new(0.0, 4.0), Interval::new(-2.0, 2.0)]);
        let fern = Fern::from_root(root, domain, 3).unwrap();
        let leaves: Vec<_> = fern.leaves().collect::<Result<_, _>>().unwrap();

        assert_eq!(
            leaves,
            vec![
                (
                    Region::new(vec![Interval::new(0.0, 2.0), Interval::new(-2.0, 0.0)]),
                    0
                ),
                (
                    Region::new(vec![Interval::new(2.0, 4.0), Interval::new(-2.0, 0.0)]),
                    1
                ),
                (
                    Region::new(vec![Interval::new(0.0, 4.0), Interval::new(0.0, 2.0)]),
                    2
                ),
            ]
        );
    }

    #[test]
    fn test_handle_mut_edits() {
        let mut fern = Fern::new(line(0.0, 1.0), 3).unwrap();
        {
            let mut handle = fern.handle_mut();
            assert!(handle.left());
            handle.set_bin(2).unwrap();
            assert_eq!(
                handle.set_bin(3),
                Err(FernError::BinOutOfRange {
                    bin: 3,
                    num_bins: 3
                })
            );
            assert!(matches!(
                handle.set_dimension(0),
                Err(FernError::WrongNodeKind {
                    expected: NodeKind::Fork
                })
            ));

            handle.split_leaf(0, 1, 2).unwrap();
            assert_eq!(handle.current_dimension(), Some(0));
            assert_eq!(handle.region().unwrap(), line(0.0, 0.5));
            assert!(handle.right());
            assert_eq!(handle.region().unwrap(), line(0.25, 0.5));
        }
        assert_eq!(fern.query(&[0.1]).unwrap(), 1);
        assert_eq!(fern.query(&[0.4]).unwrap(), 2);
        assert_eq!(fern.leaf_count(), 3);

        let mut handle = fern.handle_mut_at(&[Branch::Left]).unwrap();
        handle.collapse(1).unwrap();
        assert!(handle.is_leaf());
        assert_eq!(fern.leaf_count(), 2);
        assert_eq!(fern.query(&[0.4]).unwrap(), 1);
    }

    #[test]
    fn test_handle_mut_splice() {
        let mut fern = Fern::new(line(0.0, 1.0), 2).unwrap();
        let mut handle = fern.handle_mut();
        handle.right();
        assert!(
            handle
                .splice(Node::fork(3, Node::leaf(0), Node::leaf(1)))
                .is_err()
        );
        handle
            .splice(Node::fork(0, Node::leaf(0), Node::leaf(1)))
            .unwrap();
        assert_eq!(fern.query(&[0.9]).unwrap(), 1);
        assert!(fern.handle_mut_at(&[Branch::Left, Branch::Left]).is_none());
    }
}
