//! Error types for tree construction, traversal and editing.

use std::fmt;

/// Kind of tree node, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Fork,
    Leaf,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Fork => write!(f, "fork"),
            NodeKind::Leaf => write!(f, "leaf"),
        }
    }
}

/// Errors raised by region arithmetic and fern operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FernError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Bin count mismatch: expected {expected}, found {found}")]
    BinCountMismatch { expected: u32, found: u32 },
    #[error("Degenerate interval [{lower}, {upper}] cannot be split or expanded")]
    DegenerateRegion { lower: f64, upper: f64 },
    #[error("Region must have at least one dimension")]
    EmptyRegion,
    #[error("Bin count must be non-zero")]
    InvalidBinCount,
    #[error("Bin {bin} is out of range for {num_bins} bins")]
    BinOutOfRange { bin: u32, num_bins: u32 },
    #[error("Balanced depth {depth} exceeds the limit of {max}")]
    DepthTooLarge { depth: usize, max: usize },
    #[error("Cursor is not at a {expected}")]
    WrongNodeKind { expected: NodeKind },
}
