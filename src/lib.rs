//! Ferns - Evolvable spatial partition trees.
//!
//! A fern is a binary tree that splits an axis-aligned domain in half at every
//! fork and labels each resulting cell with a bin. Populations of ferns are
//! evolved with a genetic algorithm against any fitness function that queries
//! them.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, statistics and history types
//! - `compute`: Regions, trees, cursors and evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use ferns::compute::{Fern, Interval, Node, Region};
//!
//! let domain = Region::uniform(Interval::new(-1.0, 1.0), 2);
//! let fern = Fern::from_root(
//!     Node::fork(0, Node::leaf(0), Node::fork(1, Node::leaf(1), Node::leaf(2))),
//!     domain,
//!     3,
//! )
//! .unwrap();
//!
//! assert_eq!(fern.query(&[-0.5, 0.9]).unwrap(), 0);
//! assert_eq!(fern.query(&[0.5, 0.9]).unwrap(), 2);
//!
//! for leaf in fern.leaves() {
//!     let (region, bin) = leaf.unwrap();
//!     println!("{} -> {}", region, bin);
//! }
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, EvolutionError, FernRng, PopulationSnapshot};
pub use compute::{Controller, Fern, FernError, Interval, Node, Region};
pub use schema::{EvolutionConfig, FernConfig, MutationConfig, RunConfig};
