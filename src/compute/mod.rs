//! Compute module - Fern trees, traversal and evolutionary search.

mod cursor;
mod error;
mod fern;
mod region;

pub mod evolution;

pub use cursor::*;
pub use error::*;
pub use fern::*;
pub use region::*;
