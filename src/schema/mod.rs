//! Schema module - Configuration and reporting types for fern evolution.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
