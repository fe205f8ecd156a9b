//! camsift Common Utilities
//!
//! Shared infrastructure for all camsift crates:
//! - Error types and result aliases
//! - Pipeline configuration loading and validation
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
