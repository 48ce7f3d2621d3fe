//! Clipforge Common Utilities
//!
//! Shared infrastructure for all Clipforge crates:
//! - Error types and result aliases
//! - Export/application configuration loading
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
