//! Shared module - Common types used by every feature
//!
//! Holds the instruction-graph model the translation layer hands to the
//! engine. No dependency on any feature module.

pub mod models;

// Re-exports for convenience
pub use models::*;
