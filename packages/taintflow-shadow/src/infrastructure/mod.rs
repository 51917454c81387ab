//! Infrastructure layer - shadow store backends

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryShadow, ShadowLayout};
