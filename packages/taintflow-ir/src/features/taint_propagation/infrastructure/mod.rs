//! Taint propagation infrastructure
//!
//! - `engine`: `TaintEngine` and the propagation operations
//! - `mask_update`: control-mask update after copy / mix
//! - `diagnostics`: rate-limited unreliable-derivation warnings

mod diagnostics;
mod engine;
mod mask_update;

pub use diagnostics::{Unreliable, UnreliableWarnings};
pub use engine::TaintEngine;
