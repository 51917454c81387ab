//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure logic over shadow addresses and instructions
//! - ports/      - Interface definitions (traits) for callers to implement
//! - infrastructure/ - `TaintEngine` operations and their helpers

pub mod taint_propagation;

// Host loads/stores into CPU state and guest RAM
pub mod address_routing;

// Symbolic constraints at tainted branches
pub mod branch_constraints;
