/*
 * Taintflow IR - byte-granular taint propagation for translated guest code
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Instruction graph model (InstructionGraph, Opcode, Operand)
 * - features/    : Vertical slices (propagation → routing → branch constraints)
 * - config/      : Presets, YAML v1 settings, validation
 * - errors       : TaintError
 *
 * The engine is driven synchronously, one operation per translated
 * instruction, over a taintflow-shadow ShadowStore it owns.
 */

#![allow(clippy::too_many_arguments)] // Propagation ops mirror instruction operands
#![allow(clippy::new_without_default)] // Default impl not always needed

/// Shared models
pub mod shared;

/// Feature modules (taint_propagation, address_routing, branch_constraints)
pub mod features;

/// Configuration (presets, YAML, validation)
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, EngineConfig, EngineSettings, Preset};
pub use errors::{TaintError, TaintResult};

pub use features::address_routing::{AddressRouter, CpuStateLayout, HostRoute, RamResolver};
pub use features::branch_constraints::{ConstraintExtractor, ConstraintSink, SymbolicExpr};
pub use features::taint_propagation::{
    CbMasks, LoadObserver, PointerAccess, PointerObserver, SelectChoice, ShadowAddr, TaintEngine,
};

pub use shared::models::{
    BinaryOp, CastOp, InstId, InstKind, Instruction, InstructionGraph, Opcode, Operand, Predicate,
    ValueType,
};

pub use taintflow_shadow::{Label, Region, ShadowStore, TaintData};
