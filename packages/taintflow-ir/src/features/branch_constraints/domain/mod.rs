//! Branch constraint domain
//!
//! - `SymbolicExpr`: reconstructed expression of a branch operand
//! - `MemoryHelper`: decoded guest memory access helper name

mod memory_helper;
mod symbolic_expr;

pub use memory_helper::MemoryHelper;
pub use symbolic_expr::SymbolicExpr;
