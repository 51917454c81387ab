//! Shared models

pub mod instruction;

pub use instruction::{
    BinaryOp, CastOp, InstId, InstKind, Instruction, InstructionGraph, Opcode, Operand, Predicate,
    ValueType,
};
