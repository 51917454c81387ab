//! Instruction graph of one translation unit
//!
//! Arena of SSA instructions addressed by [`InstId`]. Operands reference
//! earlier instructions by id, so the graph is acyclic for straight-line
//! translated code (phi nodes aside).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════════════════════

/// Result type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Void,
    /// Integer of the given bit width
    Int(u32),
    /// Floating point of the given bit width
    Float(u32),
    Pointer,
    /// Aggregates, vectors and anything else, by name
    Named(String),
}

impl ValueType {
    pub fn int_width(&self) -> Option<u32> {
        match self {
            ValueType::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, ValueType::Pointer)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Void => write!(f, "void"),
            ValueType::Int(bits) => write!(f, "i{}", bits),
            ValueType::Float(16) => write!(f, "half"),
            ValueType::Float(32) => write!(f, "float"),
            ValueType::Float(64) => write!(f, "double"),
            ValueType::Float(bits) => write!(f, "fp{}", bits),
            ValueType::Pointer => write!(f, "ptr"),
            ValueType::Named(name) => write!(f, "{}", name),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Opcodes
// ═══════════════════════════════════════════════════════════════════════════

/// Two-operand arithmetic and logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::FAdd => "fadd",
            BinaryOp::Sub => "sub",
            BinaryOp::FSub => "fsub",
            BinaryOp::Mul => "mul",
            BinaryOp::FMul => "fmul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::URem => "urem",
            BinaryOp::SRem => "srem",
            BinaryOp::FRem => "frem",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem
        )
    }
}

/// Value conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
}

impl CastOp {
    pub fn name(&self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FPToUI => "fptoui",
            CastOp::FPToSI => "fptosi",
            CastOp::UIToFP => "uitofp",
            CastOp::SIToFP => "sitofp",
            CastOp::FPTrunc => "fptrunc",
            CastOp::FPExt => "fpext",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::BitCast => "bitcast",
            CastOp::AddrSpaceCast => "addrspacecast",
        }
    }

    /// Casts whose source or destination is floating point
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            CastOp::FPToUI
                | CastOp::FPToSI
                | CastOp::UIToFP
                | CastOp::SIToFP
                | CastOp::FPTrunc
                | CastOp::FPExt
        )
    }
}

/// Comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
    /// Any floating-point predicate
    Float,
}

impl Predicate {
    /// Unsigned orderings render in function form
    pub fn is_unsigned_ordering(&self) -> bool {
        matches!(
            self,
            Predicate::Ugt | Predicate::Uge | Predicate::Ult | Predicate::Ule
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Predicate::Eq => "==",
            Predicate::Ne => "!=",
            Predicate::Sgt => ">",
            Predicate::Sge => ">=",
            Predicate::Slt => "<",
            Predicate::Sle => "<=",
            Predicate::Ugt => "UGT",
            Predicate::Uge => "UGE",
            Predicate::Ult => "ULT",
            Predicate::Ule => "ULE",
            Predicate::Float => "??",
        }
    }
}

/// Instruction kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstKind {
    Binary(BinaryOp),
    Cast(CastOp),
    Cmp(Predicate),
    Load,
    Store,
    /// Direct call when the callee is known
    Call { callee: Option<String> },
    Select,
    Phi,
    GetElementPtr,
    Alloca,
    ExtractValue,
    InsertValue,
    Terminator,
    /// Opcode outside the modelled set
    Other(String),
}

/// Flat opcode used by the mask transfer functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Binary(BinaryOp),
    Cast(CastOp),
    ICmp,
    FCmp,
    Load,
    Store,
    Call,
    Select,
    Phi,
    GetElementPtr,
    Alloca,
    ExtractValue,
    InsertValue,
    Terminator,
    Unknown,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Binary(op) => op.name(),
            Opcode::Cast(op) => op.name(),
            Opcode::ICmp => "icmp",
            Opcode::FCmp => "fcmp",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Call => "call",
            Opcode::Select => "select",
            Opcode::Phi => "phi",
            Opcode::GetElementPtr => "getelementptr",
            Opcode::Alloca => "alloca",
            Opcode::ExtractValue => "extractvalue",
            Opcode::InsertValue => "insertvalue",
            Opcode::Terminator => "terminator",
            Opcode::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Operands and instructions
// ═══════════════════════════════════════════════════════════════════════════

/// Instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Integer literal, zero-extended to 128 bits
    ConstInt { value: u128, bits: u32 },
    /// Result of another instruction
    Inst(InstId),
    /// Function argument by index
    Argument(u32),
    Global(String),
    Undef,
}

impl Operand {
    /// Integer literal truncated to `bits`
    pub fn const_int(value: u128, bits: u32) -> Self {
        let value = if bits >= 128 {
            value
        } else {
            value & ((1u128 << bits) - 1)
        };
        Operand::ConstInt { value, bits }
    }

    pub fn literal(&self) -> Option<u128> {
        match self {
            Operand::ConstInt { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl From<InstId> for Operand {
    fn from(id: InstId) -> Self {
        Operand::Inst(id)
    }
}

/// One SSA instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// SSA name, the register name for loads from CPU state
    pub name: Option<String>,
    pub kind: InstKind,
    pub operands: Vec<Operand>,
    pub ty: ValueType,
}

impl Instruction {
    pub fn new(kind: InstKind, operands: Vec<Operand>, ty: ValueType) -> Self {
        Self {
            name: None,
            kind,
            operands,
            ty,
        }
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>, ty: ValueType) -> Self {
        Self::new(InstKind::Binary(op), vec![lhs.into(), rhs.into()], ty)
    }

    pub fn cast(op: CastOp, value: impl Into<Operand>, to: ValueType) -> Self {
        Self::new(InstKind::Cast(op), vec![value.into()], to)
    }

    pub fn cmp(pred: Predicate, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self::new(InstKind::Cmp(pred), vec![lhs.into(), rhs.into()], ValueType::Int(1))
    }

    pub fn load(ptr: impl Into<Operand>, ty: ValueType) -> Self {
        Self::new(InstKind::Load, vec![ptr.into()], ty)
    }

    pub fn call(callee: Option<&str>, args: Vec<Operand>, ty: ValueType) -> Self {
        Self::new(
            InstKind::Call {
                callee: callee.map(str::to_string),
            },
            args,
            ty,
        )
    }

    /// Builder: Set SSA name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn opcode(&self) -> Opcode {
        match &self.kind {
            InstKind::Binary(op) => Opcode::Binary(*op),
            InstKind::Cast(op) => Opcode::Cast(*op),
            InstKind::Cmp(Predicate::Float) => Opcode::FCmp,
            InstKind::Cmp(_) => Opcode::ICmp,
            InstKind::Load => Opcode::Load,
            InstKind::Store => Opcode::Store,
            InstKind::Call { .. } => Opcode::Call,
            InstKind::Select => Opcode::Select,
            InstKind::Phi => Opcode::Phi,
            InstKind::GetElementPtr => Opcode::GetElementPtr,
            InstKind::Alloca => Opcode::Alloca,
            InstKind::ExtractValue => Opcode::ExtractValue,
            InstKind::InsertValue => Opcode::InsertValue,
            InstKind::Terminator => Opcode::Terminator,
            InstKind::Other(_) => Opcode::Unknown,
        }
    }

    /// Integer literal operands in operand order
    pub fn literals(&self) -> impl Iterator<Item = u128> + '_ {
        self.operands.iter().filter_map(Operand::literal)
    }

    pub fn operand(&self, idx: usize) -> Option<&Operand> {
        self.operands.get(idx)
    }
}

/// Arena of instructions for one translation unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionGraph {
    insts: Vec<Instruction>,
}

impl InstructionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction; operands are not validated
    pub fn push(&mut self, inst: Instruction) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(inst);
        id
    }

    pub fn get(&self, id: InstId) -> Option<&Instruction> {
        self.insts.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.insts
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstId(i as u32), inst))
    }
}
