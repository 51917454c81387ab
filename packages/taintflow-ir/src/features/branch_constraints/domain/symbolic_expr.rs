//! Symbolic expression tree of a branch operand
//!
//! Rendered through `Display` in a Z3-friendly textual form, e.g.
//! `Extract(8, 0, (regs['eax'] - 88))`.

use std::fmt;

use crate::shared::models::ValueType;

use super::memory_helper::MemoryHelper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolicExpr {
    /// Integer literal, decimal
    Literal(u128),
    /// Value loaded from CPU state, by SSA name
    Register(String),
    /// Truncation to the low `bits` bits
    Extract { bits: u32, value: Box<SymbolicExpr> },
    ZeroExt { bits: u32, value: Box<SymbolicExpr> },
    SignExt { bits: u32, value: Box<SymbolicExpr> },
    /// Integer-destination cast without a symbolic form
    BadIntCast(Box<SymbolicExpr>),
    PtrCast(Box<SymbolicExpr>),
    TypeCast { ty: ValueType, value: Box<SymbolicExpr> },
    /// `(lhs op rhs)`, `?` when the operator has no symbol
    Infix {
        op: Option<&'static str>,
        lhs: Box<SymbolicExpr>,
        rhs: Box<SymbolicExpr>,
    },
    /// `name(lhs, rhs)` for unsigned division, remainder and logical shift
    Call2 {
        name: &'static str,
        lhs: Box<SymbolicExpr>,
        rhs: Box<SymbolicExpr>,
    },
    /// Guest memory access through a helper
    MemAccess { helper: MemoryHelper, addr: Box<SymbolicExpr> },
    /// Call to anything else, `None` for indirect calls
    UnknownCall(Option<String>),
    BadInstruction,
    BadValue,
    /// Recursion bound reached
    DepthExceeded,
}

impl SymbolicExpr {
    pub fn infix(op: Option<&'static str>, lhs: SymbolicExpr, rhs: SymbolicExpr) -> Self {
        SymbolicExpr::Infix {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call2(name: &'static str, lhs: SymbolicExpr, rhs: SymbolicExpr) -> Self {
        SymbolicExpr::Call2 {
            name,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Whether any node of the tree is an error marker
    pub fn has_errors(&self) -> bool {
        match self {
            SymbolicExpr::Literal(_) | SymbolicExpr::Register(_) => false,
            SymbolicExpr::Extract { value, .. }
            | SymbolicExpr::ZeroExt { value, .. }
            | SymbolicExpr::SignExt { value, .. }
            | SymbolicExpr::PtrCast(value)
            | SymbolicExpr::TypeCast { value, .. } => value.has_errors(),
            SymbolicExpr::MemAccess { helper, addr } => {
                helper.endian.is_none() || helper.access.is_none() || addr.has_errors()
            }
            SymbolicExpr::Infix { op, lhs, rhs } => {
                op.is_none() || lhs.has_errors() || rhs.has_errors()
            }
            SymbolicExpr::Call2 { lhs, rhs, .. } => lhs.has_errors() || rhs.has_errors(),
            SymbolicExpr::BadIntCast(_)
            | SymbolicExpr::UnknownCall(_)
            | SymbolicExpr::BadInstruction
            | SymbolicExpr::BadValue
            | SymbolicExpr::DepthExceeded => true,
        }
    }
}

impl fmt::Display for SymbolicExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicExpr::Literal(v) => write!(f, "{}", v),
            SymbolicExpr::Register(name) => write!(f, "regs['{}']", name),
            SymbolicExpr::Extract { bits, value } => write!(f, "Extract({}, 0, {})", bits, value),
            SymbolicExpr::ZeroExt { bits, value } => write!(f, "ZeroExt({}, {})", bits, value),
            SymbolicExpr::SignExt { bits, value } => write!(f, "SignExt({}, {})", bits, value),
            SymbolicExpr::BadIntCast(value) => write!(f, "ERROR({})", value),
            SymbolicExpr::PtrCast(value) => write!(f, "xxxptrcast({})", value),
            SymbolicExpr::TypeCast { ty, value } => write!(f, "xxxcast({},{})", ty, value),
            SymbolicExpr::Infix { op, lhs, rhs } => {
                write!(f, "({} {} {})", lhs, op.unwrap_or("?"), rhs)
            }
            SymbolicExpr::Call2 { name, lhs, rhs } => write!(f, "{}({}, {})", name, lhs, rhs),
            SymbolicExpr::MemAccess { helper, addr } => write!(f, "load({}{})", helper, addr),
            SymbolicExpr::UnknownCall(Some(name)) => write!(f, "XXX_unk_{}", name),
            SymbolicExpr::UnknownCall(None) => write!(f, "XXX_unk_indirect"),
            SymbolicExpr::BadInstruction => write!(f, "Error_bad_insn"),
            SymbolicExpr::BadValue => write!(f, "Error_bad_value"),
            SymbolicExpr::DepthExceeded => write!(f, "Error_depth"),
        }
    }
}
