/*
 * Control-mask transfer functions
 *
 * For an operation `dst = src OP lit` with one tainted operand, estimate
 * which bits of the result are still reversibly determined by the tainted
 * input (cb), and which bits are known literal ones / zeros.
 *
 * Masks are `w = 8 * size` bits wide; every result is truncated to `w`.
 *
 * Irreversible operations (comparisons, float arithmetic, calls, address
 * computation) clear all masks.
 */

use crate::shared::models::{BinaryOp, CastOp, Opcode};

use super::cb_masks::{low_bits, CbMasks};

/// Outcome of applying a transfer function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Masks derived from the operation semantics
    Exact(CbMasks),
    /// The operation needs a literal operand and none was present
    MissingLiteral(CbMasks),
    /// Opcode without a transfer rule
    Unknown,
}

impl Transfer {
    /// Masks to write back; unknown opcodes leave nothing controlled
    pub fn masks(&self) -> CbMasks {
        match self {
            Transfer::Exact(m) | Transfer::MissingLiteral(m) => *m,
            Transfer::Unknown => CbMasks::ZERO,
        }
    }
}

/// Apply the transfer function of `opcode` to `masks` (width `width` bits)
pub fn transfer(opcode: Opcode, masks: CbMasks, literal: Option<u128>, width: u32) -> Transfer {
    let m = masks.truncate(width);
    let result = match opcode {
        Opcode::Binary(op) => return binary(op, m, literal, width),
        Opcode::Cast(op) if op.is_float() => Transfer::Exact(CbMasks::ZERO),
        // Trunc is covered by the final truncation
        Opcode::Cast(CastOp::Trunc) => Transfer::Exact(m),
        Opcode::Cast(_)
        | Opcode::Load
        | Opcode::Store
        | Opcode::ExtractValue
        | Opcode::InsertValue
        | Opcode::Select
        | Opcode::Phi => Transfer::Exact(m),
        Opcode::ICmp | Opcode::FCmp | Opcode::Call | Opcode::GetElementPtr | Opcode::Alloca => {
            Transfer::Exact(CbMasks::ZERO)
        }
        Opcode::Terminator | Opcode::Unknown => Transfer::Unknown,
    };
    truncated(result, width)
}

fn truncated(t: Transfer, width: u32) -> Transfer {
    match t {
        Transfer::Exact(m) => Transfer::Exact(m.truncate(width)),
        Transfer::MissingLiteral(m) => Transfer::MissingLiteral(m.truncate(width)),
        Transfer::Unknown => Transfer::Unknown,
    }
}

fn binary(op: BinaryOp, m: CbMasks, literal: Option<u128>, width: u32) -> Transfer {
    if op.is_float() {
        return Transfer::Exact(CbMasks::ZERO);
    }

    let Some(lit) = literal else {
        let fallback = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Xor => CbMasks::new(m.cb, 0, 0),
            _ => m,
        };
        return truncated(Transfer::MissingLiteral(fallback), width);
    };

    let out = match op {
        BinaryOp::Add | BinaryOp::Sub => {
            // carries only travel upward from the lowest set literal bit
            let keep = low_bits(lit.trailing_zeros());
            CbMasks::new(m.cb, m.one & keep, m.zero & keep)
        }
        BinaryOp::Mul if lit == 0 => CbMasks::new(0, 0, u128::MAX),
        BinaryOp::Mul => {
            let tz = lit.trailing_zeros();
            CbMasks::new(m.cb << tz, 0, low_bits(tz))
        }
        BinaryOp::UDiv | BinaryOp::SDiv | BinaryOp::URem | BinaryOp::SRem if lit == 0 => {
            CbMasks::ZERO
        }
        BinaryOp::UDiv | BinaryOp::SDiv => {
            let log2 = 127 - lit.leading_zeros();
            CbMasks::new(m.cb >> log2, 0, 0)
        }
        BinaryOp::URem => {
            let keep = low_bits(128 - lit.leading_zeros());
            CbMasks::new(m.cb & keep, 0, !keep)
        }
        BinaryOp::SRem => {
            let keep = low_bits(128 - lit.leading_zeros());
            CbMasks::new(m.cb & keep, 0, 0)
        }
        BinaryOp::And => CbMasks::new(m.cb & lit, m.one & lit, m.zero | !lit),
        BinaryOp::Or => CbMasks::new(m.cb & !lit, m.one | lit, m.zero & !lit),
        BinaryOp::Xor => CbMasks::new(
            m.cb,
            (m.one & !lit) | (m.zero & lit),
            (m.zero & !lit) | (m.one & lit),
        ),
        BinaryOp::Shl => match shift_amount(lit, width) {
            Some(n) => CbMasks::new(m.cb << n, m.one << n, (m.zero << n) | low_bits(n)),
            None => CbMasks::new(0, 0, u128::MAX),
        },
        BinaryOp::LShr => match shift_amount(lit, width) {
            Some(n) => {
                let vacated = low_bits(width) & !low_bits(width - n);
                CbMasks::new(m.cb >> n, m.one >> n, (m.zero >> n) | vacated)
            }
            None => CbMasks::new(0, 0, u128::MAX),
        },
        BinaryOp::AShr => {
            let cb = shift_amount(lit, width).map_or(0, |n| m.cb >> n);
            CbMasks::new(cb, ashr(m.one, lit, width), ashr(m.zero, lit, width))
        }
        BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem => {
            CbMasks::ZERO
        }
    };
    Transfer::Exact(out.truncate(width))
}

/// Shift amount inside the word, `None` when everything is shifted out
fn shift_amount(lit: u128, width: u32) -> Option<u32> {
    if lit < u128::from(width) {
        Some(lit as u32)
    } else {
        None
    }
}

/// Arithmetic right shift of a `width`-bit value
fn ashr(x: u128, lit: u128, width: u32) -> u128 {
    if width == 0 {
        return 0;
    }
    let negative = (x >> (width - 1)) & 1 == 1;
    match shift_amount(lit, width) {
        Some(n) if negative => (x >> n) | (low_bits(width) & !low_bits(width - n)),
        Some(n) => x >> n,
        None if negative => low_bits(width),
        None => 0,
    }
}
