//! Word-level control masks
//!
//! Per-byte masks are packed little-endian into 128-bit words so that word
//! operations (shifts, multiplication by a literal, ...) can be applied to
//! them, then unpacked back onto the bytes.

use taintflow_shadow::{Region, ShadowStore};

use crate::errors::{TaintError, TaintResult};

/// Mask word width in bits
pub const CB_WIDTH: u32 = 128;

/// Most bytes a mask word can describe
pub const MAX_MASK_BYTES: u64 = (CB_WIDTH / 8) as u64;

/// Controlled / literal-one / literal-zero masks of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CbMasks {
    pub cb: u128,
    pub one: u128,
    pub zero: u128,
}

impl CbMasks {
    pub const ZERO: CbMasks = CbMasks {
        cb: 0,
        one: 0,
        zero: 0,
    };

    pub fn new(cb: u128, one: u128, zero: u128) -> Self {
        Self { cb, one, zero }
    }

    /// Keep the low `bits` bits of every mask
    pub fn truncate(self, bits: u32) -> Self {
        let m = low_bits(bits);
        Self {
            cb: self.cb & m,
            one: self.one & m,
            zero: self.zero & m,
        }
    }
}

/// Mask with the low `n` bits set
pub fn low_bits(n: u32) -> u128 {
    if n >= CB_WIDTH {
        u128::MAX
    } else {
        (1u128 << n) - 1
    }
}

fn check_width(size: u64) -> TaintResult<()> {
    if size > MAX_MASK_BYTES {
        return Err(TaintError::MaskWidthExceeded {
            size,
            max: MAX_MASK_BYTES,
        });
    }
    Ok(())
}

/// Pack the masks of `size` bytes; byte `i` lands in bits `8i..8i+8`
pub fn compile_masks<S: ShadowStore + ?Sized>(
    store: &S,
    region: Region,
    addr: u64,
    size: u64,
) -> TaintResult<CbMasks> {
    check_width(size)?;
    let mut masks = CbMasks::ZERO;
    for i in (0..size).rev() {
        let td = store.query_full(region, addr.wrapping_add(i));
        masks.cb = (masks.cb << 8) | u128::from(td.cb_mask);
        masks.one = (masks.one << 8) | u128::from(td.one_mask);
        masks.zero = (masks.zero << 8) | u128::from(td.zero_mask);
    }
    Ok(masks)
}

/// Unpack masks onto `size` bytes, leaving labels untouched
pub fn write_masks<S: ShadowStore + ?Sized>(
    store: &mut S,
    region: Region,
    addr: u64,
    size: u64,
    masks: CbMasks,
) -> TaintResult<()> {
    check_width(size)?;
    let mut m = masks;
    for i in 0..size {
        let at = addr.wrapping_add(i);
        let mut td = store.query_full(region, at);
        td.cb_mask = m.cb as u8;
        td.one_mask = m.one as u8;
        td.zero_mask = m.zero as u8;
        m.cb >>= 8;
        m.one >>= 8;
        m.zero >>= 8;
        store.set_full(region, at, td);
    }
    Ok(())
}
