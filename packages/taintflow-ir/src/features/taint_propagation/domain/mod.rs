//! Taint propagation domain
//!
//! - `ShadowAddr`: region + byte offset operand of every propagation op
//! - `SelectChoice`: one candidate of a `select`
//! - `CbMasks` and the transfer table of the controlled-bit algebra

mod cb_masks;
mod transfer;

pub use cb_masks::{compile_masks, low_bits, write_masks, CbMasks, CB_WIDTH, MAX_MASK_BYTES};
pub use transfer::{transfer, Transfer};

use std::fmt;
use taintflow_shadow::Region;

/// Byte location in one shadow region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowAddr {
    pub region: Region,
    pub offset: u64,
}

impl ShadowAddr {
    pub fn new(region: Region, offset: u64) -> Self {
        Self { region, offset }
    }

    /// Temporaries slot
    pub fn llv(offset: u64) -> Self {
        Self::new(Region::Temporaries, offset)
    }

    pub fn reg(offset: u64) -> Self {
        Self::new(Region::Registers, offset)
    }

    pub fn spec(offset: u64) -> Self {
        Self::new(Region::SpecialState, offset)
    }

    pub fn ram(offset: u64) -> Self {
        Self::new(Region::Ram, offset)
    }

    /// Location `n` bytes further on, `None` on overflow
    pub fn add(self, n: u64) -> Option<Self> {
        self.offset.checked_add(n).map(|offset| Self { offset, ..self })
    }
}

impl fmt::Display for ShadowAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:#x}]", self.region, self.offset)
    }
}

/// Where a selected value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectSource {
    /// Temporaries slot holding the value
    Slot(u64),
    /// Literal, carries no taint
    Constant,
}

/// One candidate of a `select`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectChoice {
    pub selector: u64,
    pub source: SelectSource,
}

impl SelectChoice {
    pub fn slot(selector: u64, offset: u64) -> Self {
        Self {
            selector,
            source: SelectSource::Slot(offset),
        }
    }

    pub fn constant(selector: u64) -> Self {
        Self {
            selector,
            source: SelectSource::Constant,
        }
    }
}
