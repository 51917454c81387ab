//! Domain layer for the shadow store
//!
//! # Domain Models
//!
//! - `TaintData`: per-byte taint record (labels, control masks, compute number)
//! - `LabelSet`: immutable, shared set of origin labels
//! - `Region`: one of the four disjoint shadow address spaces
//!
//! # Port Trait
//!
//! - `ShadowStore`: byte-addressable query/update contract consumed by the
//!   propagation engine
//!
//! # Examples
//!
//! ```rust,ignore
//! use taintflow_shadow::{Region, ShadowStore, TaintData};
//!
//! fn snapshot(store: &impl ShadowStore, addr: u64) -> TaintData {
//!     store.query_full(Region::Ram, addr)
//! }
//! ```

mod labels;
mod taint_data;

pub use labels::{Label, LabelSet, LabelSetRef};
pub use taint_data::TaintData;

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Regions
// ═══════════════════════════════════════════════════════════════════════════

/// Disjoint shadow address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Translated-instruction temporaries (frame based)
    Temporaries,
    /// General-purpose register file
    Registers,
    /// Special CPU state (program counter, flags, vector registers, ...)
    SpecialState,
    /// Guest RAM
    Ram,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::Temporaries,
        Region::Registers,
        Region::SpecialState,
        Region::Ram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Temporaries => "llv",
            Region::Registers => "greg",
            Region::SpecialState => "gspec",
            Region::Ram => "ram",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Byte-addressable shadow storage
///
/// Implementations own label-set lifetime and per-region backing storage.
/// Reads outside a region return the empty record; writes outside a region
/// are dropped. Callers that need a hard bound consult [`ShadowStore::size`].
pub trait ShadowStore {
    /// Label set of one byte, `None` when untainted
    fn query(&self, region: Region, addr: u64) -> Option<LabelSetRef>;

    /// Full record of one byte
    fn query_full(&self, region: Region, addr: u64) -> TaintData;

    /// Overwrite one byte's record
    fn set_full(&mut self, region: Region, addr: u64, td: TaintData);

    /// Return a range to the empty state
    fn remove(&mut self, region: Region, addr: u64, size: u64);

    /// Snapshot copy of a range, possibly across regions
    ///
    /// Overlapping ranges within one region behave like `memmove`.
    fn copy(&mut self, dst_region: Region, dst: u64, src_region: Region, src: u64, size: u64);

    /// Addressable bytes in a region
    fn size(&self, region: Region) -> u64;

    /// Debug name of a region
    fn name(&self, region: Region) -> &str {
        region.as_str()
    }

    /// Open a new temporaries frame of `frame_size` bytes
    fn push_frame(&mut self, _frame_size: u64) {}

    /// Drop the active temporaries frame
    fn pop_frame(&mut self, _frame_size: u64) {}

    /// Return to the outermost temporaries frame
    fn reset_frame(&mut self) {}

    /// Whether `addr..addr + size` lies inside the region
    fn contains(&self, region: Region, addr: u64, size: u64) -> bool {
        addr.checked_add(size)
            .map_or(false, |end| end <= self.size(region))
    }

    /// Whether any byte of the range carries labels
    fn any_tainted(&self, region: Region, addr: u64, size: u64) -> bool {
        (0..size).any(|i| self.query(region, addr.wrapping_add(i)).is_some())
    }
}
