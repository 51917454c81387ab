//! taintflow-shadow - byte-granular shadow storage for taint tracking
//!
//! ## Core Principles
//!
//! 1. **One record per byte**: every addressable byte of every region has a
//!    `TaintData` record, empty until something writes it
//! 2. **Shared label sets**: records reference immutable label sets; many
//!    bytes may share one set, a set is never duplicated
//! 3. **Narrow contract**: the propagation engine only sees the `ShadowStore`
//!    trait (query / update / copy / remove / size)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taintflow_shadow::{Label, MemoryShadow, Region, ShadowLayout, ShadowStore};
//!
//! let mut shadow = MemoryShadow::new(ShadowLayout::default())?;
//! shadow.apply_label(Region::Ram, 0x100, Label(1))?;
//! shadow.copy(Region::Registers, 0, Region::Ram, 0x100, 4);
//! assert!(shadow.query(Region::Registers, 0).is_some());
//! ```

pub mod domain;
pub mod error;

pub mod infrastructure;

pub use error::{ErrorKind, Result, ShadowError};

pub use domain::{Label, LabelSet, LabelSetRef, Region, ShadowStore, TaintData};

#[cfg(feature = "memory")]
pub use infrastructure::{MemoryShadow, ShadowLayout};
