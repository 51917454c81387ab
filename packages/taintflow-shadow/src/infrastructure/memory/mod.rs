//! In-memory shadow store
//!
//! Sparse per-region maps: only bytes that ever held a non-empty record take
//! space. The temporaries region is a stack of frames; addresses in that
//! region are relative to the active frame base.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{Label, LabelSet, LabelSetRef, Region, ShadowStore, TaintData};
use crate::error::{Result, ShadowError};
use std::sync::Arc;

/// Region sizes in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShadowLayout {
    /// Bytes visible in one temporaries frame
    pub temporaries: u64,
    /// General register file
    pub registers: u64,
    /// Special CPU state
    pub special_state: u64,
    /// Guest RAM
    pub ram: u64,
}

impl ShadowLayout {
    pub fn size_of(&self, region: Region) -> u64 {
        match region {
            Region::Temporaries => self.temporaries,
            Region::Registers => self.registers,
            Region::SpecialState => self.special_state,
            Region::Ram => self.ram,
        }
    }

    /// Every region must be addressable
    pub fn validate(&self) -> Result<()> {
        for region in Region::ALL {
            if self.size_of(region) == 0 {
                return Err(ShadowError::invalid_layout(format!(
                    "region '{}' has size 0",
                    region
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON layout description
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: ShadowLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }
}

impl Default for ShadowLayout {
    fn default() -> Self {
        Self {
            temporaries: 64 * 64,
            registers: 16 * 8,
            special_state: 4096,
            ram: 1 << 20,
        }
    }
}

/// Sparse in-memory [`ShadowStore`]
#[derive(Debug, Clone)]
pub struct MemoryShadow {
    layout: ShadowLayout,
    regions: [FxHashMap<u64, TaintData>; 4],
    frame_base: u64,
    // base of the first frame pushed above frame zero
    inner_base: u64,
}

fn slot(region: Region) -> usize {
    match region {
        Region::Temporaries => 0,
        Region::Registers => 1,
        Region::SpecialState => 2,
        Region::Ram => 3,
    }
}

impl MemoryShadow {
    pub fn new(layout: ShadowLayout) -> Result<Self> {
        layout.validate()?;
        debug!(
            "MemoryShadow: llv={} greg={} gspec={} ram={}",
            layout.temporaries, layout.registers, layout.special_state, layout.ram
        );
        Ok(Self {
            layout,
            regions: Default::default(),
            frame_base: 0,
            inner_base: 0,
        })
    }

    pub fn layout(&self) -> &ShadowLayout {
        &self.layout
    }

    /// Add `label` to one byte and mark it fully controlled
    pub fn apply_label(&mut self, region: Region, addr: u64, label: Label) -> Result<()> {
        if !self.contains(region, addr, 1) {
            return Err(ShadowError::out_of_range(region, addr, 1));
        }
        let current = self.query(region, addr);
        let fresh: LabelSetRef = Arc::new(LabelSet::singleton(label));
        let labels = LabelSet::union(current.as_ref(), Some(&fresh));
        let td = match labels {
            Some(ls) => TaintData::with_labels(ls),
            None => TaintData::labelled(label),
        };
        trace!("label: {}[{:#x}] <- {}", region, addr, label);
        self.set_full(region, addr, td);
        Ok(())
    }

    /// Label every byte of a range
    pub fn apply_label_range(
        &mut self,
        region: Region,
        addr: u64,
        size: u64,
        label: Label,
    ) -> Result<()> {
        for i in 0..size {
            let at = addr
                .checked_add(i)
                .ok_or_else(|| ShadowError::out_of_range(region, addr, size))?;
            self.apply_label(region, at, label)?;
        }
        Ok(())
    }

    /// Number of tainted bytes in a region's active window
    pub fn tainted_bytes(&self, region: Region) -> usize {
        let base = self.base(region);
        let end = base.saturating_add(self.layout.size_of(region));
        self.regions[slot(region)]
            .iter()
            .filter(|(addr, td)| **addr >= base && **addr < end && td.is_tainted())
            .count()
    }

    /// Distinct labels present anywhere in a region's active window
    pub fn label_count(&self, region: Region) -> usize {
        let base = self.base(region);
        let end = base.saturating_add(self.layout.size_of(region));
        self.regions[slot(region)]
            .iter()
            .filter(|(addr, _)| **addr >= base && **addr < end)
            .filter_map(|(_, td)| td.labels.as_ref())
            .flat_map(|ls| ls.iter())
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }

    /// Labels of one byte in ascending order
    pub fn labels_at(&self, region: Region, addr: u64) -> Vec<Label> {
        self.query(region, addr)
            .map(|ls| ls.iter().collect())
            .unwrap_or_default()
    }

    /// Current temporaries frame base
    pub fn frame_base(&self) -> u64 {
        self.frame_base
    }

    fn base(&self, region: Region) -> u64 {
        match region {
            Region::Temporaries => self.frame_base,
            _ => 0,
        }
    }

    fn absolute(&self, region: Region, addr: u64) -> Option<u64> {
        if addr >= self.layout.size_of(region) {
            return None;
        }
        self.base(region).checked_add(addr)
    }
}

impl ShadowStore for MemoryShadow {
    fn query(&self, region: Region, addr: u64) -> Option<LabelSetRef> {
        let abs = self.absolute(region, addr)?;
        self.regions[slot(region)]
            .get(&abs)
            .and_then(|td| td.labels.clone())
            .filter(|ls| !ls.is_empty())
    }

    fn query_full(&self, region: Region, addr: u64) -> TaintData {
        self.absolute(region, addr)
            .and_then(|abs| self.regions[slot(region)].get(&abs).cloned())
            .unwrap_or_default()
    }

    fn set_full(&mut self, region: Region, addr: u64, td: TaintData) {
        let Some(abs) = self.absolute(region, addr) else {
            return;
        };
        let map = &mut self.regions[slot(region)];
        if td == TaintData::default() {
            map.remove(&abs);
        } else {
            map.insert(abs, td);
        }
    }

    fn remove(&mut self, region: Region, addr: u64, size: u64) {
        for i in 0..size {
            let Some(abs) = addr.checked_add(i).and_then(|a| self.absolute(region, a)) else {
                break;
            };
            self.regions[slot(region)].remove(&abs);
        }
    }

    fn copy(&mut self, dst_region: Region, dst: u64, src_region: Region, src: u64, size: u64) {
        let snapshot: Vec<TaintData> = (0..size)
            .map(|i| self.query_full(src_region, src.wrapping_add(i)))
            .collect();
        for (i, td) in snapshot.into_iter().enumerate() {
            self.set_full(dst_region, dst.wrapping_add(i as u64), td);
        }
    }

    fn size(&self, region: Region) -> u64 {
        self.layout.size_of(region)
    }

    fn push_frame(&mut self, frame_size: u64) {
        if self.frame_base == 0 {
            self.inner_base = frame_size;
        }
        self.frame_base = self.frame_base.saturating_add(frame_size);
        trace!("push_frame: base={:#x}", self.frame_base);
    }

    fn pop_frame(&mut self, frame_size: u64) {
        if self.frame_base == 0 {
            trace!("pop_frame: already at outermost frame");
            return;
        }
        let abandoned = self.frame_base;
        self.frame_base = self.frame_base.saturating_sub(frame_size);
        let map = &mut self.regions[slot(Region::Temporaries)];
        map.retain(|addr, _| *addr < abandoned);
        trace!("pop_frame: base={:#x}", self.frame_base);
    }

    fn reset_frame(&mut self) {
        if self.frame_base != 0 {
            let inner = self.inner_base;
            self.regions[slot(Region::Temporaries)].retain(|addr, _| *addr < inner);
        }
        self.frame_base = 0;
        trace!("reset_frame");
    }
}
