//! Common test utilities for taintflow-ir
//!
//! Engine construction over a small in-memory shadow, label helpers and a
//! reference CPU state layout shared by the integration tests.

#![allow(dead_code)]

use taintflow_ir::config::EngineConfig;
use taintflow_ir::features::address_routing::{CpuStateLayout, FieldRange};
use taintflow_ir::{ShadowAddr, TaintEngine};
use taintflow_shadow::{Label, MemoryShadow, Region, ShadowLayout, ShadowStore};

/// Host address of the CPU state in routing tests
pub const ENV: u64 = 0x7f00_0000;

pub fn small_layout() -> ShadowLayout {
    ShadowLayout {
        temporaries: 256,
        registers: 128,
        special_state: 256,
        ram: 4096,
    }
}

pub fn engine(config: EngineConfig) -> TaintEngine<MemoryShadow> {
    let store = MemoryShadow::new(small_layout()).expect("valid layout");
    TaintEngine::new(store, config).expect("valid config")
}

pub fn default_engine() -> TaintEngine<MemoryShadow> {
    engine(EngineConfig::default())
}

/// Label `size` bytes at `at` with `label`
pub fn taint(e: &mut TaintEngine<MemoryShadow>, at: ShadowAddr, size: u64, label: u32) {
    e.store_mut()
        .apply_label_range(at.region, at.offset, size, Label(label))
        .expect("label in range");
}

/// Label numbers of one byte, ascending
pub fn labels(e: &TaintEngine<MemoryShadow>, at: ShadowAddr) -> Vec<u32> {
    e.store()
        .labels_at(at.region, at.offset)
        .into_iter()
        .map(|l| l.0)
        .collect()
}

pub fn is_tainted(e: &TaintEngine<MemoryShadow>, at: ShadowAddr) -> bool {
    e.store().query(at.region, at.offset).is_some()
}

/// Overwrite the masks of one byte, keeping its labels
pub fn set_masks(e: &mut TaintEngine<MemoryShadow>, at: ShadowAddr, cb: u8, one: u8, zero: u8) {
    let mut td = e.store().query_full(at.region, at.offset);
    td.cb_mask = cb;
    td.one_mask = one;
    td.zero_mask = zero;
    e.store_mut().set_full(at.region, at.offset, td);
}

/// x86-like state: 8 registers of 4 bytes at 0x40, shadowed at 4 labels each,
/// 0x400 bytes of state in total
pub fn x86_layout() -> CpuStateLayout {
    CpuStateLayout::new(0x400, FieldRange::new(0x40, 0x20), 4, 4)
}

pub fn region_bytes(e: &TaintEngine<MemoryShadow>, region: Region) -> usize {
    e.store().tainted_bytes(region)
}
