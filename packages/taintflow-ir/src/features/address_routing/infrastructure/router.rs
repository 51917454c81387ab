/*
 * Host address router
 *
 * Translated code reads and writes CPU state and guest RAM through host
 * pointers. The router decides which shadow region such a pointer belongs to:
 *
 *   1. host pointer into guest RAM          -> Ram(guest address)
 *   2. offset from env outside the state    -> Irrelevant
 *      (or outside every relevant field)
 *   3. offset inside the register array     -> Registers, rescaled to the
 *                                              shadow register stride
 *   4. any other state offset               -> SpecialState, same offset
 */

use taintflow_shadow::Region;
use tracing::debug;

use crate::features::address_routing::domain::{CpuStateLayout, HostRoute};
use crate::features::address_routing::ports::{NoRam, RamResolver};

/// Classifies host addresses against one CPU state layout
#[derive(Debug, Clone)]
pub struct AddressRouter<R = NoRam> {
    layout: CpuStateLayout,
    ram: R,
}

impl AddressRouter<NoRam> {
    /// Router that never resolves RAM pointers
    pub fn state_only(layout: CpuStateLayout) -> Self {
        Self { layout, ram: NoRam }
    }
}

impl<R: RamResolver> AddressRouter<R> {
    pub fn new(layout: CpuStateLayout, ram: R) -> Self {
        Self { layout, ram }
    }

    pub fn layout(&self) -> &CpuStateLayout {
        &self.layout
    }

    /// Route a host address relative to the CPU state base `env_ptr`
    pub fn classify(&self, env_ptr: u64, addr: u64) -> HostRoute {
        if let Some(ram_addr) = self.ram.ram_addr(addr) {
            return HostRoute::Ram(ram_addr);
        }
        self.classify_state_offset(addr.wrapping_sub(env_ptr) as i64)
    }

    /// Route an offset into the CPU state, RAM not considered
    pub fn classify_state_offset(&self, offset: i64) -> HostRoute {
        if !self.layout.is_relevant(offset) {
            return HostRoute::Irrelevant;
        }
        // is_relevant rejects negative offsets
        let offset = offset as u64;
        let regs = &self.layout.regs;
        if regs.contains(offset) {
            match (offset - regs.offset).checked_mul(self.layout.labels_per_reg) {
                Some(scaled) => HostRoute::State {
                    region: Region::Registers,
                    offset: scaled / self.layout.reg_size,
                },
                None => {
                    debug!("register offset {:#x} overflows when rescaled", offset);
                    HostRoute::Irrelevant
                }
            }
        } else {
            HostRoute::State {
                region: Region::SpecialState,
                offset,
            }
        }
    }

    /// Route a state offset, logging the decision
    pub(crate) fn route_state(&self, op: &str, env_ptr: u64, addr: u64) -> Option<(Region, u64)> {
        match self.classify_state_offset(addr.wrapping_sub(env_ptr) as i64) {
            HostRoute::State { region, offset } => Some((region, offset)),
            _ => {
                debug!("{}: irrelevant host address {:#x}", op, addr);
                None
            }
        }
    }
}
