//! Engine operations on host addresses
//!
//! Loads and stores against the CPU state (or host-mapped RAM) move taint
//! between the temporaries and the routed region.

use taintflow_shadow::ShadowStore;
use tracing::trace;

use crate::errors::TaintResult;
use crate::features::address_routing::domain::HostRoute;
use crate::features::address_routing::ports::RamResolver;
use crate::features::taint_propagation::{ShadowAddr, TaintEngine};

use super::router::AddressRouter;

impl<S: ShadowStore> TaintEngine<S> {
    /// Load (`is_store == false`) or store between a host address and a temporaries slot
    pub fn host_copy<R: RamResolver>(
        &mut self,
        router: &AddressRouter<R>,
        env_ptr: u64,
        addr: u64,
        tmp_offset: u64,
        size: u64,
        is_store: bool,
    ) -> TaintResult<()> {
        let routed = match router.classify(env_ptr, addr) {
            HostRoute::Ram(ram_addr) => ShadowAddr::ram(ram_addr),
            HostRoute::State { region, offset } => ShadowAddr::new(region, offset),
            HostRoute::Irrelevant => {
                trace!("hostcopy: irrelevant {:#x}", addr);
                return Ok(());
            }
        };
        let tmp = ShadowAddr::llv(tmp_offset);
        let (dst, src) = if is_store { (routed, tmp) } else { (tmp, routed) };
        trace!("hostcopy: {}+{:#x} <- {}", dst, size, src);
        self.copy(dst, src, size, None)
    }

    /// Copy between two CPU state locations
    pub fn host_memcpy<R: RamResolver>(
        &mut self,
        router: &AddressRouter<R>,
        env_ptr: u64,
        dst: u64,
        src: u64,
        size: u64,
    ) -> TaintResult<()> {
        let (Some(to), Some(from)) = (
            router.route_state("hostmemcpy", env_ptr, dst),
            router.route_state("hostmemcpy", env_ptr, src),
        ) else {
            return Ok(());
        };
        let dst = ShadowAddr::new(to.0, to.1);
        let src = ShadowAddr::new(from.0, from.1);
        trace!("hostmemcpy: {}+{:#x} <- {}", dst, size, src);
        self.copy(dst, src, size, None)
    }

    /// Clear a CPU state location
    pub fn host_delete<R: RamResolver>(
        &mut self,
        router: &AddressRouter<R>,
        env_ptr: u64,
        addr: u64,
        size: u64,
    ) -> TaintResult<()> {
        let Some((region, offset)) = router.route_state("hostdel", env_ptr, addr) else {
            return Ok(());
        };
        trace!("hostdel: {}[{:#x}+{:#x}]", region, offset, size);
        self.delete(ShadowAddr::new(region, offset), size)
    }
}
