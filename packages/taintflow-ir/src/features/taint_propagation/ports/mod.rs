//! Outbound observer ports of the propagation engine
//!
//! Observers are registered on the engine and invoked synchronously from
//! inside the propagation call that triggers them. Closures work directly:
//!
//! ```rust,ignore
//! engine.set_load_observer(|reg, addr, size| println!("{reg} <- {addr:#x}+{size}"));
//! ```

use taintflow_shadow::LabelSetRef;

use super::domain::ShadowAddr;

/// Memory access through a pointer, reported before propagation
#[derive(Debug, Clone, PartialEq)]
pub struct PointerAccess {
    pub dst: ShadowAddr,
    /// `None` when the source lies outside its region
    pub src: Option<ShadowAddr>,
    pub ptr: ShadowAddr,
    pub ptr_size: u64,
    pub size: u64,
    pub is_store: bool,
    /// Union of the pointer bytes' labels
    pub pointer_labels: Option<LabelSetRef>,
}

impl PointerAccess {
    pub fn pointer_tainted(&self) -> bool {
        self.pointer_labels.is_some()
    }
}

/// Receives every pointer dereference when pointer checking is on
pub trait PointerObserver {
    fn on_pointer_access(&mut self, access: &PointerAccess);
}

impl<F> PointerObserver for F
where
    F: FnMut(&PointerAccess),
{
    fn on_pointer_access(&mut self, access: &PointerAccess) {
        self(access)
    }
}

/// Notified after the taint transfer of a load or store
pub trait LoadObserver {
    fn after_load(&mut self, reg: u64, addr: u64, size: u64);
}

impl<F> LoadObserver for F
where
    F: FnMut(u64, u64, u64),
{
    fn after_load(&mut self, reg: u64, addr: u64, size: u64) {
        self(reg, addr, size)
    }
}
