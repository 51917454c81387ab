// Address-space routing for host loads and stores
//
// Hexagonal Architecture:
// - domain: CPU state layout and routing results
// - infrastructure: the router and the engine's host_* operations
// - ports: guest RAM resolution

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{CpuStateLayout, FieldRange, HostRoute};
pub use infrastructure::AddressRouter;
pub use ports::{HostRamWindow, NoRam, RamResolver};
