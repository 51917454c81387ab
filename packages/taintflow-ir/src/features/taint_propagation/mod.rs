// Taint propagation over the shadow store
//
// Hexagonal Architecture:
// - domain: shadow addresses, control masks and their transfer rules
// - infrastructure: the engine executing one operation per translated instruction
// - ports: observers notified from inside propagation

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{CbMasks, SelectChoice, SelectSource, ShadowAddr, Transfer};
pub use infrastructure::{TaintEngine, Unreliable, UnreliableWarnings};
pub use ports::{LoadObserver, PointerAccess, PointerObserver};
