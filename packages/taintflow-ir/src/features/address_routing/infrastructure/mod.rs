mod host_ops;
mod router;

pub use router::AddressRouter;
