// Branch constraint extraction
//
// At a conditional branch whose comparison reads tainted data, rebuild the
// comparison symbolically and hand the rendered string to ConstraintSinks.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{MemoryHelper, SymbolicExpr};
pub use infrastructure::ConstraintExtractor;
pub use ports::ConstraintSink;
