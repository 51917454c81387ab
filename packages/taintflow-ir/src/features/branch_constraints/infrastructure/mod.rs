mod branch_hook;
mod extractor;

pub use extractor::ConstraintExtractor;
