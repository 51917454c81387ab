//! Error types for taintflow-ir
//!
//! Only invariant violations are errors: the caller modelled an operation
//! inconsistently with the instruction it describes. Out-of-range addresses
//! are not errors, they are dropped by the engine.

use taintflow_shadow::ShadowError;
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for taint propagation
#[derive(Debug, Error)]
pub enum TaintError {
    /// `select` reached the end of its choices without a match
    #[error("no select choice matches selector {selector:#x}")]
    SelectorNotFound { selector: u64 },

    /// Mask packing was asked for more bytes than a mask word holds
    #[error("control mask width exceeded: {size} bytes (max {max})")]
    MaskWidthExceeded { size: u64, max: u64 },

    /// Branch extraction invoked on a non-comparison instruction
    #[error("instruction '{0}' is not an integer comparison")]
    NotAComparison(String),

    /// Instruction id outside the translation unit
    #[error("unknown instruction id {0}")]
    UnknownInstruction(u32),

    /// Shadow store error
    #[error(transparent)]
    Shadow(#[from] ShadowError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TaintError {
    /// Whether the error aborts the current operation only
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            TaintError::SelectorNotFound { .. }
                | TaintError::MaskWidthExceeded { .. }
                | TaintError::NotAComparison(_)
                | TaintError::UnknownInstruction(_)
        )
    }
}

/// Result type alias for taint operations
pub type TaintResult<T> = std::result::Result<T, TaintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaintError::SelectorNotFound { selector: 3 };
        assert_eq!(err.to_string(), "no select choice matches selector 0x3");

        let err = TaintError::MaskWidthExceeded { size: 17, max: 16 };
        assert!(err.to_string().contains("17 bytes"));
    }

    #[test]
    fn test_invariant_classification() {
        assert!(TaintError::UnknownInstruction(4).is_invariant_violation());
        let err: TaintError = ConfigError::MissingVersion.into();
        assert!(!err.is_invariant_violation());
    }
}
