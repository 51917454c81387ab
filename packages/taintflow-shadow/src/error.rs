//! Error types for taintflow-shadow

use std::fmt;
use thiserror::Error;

/// Shadow error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Address range outside a region
    OutOfRange,
    /// Region sizes that cannot back a shadow store
    InvalidLayout,
    /// Serialization/deserialization errors
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::OutOfRange => "out_of_range",
            ErrorKind::InvalidLayout => "invalid_layout",
            ErrorKind::Serialization => "serialization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shadow error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct ShadowError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ShadowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn out_of_range(region: impl fmt::Display, addr: u64, size: u64) -> Self {
        Self::new(
            ErrorKind::OutOfRange,
            format!("{}[{:#x}+{:#x}] is outside the region", region, addr, size),
        )
    }

    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidLayout, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }
}

impl From<serde_json::Error> for ShadowError {
    fn from(err: serde_json::Error) -> Self {
        ShadowError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ShadowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = ShadowError::invalid_layout("ram size is zero");
        assert_eq!(format!("{}", err), "[invalid_layout] ram size is zero");
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ShadowError::out_of_range("ram", 0x1000, 4);
        assert_eq!(err.kind, ErrorKind::OutOfRange);
        assert!(err.message.contains("ram[0x1000+0x4]"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .err()
            .unwrap();
        let err: ShadowError = json_err.into();

        assert_eq!(err.kind, ErrorKind::Serialization);
        assert!(err.message.contains("JSON error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::OutOfRange.as_str(), "out_of_range");
        assert_eq!(ErrorKind::InvalidLayout.as_str(), "invalid_layout");
        assert_eq!(ErrorKind::Serialization.as_str(), "serialization");
    }
}
