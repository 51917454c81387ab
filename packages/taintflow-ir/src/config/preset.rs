//! Preset configurations
//!
//! Presets provide complete engine defaults for common use cases.

use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Plain propagation
    ///
    /// - Tainted pointers ignored (loads/stores copy data taint only)
    /// - No detainting
    Fast,

    /// Default propagation
    ///
    /// - Tainted pointers propagate into loaded/stored bytes
    /// - No detainting
    Balanced,

    /// Fewer false positives
    ///
    /// - Tainted pointers propagate and are reported to the pointer observer
    /// - Bytes whose control mask drops to 0 are detainted
    Precise,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "precise" => Ok(Self::Precise),
            _ => Err(format!(
                "Unknown preset '{}'. Valid presets: fast, balanced, precise",
                s
            )),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Precise => "precise",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
