//! Propagation engine configuration
//!
//! Process-wide switches of the propagation core. Set once when the engine is
//! built and read-only afterwards.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;

/// Propagation engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Pointer taint flows into loaded/stored bytes
    #[serde(default = "default_true")]
    pub tainted_pointer: bool,

    /// Report every pointer dereference to the pointer observer
    #[serde(default)]
    pub pointer_check: bool,

    /// Drop labels from bytes whose control mask reaches 0
    #[serde(default)]
    pub detaint_cb0_bytes: bool,

    /// Unreliable-derivation warnings before suppression (0..=10000)
    #[serde(default = "default_warning_limit")]
    pub unreliable_warning_limit: u32,

    /// Recursion bound of the branch constraint extractor (1..=4096)
    #[serde(default = "default_constraint_depth")]
    pub max_constraint_depth: usize,

    /// Bytes reserved per temporaries frame (1..=16 MiB)
    #[serde(default = "default_frame_size")]
    pub frame_size: u64,
}

fn default_true() -> bool {
    true
}
fn default_warning_limit() -> u32 {
    10
}
fn default_constraint_depth() -> usize {
    256
}
fn default_frame_size() -> u64 {
    // max register size (bytes) * max values per frame
    64 * 64
}

const MAX_FRAME_SIZE: u64 = 1 << 24;

impl EngineConfig {
    /// Defaults for a preset
    pub fn from_preset(preset: Preset) -> Self {
        let base = Self {
            tainted_pointer: true,
            pointer_check: false,
            detaint_cb0_bytes: false,
            unreliable_warning_limit: default_warning_limit(),
            max_constraint_depth: default_constraint_depth(),
            frame_size: default_frame_size(),
        };
        match preset {
            Preset::Fast => Self {
                tainted_pointer: false,
                ..base
            },
            Preset::Balanced => base,
            Preset::Precise => Self {
                pointer_check: true,
                detaint_cb0_bytes: true,
                ..base
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.unreliable_warning_limit > 10_000 {
            return Err(ConfigError::range_with_hint(
                "unreliable_warning_limit",
                self.unreliable_warning_limit,
                0,
                10_000,
                "Warnings past the limit are suppressed anyway",
            ));
        }

        if self.max_constraint_depth == 0 || self.max_constraint_depth > 4096 {
            return Err(ConfigError::range_with_hint(
                "max_constraint_depth",
                self.max_constraint_depth,
                1,
                4096,
                "Constraint extraction needs at least one level",
            ));
        }

        if self.frame_size == 0 || self.frame_size > MAX_FRAME_SIZE {
            return Err(ConfigError::range_with_hint(
                "frame_size",
                self.frame_size,
                1,
                MAX_FRAME_SIZE,
                "A frame must hold at least one byte",
            ));
        }

        if self.pointer_check && !self.tainted_pointer {
            return Err(ConfigError::Validation(
                "pointer_check requires tainted_pointer to be enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder: Set tainted_pointer
    pub fn tainted_pointer(mut self, v: bool) -> Self {
        self.tainted_pointer = v;
        self
    }

    /// Builder: Set pointer_check
    pub fn pointer_check(mut self, v: bool) -> Self {
        self.pointer_check = v;
        self
    }

    /// Builder: Set detaint_cb0_bytes
    pub fn detaint_cb0_bytes(mut self, v: bool) -> Self {
        self.detaint_cb0_bytes = v;
        self
    }

    /// Builder: Set unreliable_warning_limit
    pub fn unreliable_warning_limit(mut self, v: u32) -> Self {
        self.unreliable_warning_limit = v;
        self
    }

    /// Builder: Set max_constraint_depth
    pub fn max_constraint_depth(mut self, v: usize) -> Self {
        self.max_constraint_depth = v;
        self
    }

    /// Builder: Set frame_size
    pub fn frame_size(mut self, v: u64) -> Self {
        self.frame_size = v;
        self
    }

    /// Overlay the fields a patch sets
    pub fn apply_patch(mut self, patch: &EngineConfigPatch) -> Self {
        if let Some(v) = patch.tainted_pointer {
            self.tainted_pointer = v;
        }
        if let Some(v) = patch.pointer_check {
            self.pointer_check = v;
        }
        if let Some(v) = patch.detaint_cb0_bytes {
            self.detaint_cb0_bytes = v;
        }
        if let Some(v) = patch.unreliable_warning_limit {
            self.unreliable_warning_limit = v;
        }
        if let Some(v) = patch.max_constraint_depth {
            self.max_constraint_depth = v;
        }
        if let Some(v) = patch.frame_size {
            self.frame_size = v;
        }
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

/// Patch type for EngineConfig (all fields optional)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigPatch {
    pub tainted_pointer: Option<bool>,
    pub pointer_check: Option<bool>,
    pub detaint_cb0_bytes: Option<bool>,
    pub unreliable_warning_limit: Option<u32>,
    pub max_constraint_depth: Option<usize>,
    pub frame_size: Option<u64>,
}
