//! Configuration I/O (YAML loading)
//!
//! Schema v1:
//!
//! ```yaml
//! version: 1
//! preset: precise
//! overrides:
//!   unreliable_warning_limit: 50
//! cpu_layout:
//!   state_size: 4096
//!   regs: { offset: 0, len: 128 }
//!   reg_size: 8
//!   labels_per_reg: 8
//! shadow:
//!   temporaries: 4096
//!   registers: 128
//!   special_state: 4096
//!   ram: 1048576
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use taintflow_shadow::ShadowLayout;
use tracing::debug;

use super::engine_config::{EngineConfig, EngineConfigPatch};
use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use crate::features::address_routing::CpuStateLayout;

const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<EngineConfigPatch>,

    /// CPU state layout for the address router
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_layout: Option<CpuStateLayout>,

    /// Region sizes for the in-memory shadow store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShadowLayout>,
}

fn default_preset() -> String {
    Preset::default().as_str().to_string()
}

/// Validated result of loading a configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub preset: Preset,
    pub engine: EngineConfig,
    pub cpu_layout: Option<CpuStateLayout>,
    pub shadow: Option<ShadowLayout>,
}

impl EngineSettings {
    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!("Loading engine configuration from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;

        // Version check
        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&file.preset)
            .map_err(|_| ConfigError::UnknownPreset(file.preset.clone()))?;

        let mut engine = EngineConfig::from_preset(preset);
        if let Some(overrides) = &file.overrides {
            engine = engine.apply_patch(overrides);
        }
        engine.validate()?;

        if let Some(layout) = &file.cpu_layout {
            layout.validate()?;
        }
        if let Some(shadow) = &file.shadow {
            shadow
                .validate()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }

        Ok(Self {
            preset,
            engine,
            cpu_layout: file.cpu_layout,
            shadow: file.shadow,
        })
    }

    /// Serialize back to schema v1
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let base = EngineConfig::from_preset(self.preset);
        let file = ConfigFileV1 {
            version: Some(1),
            preset: self.preset.as_str().to_string(),
            overrides: diff_patch(&base, &self.engine),
            cpu_layout: self.cpu_layout.clone(),
            shadow: self.shadow,
        };
        Ok(serde_yaml::to_string(&file)?)
    }
}

/// Patch holding only the fields where `target` differs from `base`
fn diff_patch(base: &EngineConfig, target: &EngineConfig) -> Option<EngineConfigPatch> {
    fn changed<T: PartialEq + Copy>(a: T, b: T) -> Option<T> {
        (a != b).then_some(b)
    }
    let patch = EngineConfigPatch {
        tainted_pointer: changed(base.tainted_pointer, target.tainted_pointer),
        pointer_check: changed(base.pointer_check, target.pointer_check),
        detaint_cb0_bytes: changed(base.detaint_cb0_bytes, target.detaint_cb0_bytes),
        unreliable_warning_limit: changed(
            base.unreliable_warning_limit,
            target.unreliable_warning_limit,
        ),
        max_constraint_depth: changed(base.max_constraint_depth, target.max_constraint_depth),
        frame_size: changed(base.frame_size, target.frame_size),
    };
    (patch != EngineConfigPatch::default()).then_some(patch)
}
