//! Engine configuration
//!
//! Two tiers:
//! - Level 1: Preset - one-liner (`EngineConfig::from_preset(Preset::Precise)`)
//! - Level 2: YAML v1 file with optional field overrides and CPU layout
//!
//! # Examples
//!
//! ```rust,ignore
//! use taintflow_ir::config::{EngineConfig, EngineSettings, Preset};
//!
//! let config = EngineConfig::from_preset(Preset::Balanced).detaint_cb0_bytes(true);
//! config.validate()?;
//!
//! let settings = EngineSettings::from_yaml("taint.yaml")?;
//! ```

pub mod engine_config;
pub mod error;
pub mod io;
pub mod preset;

// Re-exports
pub use engine_config::{EngineConfig, EngineConfigPatch};
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigFileV1, EngineSettings};
pub use preset::Preset;
