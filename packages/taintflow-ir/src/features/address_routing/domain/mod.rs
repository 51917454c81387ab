//! CPU state layout and routing results

use serde::{Deserialize, Serialize};
use taintflow_shadow::Region;

use crate::config::{ConfigError, ConfigResult};

/// Byte range of a field inside the CPU state structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRange {
    pub offset: u64,
    pub len: u64,
}

impl FieldRange {
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.len)
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.offset <= offset && offset < self.end()
    }
}

/// Shape of the emulated CPU state as seen from host pointers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CpuStateLayout {
    /// Size of the CPU state structure in bytes
    pub state_size: u64,
    /// General register array
    pub regs: FieldRange,
    /// Native size of one general register
    pub reg_size: u64,
    /// Shadow bytes per general register
    pub labels_per_reg: u64,
    /// Fields tracked at all; everything is tracked when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_fields: Option<Vec<FieldRange>>,
}

impl CpuStateLayout {
    pub fn new(state_size: u64, regs: FieldRange, reg_size: u64, labels_per_reg: u64) -> Self {
        Self {
            state_size,
            regs,
            reg_size,
            labels_per_reg,
            relevant_fields: None,
        }
    }

    /// Builder: Restrict tracking to the given fields
    pub fn with_relevant_fields(mut self, fields: Vec<FieldRange>) -> Self {
        self.relevant_fields = Some(fields);
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.state_size == 0 {
            return Err(ConfigError::Validation(
                "cpu_layout.state_size must be positive".to_string(),
            ));
        }
        if self.reg_size == 0 || self.labels_per_reg == 0 {
            return Err(ConfigError::Validation(
                "cpu_layout.reg_size and cpu_layout.labels_per_reg must be positive".to_string(),
            ));
        }
        let fields = std::iter::once(&self.regs).chain(self.relevant_fields.iter().flatten());
        for field in fields {
            if field.end() > self.state_size {
                return Err(ConfigError::Validation(format!(
                    "cpu_layout field {:#x}+{:#x} exceeds state size {:#x}",
                    field.offset, field.len, self.state_size
                )));
            }
        }
        Ok(())
    }

    /// Whether an offset is tracked at all
    pub fn is_relevant(&self, offset: i64) -> bool {
        let Ok(offset) = u64::try_from(offset) else {
            return false;
        };
        if offset >= self.state_size {
            return false;
        }
        match &self.relevant_fields {
            Some(fields) => fields.iter().any(|f| f.contains(offset)),
            None => true,
        }
    }
}

/// Where a host address lands in shadow space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRoute {
    /// Guest RAM at the given address
    Ram(u64),
    /// CPU state field, mapped to a register or special-state shadow offset
    State { region: Region, offset: u64 },
    /// Not tracked
    Irrelevant,
}
