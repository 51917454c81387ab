//! Decoding of guest memory access helper names
//!
//! Translated code reaches guest memory through calls such as
//! `helper_le_ldul_mmu_panda` or `helper_ret_stb_mmu_panda`. The name encodes
//! endianness, direction, access width and signedness.

use std::fmt;

const PREFIX: &str = "helper_";
const SUFFIX: &str = "_panda";

/// Decoded memory helper, `None` fields did not match any known token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryHelper {
    /// 0 = target default (`ret`), 1 = little, 2 = big
    pub endian: Option<u8>,
    pub is_store: bool,
    /// (size in bytes, signed)
    pub access: Option<(u8, bool)>,
}

const ACCESS_TOKENS: [(&str, u8, bool); 7] = [
    ("q_mmu", 8, false),
    ("ul_mmu", 4, false),
    ("sl_mmu", 4, true),
    ("uw_mmu", 2, false),
    ("sw_mmu", 2, true),
    ("ub_mmu", 1, false),
    ("sb_mmu", 1, true),
];

impl MemoryHelper {
    /// Decode a callee name; `None` when it is not a memory helper
    pub fn parse(callee: &str) -> Option<Self> {
        if !callee.starts_with(PREFIX) || !callee.ends_with(SUFFIX) {
            return None;
        }
        let endian = if callee.contains("helper_ret") {
            Some(0)
        } else if callee.contains("helper_le") {
            Some(1)
        } else if callee.contains("helper_be") {
            Some(2)
        } else {
            None
        };
        let access = ACCESS_TOKENS
            .iter()
            .find(|(token, _, _)| callee.contains(token))
            .map(|(_, size, signed)| (*size, *signed));
        Some(Self {
            endian,
            is_store: !callee.contains("_ld"),
            access,
        })
    }
}

/// Renders the leading `endian,is_store,size,is_signed,` fields
impl fmt::Display for MemoryHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.endian {
            Some(e) => write!(f, "{},", e)?,
            None => write!(f, "ERROR,")?,
        }
        write!(f, "{},", u8::from(self.is_store))?;
        match self.access {
            Some((size, signed)) => write!(f, "{},{},", size, u8::from(signed)),
            None => write!(f, "ERROR,"),
        }
    }
}
