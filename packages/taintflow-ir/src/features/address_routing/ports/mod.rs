//! Host RAM resolution port

/// Maps a host pointer to a guest RAM address
pub trait RamResolver {
    fn ram_addr(&self, host_ptr: u64) -> Option<u64>;
}

/// Resolver for setups without host-mapped RAM
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRam;

impl RamResolver for NoRam {
    fn ram_addr(&self, _host_ptr: u64) -> Option<u64> {
        None
    }
}

/// One contiguous host mapping of guest RAM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRamWindow {
    pub host_base: u64,
    pub len: u64,
    pub guest_base: u64,
}

impl RamResolver for HostRamWindow {
    fn ram_addr(&self, host_ptr: u64) -> Option<u64> {
        let delta = host_ptr.checked_sub(self.host_base)?;
        (delta < self.len).then(|| self.guest_base + delta)
    }
}

impl<F> RamResolver for F
where
    F: Fn(u64) -> Option<u64>,
{
    fn ram_addr(&self, host_ptr: u64) -> Option<u64> {
        self(host_ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window() {
        let w = HostRamWindow {
            host_base: 0x7000_0000,
            len: 0x1000,
            guest_base: 0,
        };
        assert_eq!(w.ram_addr(0x7000_0010), Some(0x10));
        assert_eq!(w.ram_addr(0x7000_1000), None);
        assert_eq!(w.ram_addr(0x10), None);
        assert_eq!(NoRam.ram_addr(0x7000_0010), None);
    }
}
