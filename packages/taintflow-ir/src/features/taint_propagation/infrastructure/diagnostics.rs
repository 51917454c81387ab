//! Rate-limited warnings for unreliable mask derivations

use tracing::warn;

use crate::shared::models::Opcode;

/// Why a mask update could not be derived exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unreliable {
    /// Opcode needs a literal operand and has none
    MissingLiteral(Opcode),
    /// Opcode without a transfer rule
    UnknownOpcode(Opcode),
}

/// Emits at most `limit` warnings, then one suppression notice
#[derive(Debug, Clone)]
pub struct UnreliableWarnings {
    limit: u32,
    emitted: u32,
    seen: u64,
}

impl UnreliableWarnings {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            emitted: 0,
            seen: 0,
        }
    }

    pub fn report(&mut self, what: Unreliable) {
        self.seen += 1;
        if self.emitted >= self.limit {
            return;
        }
        match what {
            Unreliable::MissingLiteral(op) => warn!(
                opcode = %op,
                "Could not find last literal value, control bits may be incorrect"
            ),
            Unreliable::UnknownOpcode(op) => warn!(
                opcode = %op,
                "No control-bit rule for opcode, masks cleared"
            ),
        }
        self.emitted += 1;
        if self.emitted == self.limit {
            warn!(
                "Unreliable control-bit warning emitted {} times, suppressing",
                self.emitted
            );
        }
    }

    /// Warnings actually logged
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Unreliable derivations seen, logged or not
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_at_limit() {
        let mut w = UnreliableWarnings::new(3);
        for _ in 0..10 {
            w.report(Unreliable::MissingLiteral(Opcode::Load));
        }
        assert_eq!(w.emitted(), 3);
        assert_eq!(w.seen(), 10);
    }

    #[test]
    fn test_zero_limit_is_silent() {
        let mut w = UnreliableWarnings::new(0);
        w.report(Unreliable::UnknownOpcode(Opcode::Unknown));
        assert_eq!(w.emitted(), 0);
        assert_eq!(w.seen(), 1);
    }
}
