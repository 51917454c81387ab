//! Control-mask update after a copy or mix
//!
//! Masks are only recomputed for tainted sources: some transfer rules put
//! constants into the literal masks (SHL fills the low zero bits), which on
//! untainted data would read as a spurious change.

use taintflow_shadow::ShadowStore;
use tracing::trace;

use crate::errors::TaintResult;
use crate::features::taint_propagation::domain::{
    compile_masks, transfer, write_masks, ShadowAddr, Transfer,
};
use crate::shared::models::Instruction;

use super::diagnostics::Unreliable;
use super::engine::TaintEngine;

impl<S: ShadowStore> TaintEngine<S> {
    /// Recompute `dst` masks from `src` through the transfer rule of `inst`
    pub fn update_masks(
        &mut self,
        dst: ShadowAddr,
        src: ShadowAddr,
        size: u64,
        inst: &Instruction,
    ) -> TaintResult<()> {
        if self.store.any_tainted(src.region, src.offset, size) {
            let before = compile_masks(&self.store, src.region, src.offset, size)?;
            let opcode = inst.opcode();
            let literal = inst.literals().last();
            // size <= 16 here, compile_masks checked it
            let width = (size * 8) as u32;

            let outcome = transfer(opcode, before, literal, width);
            match outcome {
                Transfer::Exact(_) => {}
                Transfer::MissingLiteral(_) => {
                    self.warnings.report(Unreliable::MissingLiteral(opcode))
                }
                Transfer::Unknown => self.warnings.report(Unreliable::UnknownOpcode(opcode)),
            }
            let after = outcome.masks();

            trace!(
                "update_cb: {}+{:#x} {} CB ({:#x}) -> ({:#x}), 0 ({:#x}) -> ({:#x}), 1 ({:#x}) -> ({:#x})",
                dst,
                size,
                opcode,
                before.cb,
                after.cb,
                before.zero,
                after.zero,
                before.one,
                after.one
            );
            write_masks(&mut self.store, dst.region, dst.offset, size, after)?;
        }

        // Only labelled bytes are deleted; residue masks on clean bytes stay
        self.detaint_if_enabled(dst, size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::shared::models::{BinaryOp, CastOp, InstKind, Operand, ValueType};
    use pretty_assertions::assert_eq;
    use taintflow_shadow::{Label, MemoryShadow, Region, ShadowLayout, TaintData};

    fn engine(config: EngineConfig) -> TaintEngine<MemoryShadow> {
        TaintEngine::new(MemoryShadow::new(ShadowLayout::default()).unwrap(), config).unwrap()
    }

    fn and_lit(lit: u128) -> Instruction {
        Instruction::binary(
            BinaryOp::And,
            Operand::Inst(crate::shared::models::InstId(0)),
            Operand::const_int(lit, 32),
            ValueType::Int(32),
        )
    }

    #[test]
    fn test_copy_with_and_literal() {
        let mut e = engine(EngineConfig::default());
        e.store_mut()
            .apply_label_range(Region::Temporaries, 0, 4, Label(1))
            .unwrap();
        e.copy(ShadowAddr::llv(8), ShadowAddr::llv(0), 4, Some(&and_lit(0xff)))
            .unwrap();
        let b0 = e.store().query_full(Region::Temporaries, 8);
        let b1 = e.store().query_full(Region::Temporaries, 9);
        assert_eq!((b0.cb_mask, b0.zero_mask), (0xff, 0x00));
        assert_eq!((b1.cb_mask, b1.zero_mask), (0x00, 0xff));
    }

    #[test]
    fn test_detaint_after_and() {
        let mut e = engine(EngineConfig::default().detaint_cb0_bytes(true));
        e.store_mut()
            .apply_label_range(Region::Temporaries, 0, 4, Label(1))
            .unwrap();
        e.copy(ShadowAddr::llv(8), ShadowAddr::llv(0), 4, Some(&and_lit(0xff)))
            .unwrap();
        assert!(e.store().query(Region::Temporaries, 8).is_some());
        for i in 9..12 {
            assert!(e.store().query(Region::Temporaries, i).is_none());
        }
    }

    #[test]
    fn test_untainted_source_leaves_masks() {
        let mut e = engine(EngineConfig::default());
        let mut residue = TaintData::default();
        residue.one_mask = 0x5a;
        e.store_mut().set_full(Region::Temporaries, 8, residue.clone());
        e.update_masks(ShadowAddr::llv(8), ShadowAddr::llv(0), 1, &and_lit(0))
            .unwrap();
        assert_eq!(e.store().query_full(Region::Temporaries, 8), residue);
    }

    #[test]
    fn test_missing_literal_is_counted() {
        let mut e = engine(EngineConfig::default().unreliable_warning_limit(1));
        e.store_mut()
            .apply_label_range(Region::Temporaries, 0, 2, Label(1))
            .unwrap();
        let shl = Instruction::binary(BinaryOp::Shl, Operand::Undef, Operand::Undef, ValueType::Int(16));
        for _ in 0..3 {
            e.copy(ShadowAddr::llv(8), ShadowAddr::llv(0), 2, Some(&shl))
                .unwrap();
        }
        assert_eq!(e.warnings().seen(), 3);
        assert_eq!(e.warnings().emitted(), 1);
        // masks passed through
        assert_eq!(e.store().query_full(Region::Temporaries, 9).cb_mask, 0xff);
    }

    #[test]
    fn test_unknown_opcode_clears_masks() {
        let mut e = engine(EngineConfig::default());
        e.store_mut()
            .apply_label(Region::Temporaries, 0, Label(1))
            .unwrap();
        let freeze = Instruction::new(InstKind::Other("freeze".into()), vec![], ValueType::Int(8));
        e.copy(ShadowAddr::llv(8), ShadowAddr::llv(0), 1, Some(&freeze))
            .unwrap();
        assert_eq!(e.store().query_full(Region::Temporaries, 8).cb_mask, 0);
        assert_eq!(e.warnings().seen(), 1);
    }

    #[test]
    fn test_trunc_keeps_low_masks() {
        let mut e = engine(EngineConfig::default());
        e.store_mut()
            .apply_label_range(Region::Temporaries, 0, 4, Label(1))
            .unwrap();
        let trunc = Instruction::cast(CastOp::Trunc, Operand::Undef, ValueType::Int(8));
        e.copy(ShadowAddr::llv(8), ShadowAddr::llv(0), 1, Some(&trunc))
            .unwrap();
        assert_eq!(e.store().query_full(Region::Temporaries, 8).cb_mask, 0xff);
        assert_eq!(e.warnings().seen(), 0);
    }
}
