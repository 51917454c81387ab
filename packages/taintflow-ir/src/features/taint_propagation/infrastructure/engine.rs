//! Taint propagation engine
//!
//! One call per translated operation. Every operation names its operands as
//! region + offset + size; a range that does not fit in its region models an
//! untracked I/O address and turns the operation into a no-op.
//!
//! # Label rules
//!
//! - **copy**: byte-exact
//! - **parallel**: byte `i` of the result depends only on byte `i` of each input
//! - **mix**: every result byte depends on every input byte (one tcn step)
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut engine = TaintEngine::new(shadow, EngineConfig::default())?;
//! engine.copy(ShadowAddr::llv(0), ShadowAddr::ram(0x1000), 4, None)?;
//! engine.mix_compute(ShadowAddr::llv(8), 4, ShadowAddr::llv(0), ShadowAddr::llv(4), 4, Some(&add))?;
//! ```

use taintflow_shadow::{ShadowStore, TaintData};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::errors::{TaintError, TaintResult};
use crate::features::branch_constraints::ports::ConstraintSink;
use crate::shared::models::{BinaryOp, Instruction, Opcode};

use crate::features::taint_propagation::domain::{
    compile_masks, write_masks, CbMasks, SelectChoice, SelectSource, ShadowAddr,
};
use crate::features::taint_propagation::ports::{LoadObserver, PointerAccess, PointerObserver};
use super::diagnostics::UnreliableWarnings;

/// Byte-granular taint propagation over a [`ShadowStore`]
pub struct TaintEngine<S: ShadowStore> {
    pub(crate) store: S,
    pub(crate) config: EngineConfig,
    pub(crate) warnings: UnreliableWarnings,
    pointer_observer: Option<Box<dyn PointerObserver>>,
    load_observer: Option<Box<dyn LoadObserver>>,
    pub(crate) sinks: Vec<Box<dyn ConstraintSink>>,
}

impl<S: ShadowStore> std::fmt::Debug for TaintEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaintEngine")
            .field("config", &self.config)
            .field("warnings", &self.warnings)
            .field("pointer_observer", &self.pointer_observer.is_some())
            .field("load_observer", &self.load_observer.is_some())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl<S: ShadowStore> TaintEngine<S> {
    /// Create an engine over `store` with a validated configuration
    pub fn new(store: S, config: EngineConfig) -> TaintResult<Self> {
        config.validate()?;
        info!(
            "TaintEngine initialized: tainted_pointer={}, pointer_check={}, detaint_cb0={}",
            config.tainted_pointer, config.pointer_check, config.detaint_cb0_bytes
        );
        Ok(Self {
            store,
            warnings: UnreliableWarnings::new(config.unreliable_warning_limit),
            config,
            pointer_observer: None,
            load_observer: None,
            sinks: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn warnings(&self) -> &UnreliableWarnings {
        &self.warnings
    }

    pub fn set_pointer_observer(&mut self, observer: impl PointerObserver + 'static) {
        self.pointer_observer = Some(Box::new(observer));
    }

    pub fn set_load_observer(&mut self, observer: impl LoadObserver + 'static) {
        self.load_observer = Some(Box::new(observer));
    }

    pub fn add_constraint_sink(&mut self, sink: impl ConstraintSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn in_range(&self, at: ShadowAddr, size: u64) -> bool {
        self.store.contains(at.region, at.offset, size)
    }

    fn query_at(&self, at: ShadowAddr, i: u64) -> TaintData {
        self.store.query_full(at.region, at.offset.wrapping_add(i))
    }

    /// Union of every byte of a range
    fn mixed_labels(&self, at: ShadowAddr, size: u64, increment_tcn: bool) -> TaintData {
        let mut td = if size == 0 {
            TaintData::default()
        } else {
            (1..size).fold(self.query_at(at, 0), |acc, i| {
                TaintData::union(&acc, &self.query_at(at, i), false)
            })
        };
        if increment_tcn {
            td.increment_tcn();
        }
        td
    }

    fn bulk_set(&mut self, at: ShadowAddr, size: u64, td: &TaintData) {
        for i in 0..size {
            self.store
                .set_full(at.region, at.offset.wrapping_add(i), td.clone());
        }
    }

    fn snapshot(&self, at: ShadowAddr, size: u64) -> Vec<TaintData> {
        (0..size).map(|i| self.query_at(at, i)).collect()
    }

    fn log_labels(&self, op: &str, at: ShadowAddr, size: u64) {
        if !tracing::enabled!(tracing::Level::TRACE) {
            return;
        }
        let labels: Vec<String> = (0..size)
            .map(|i| match self.store.query(at.region, at.offset.wrapping_add(i)) {
                Some(ls) => ls.to_string(),
                None => "{}".to_string(),
            })
            .collect();
        trace!("{}: {}+{:#x} labels [{}]", op, at, size, labels.join(", "));
    }

    /// Delete every labelled byte whose control mask is 0
    pub fn detaint_on_cb0(&mut self, at: ShadowAddr, size: u64) {
        for i in 0..size {
            let Some(addr) = at.offset.checked_add(i) else {
                break;
            };
            let td = self.store.query_full(at.region, addr);
            if td.cb_mask == 0 && td.is_tainted() {
                self.store.remove(at.region, addr, 1);
                debug!("detaint: control bits 0 for {}[{:#x}]", at.region, addr);
            }
        }
    }

    pub(crate) fn detaint_if_enabled(&mut self, at: ShadowAddr, size: u64) {
        if self.config.detaint_cb0_bytes {
            self.detaint_on_cb0(at, size);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Propagation operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Byte-exact duplication, then mask update against `inst`
    pub fn copy(
        &mut self,
        dst: ShadowAddr,
        src: ShadowAddr,
        size: u64,
        inst: Option<&Instruction>,
    ) -> TaintResult<()> {
        if !self.in_range(dst, size) || !self.in_range(src, size) {
            trace!("copy: ignoring IO RW {} <- {}", dst, src);
            return Ok(());
        }
        trace!("copy: {}+{:#x} <- {}", dst, size, src);
        self.store
            .copy(dst.region, dst.offset, src.region, src.offset, size);
        self.log_labels("copy", dst, size);

        if let Some(inst) = inst {
            self.update_masks(dst, src, size, inst)?;
        }
        Ok(())
    }

    /// Bytewise union of two operands with exact masks for OR and AND
    pub fn parallel_compute(
        &mut self,
        dst: ShadowAddr,
        src1: ShadowAddr,
        src2: ShadowAddr,
        size: u64,
        inst: Option<&Instruction>,
    ) -> TaintResult<()> {
        if !self.in_range(dst, size) || !self.in_range(src1, size) || !self.in_range(src2, size) {
            trace!("pcompute: ignoring IO RW {} <- {} + {}", dst, src1, src2);
            return Ok(());
        }

        // Masks and source bytes are read before anything is written so an
        // aliased destination sees the original operands
        let m1 = compile_masks(&self.store, src1.region, src1.offset, size)?;
        let m2 = compile_masks(&self.store, src2.region, src2.offset, size)?;
        let lhs = self.snapshot(src1, size);
        let rhs = self.snapshot(src2, size);

        trace!("pcompute: {}+{:#x} <- {} + {}", dst, size, src1, src2);
        for (i, (a, b)) in lhs.iter().zip(rhs.iter()).enumerate() {
            let td = TaintData::union(a, b, false);
            self.store
                .set_full(dst.region, dst.offset.wrapping_add(i as u64), td);
        }

        let out = match inst.map(Instruction::opcode) {
            Some(Opcode::Binary(BinaryOp::Or)) => CbMasks::new(
                (m1.zero & m2.cb) | (m2.zero & m1.cb),
                m1.one | m2.one,
                m1.zero & m2.zero,
            ),
            Some(Opcode::Binary(BinaryOp::And)) => CbMasks::new(
                (m1.one & m2.cb) | (m2.one & m1.cb),
                m1.one & m2.one,
                m1.zero | m2.zero,
            ),
            _ => CbMasks::ZERO,
        };
        trace!(
            "pcompute_cb: {:#034x} + {:#034x} = {:#034x}",
            m1.cb,
            m2.cb,
            out.cb
        );
        write_masks(&mut self.store, dst.region, dst.offset, size, out)?;
        self.log_labels("pcompute", dst, size);

        self.detaint_if_enabled(dst, size);
        Ok(())
    }

    /// All-to-all union of two operands, broadcast to the destination
    pub fn mix_compute(
        &mut self,
        dst: ShadowAddr,
        dst_size: u64,
        src1: ShadowAddr,
        src2: ShadowAddr,
        src_size: u64,
        inst: Option<&Instruction>,
    ) -> TaintResult<()> {
        if !self.in_range(dst, dst_size)
            || !self.in_range(src1, src_size)
            || !self.in_range(src2, src_size)
        {
            trace!("mcompute: ignoring IO RW {} <- {} + {}", dst, src1, src2);
            return Ok(());
        }
        let td = TaintData::union(
            &self.mixed_labels(src1, src_size, false),
            &self.mixed_labels(src2, src_size, false),
            true,
        );
        trace!(
            "mcompute: {}+{:#x} <- {} + {} ({})",
            dst,
            dst_size,
            src1,
            src2,
            inst.map_or_else(|| "-".to_string(), |i| i.opcode().to_string())
        );
        self.bulk_set(dst, dst_size, &td);
        self.log_labels("mcompute", dst, dst_size);
        Ok(())
    }

    /// Multiplication: an untainted 0 kills propagation, an untainted 1 is parallel
    #[allow(clippy::too_many_arguments)]
    pub fn mul_compute(
        &mut self,
        dst: ShadowAddr,
        dst_size: u64,
        src1: ShadowAddr,
        src2: ShadowAddr,
        src_size: u64,
        inst: Option<&Instruction>,
        arg1: u128,
        arg2: u128,
    ) -> TaintResult<()> {
        let tainted1 = self.store.any_tainted(src1.region, src1.offset, src_size);
        let tainted2 = self.store.any_tainted(src2.region, src2.offset, src_size);

        if !tainted1 && !tainted2 {
            trace!("mul_compute: untainted args");
            return Ok(());
        }
        if tainted1 != tainted2 {
            let clean = if tainted1 { arg2 } else { arg1 };
            trace!("mul_compute: one untainted arg {:#x}", clean);
            match clean {
                0 => return Ok(()),
                1 => return self.parallel_compute(dst, src1, src2, src_size, inst),
                _ => {}
            }
        }
        self.mix_compute(dst, dst_size, src1, src2, src_size, inst)
    }

    /// Broadcast one byte's record over a range
    pub fn set(&mut self, dst: ShadowAddr, dst_size: u64, src: ShadowAddr) -> TaintResult<()> {
        if !self.in_range(dst, dst_size) || !self.in_range(src, 1) {
            trace!("set: ignoring IO RW {} <- {}", dst, src);
            return Ok(());
        }
        let td = self.store.query_full(src.region, src.offset);
        self.bulk_set(dst, dst_size, &td);
        self.log_labels("set", dst, dst_size);
        Ok(())
    }

    /// All-to-all union of one operand, then mask update against `inst`
    pub fn mix(
        &mut self,
        dst: ShadowAddr,
        dst_size: u64,
        src: ShadowAddr,
        src_size: u64,
        inst: Option<&Instruction>,
    ) -> TaintResult<()> {
        if !self.in_range(dst, dst_size) || !self.in_range(src, src_size) {
            trace!("mix: ignoring IO RW {} <- {}", dst, src);
            return Ok(());
        }
        let td = self.mixed_labels(src, src_size, true);
        self.bulk_set(dst, dst_size, &td);
        trace!("mix: {}+{:#x} <- {}+{:#x}", dst, dst_size, src, src_size);
        self.log_labels("mix", dst, dst_size);

        if let Some(inst) = inst {
            self.update_masks(dst, src, dst_size, inst)?;
        }
        Ok(())
    }

    /// Load or store through a possibly tainted pointer
    ///
    /// Pointer labels are mixed and unioned into every transferred byte. A
    /// source outside its region is ignored; the destination then receives
    /// the pointer taint alone.
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_taint(
        &mut self,
        dst: ShadowAddr,
        ptr: ShadowAddr,
        ptr_size: u64,
        src: ShadowAddr,
        size: u64,
        is_store: bool,
    ) -> TaintResult<()> {
        trace!(
            "ptr: {}+{:#x} <- {} @ {}+{:#x}",
            dst,
            size,
            src,
            ptr,
            ptr_size
        );
        if !self.in_range(dst, size) {
            trace!("ptr: ignoring IO RW");
            return Ok(());
        }
        let src = if self.in_range(src, size) {
            Some(src)
        } else {
            trace!("ptr: source IO");
            None
        };

        let ptr_td = self.mixed_labels(ptr, ptr_size, false);

        if self.config.pointer_check {
            let access = PointerAccess {
                dst,
                src,
                ptr,
                ptr_size,
                size,
                is_store,
                pointer_labels: ptr_td.labels.clone(),
            };
            if let Some(observer) = self.pointer_observer.as_mut() {
                observer.on_pointer_access(&access);
            }
        }

        if !self.config.tainted_pointer {
            // plain copy; an IO source leaves the destination alone
            if let Some(src) = src {
                self.store
                    .copy(dst.region, dst.offset, src.region, src.offset, size);
            }
            return Ok(());
        }

        let Some(src) = src else {
            self.bulk_set(dst, size, &ptr_td);
            return Ok(());
        };

        for (i, byte_td) in self.snapshot(src, size).into_iter().enumerate() {
            let addr = dst.offset.wrapping_add(i as u64);
            let mut dest_td = TaintData::union(&ptr_td, &byte_td, false);

            // unions destroy controlled bits; a pointer does not
            let union_cb = dest_td.cb_mask;
            dest_td.cb_mask = byte_td.cb_mask;
            if self.config.detaint_cb0_bytes && byte_td.cb_mask == 0 && union_cb != 0 {
                self.store.remove(dst.region, addr, 1);
                debug!("detaint: control bits 0 for {}[{:#x}]", dst.region, addr);
            } else {
                self.store.set_full(dst.region, addr, dest_td);
            }
        }
        self.log_labels("ptr", dst, size);
        Ok(())
    }

    /// Copy the operand whose selector matches `selector`
    pub fn select(
        &mut self,
        dst: ShadowAddr,
        size: u64,
        selector: u64,
        choices: &[SelectChoice],
    ) -> TaintResult<()> {
        let choice = choices
            .iter()
            .find(|c| c.selector == selector)
            .ok_or(TaintError::SelectorNotFound { selector })?;

        match choice.source {
            SelectSource::Slot(offset) => {
                trace!("select (copy): {}+{:#x} <- {:#x}", dst, size, offset);
                self.copy(dst, ShadowAddr::new(dst.region, offset), size, None)
            }
            SelectSource::Constant => Ok(()),
        }
    }

    /// Copy the low bytes, then replicate the top copied byte upward
    pub fn sext(
        &mut self,
        dst: ShadowAddr,
        dst_size: u64,
        src: ShadowAddr,
        src_size: u64,
    ) -> TaintResult<()> {
        if src_size == 0 || dst_size < src_size {
            return self.copy(dst, src, dst_size.min(src_size), None);
        }
        if !self.in_range(dst, dst_size) || !self.in_range(src, src_size) {
            trace!("sext: ignoring IO RW {} <- {}", dst, src);
            return Ok(());
        }
        self.store
            .copy(dst.region, dst.offset, src.region, src.offset, src_size);
        let top = self.query_at(dst, src_size - 1);
        let upper = ShadowAddr::new(dst.region, dst.offset + src_size);
        self.bulk_set(upper, dst_size - src_size, &top);
        self.log_labels("sext", dst, dst_size);
        Ok(())
    }

    /// Clear a range
    pub fn delete(&mut self, dst: ShadowAddr, size: u64) -> TaintResult<()> {
        trace!("remove: {}+{:#x}", dst, size);
        if !self.in_range(dst, size) {
            trace!("remove: ignoring IO RW");
            return Ok(());
        }
        self.store.remove(dst.region, dst.offset, size);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frames and notifications
    // ═══════════════════════════════════════════════════════════════════════

    pub fn reset_frame(&mut self) {
        self.store.reset_frame();
    }

    pub fn push_frame(&mut self) {
        self.store.push_frame(self.config.frame_size);
    }

    pub fn pop_frame(&mut self) {
        self.store.pop_frame(self.config.frame_size);
    }

    /// Forward a completed load/store to the load observer
    pub fn notify_after_load(&mut self, reg: u64, addr: u64, size: u64) {
        if let Some(observer) = self.load_observer.as_mut() {
            observer.after_load(reg, addr, size);
        }
    }
}
