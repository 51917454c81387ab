//! Constraint extraction at tainted conditional branches

use taintflow_shadow::{Region, ShadowStore};
use tracing::debug;

use crate::errors::{TaintError, TaintResult};
use crate::features::taint_propagation::TaintEngine;
use crate::shared::models::{InstId, InstKind, InstructionGraph};

use super::extractor::ConstraintExtractor;

impl<S: ShadowStore> TaintEngine<S> {
    /// Render the comparison `cmp` feeding a branch and deliver it to every
    /// registered sink
    ///
    /// `slot1`/`slot2` are the temporaries slots of the two operands. Returns
    /// `Ok(None)` when neither slot is tainted.
    pub fn after_tainted_branch(
        &mut self,
        graph: &InstructionGraph,
        cmp: InstId,
        slot1: Option<u64>,
        slot2: Option<u64>,
    ) -> TaintResult<Option<String>> {
        let inst = graph
            .get(cmp)
            .ok_or(TaintError::UnknownInstruction(cmp.0))?;
        let pred = match inst.kind {
            InstKind::Cmp(pred) => pred,
            _ => return Err(TaintError::NotAComparison(inst.opcode().to_string())),
        };

        let tainted = [slot1, slot2].map(|slot| {
            slot.is_some_and(|s| self.store.query(Region::Temporaries, s).is_some())
        });
        if !tainted.iter().any(|t| *t) {
            return Ok(None);
        }

        let extractor = ConstraintExtractor::new(graph, self.config.max_constraint_depth);
        let constraint = extractor.render_comparison(pred, inst, tainted);
        debug!(cmp = %cmp, constraint = %constraint, "tainted branch");

        for sink in self.sinks.iter_mut() {
            sink.on_branch_constraint(&constraint);
        }
        Ok(Some(constraint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::shared::models::{BinaryOp, CastOp, Instruction, Operand, Predicate, ValueType};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use taintflow_shadow::{Label, MemoryShadow, ShadowLayout};

    fn engine() -> TaintEngine<MemoryShadow> {
        let layout = ShadowLayout {
            temporaries: 16,
            registers: 16,
            special_state: 16,
            ram: 16,
        };
        TaintEngine::new(MemoryShadow::new(layout).unwrap(), EngineConfig::default()).unwrap()
    }

    /// `icmp eq (trunc (eax - 88) to i8), 0`
    fn branch_graph() -> (InstructionGraph, InstId) {
        let mut g = InstructionGraph::new();
        let eax = g.push(Instruction::load(Operand::Argument(0), ValueType::Int(32)).named("eax"));
        let sub = g.push(Instruction::binary(
            BinaryOp::Sub,
            eax,
            Operand::const_int(88, 32),
            ValueType::Int(32),
        ));
        let t = g.push(Instruction::cast(CastOp::Trunc, sub, ValueType::Int(8)));
        let cmp = g.push(Instruction::cmp(Predicate::Eq, t, Operand::const_int(0, 8)));
        (g, cmp)
    }

    #[test]
    fn test_tainted_branch_delivers_constraint() {
        let (g, cmp) = branch_graph();
        let mut e = engine();
        e.store_mut()
            .apply_label_range(Region::Temporaries, 3, 1, Label(1))
            .unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        e.add_constraint_sink(move |c: &str| sink.borrow_mut().push(c.to_string()));

        let out = e.after_tainted_branch(&g, cmp, Some(3), None).unwrap();
        let expected = "((Extract(8, 0, (regs['eax'] - 88))) == (0))";
        assert_eq!(out.as_deref(), Some(expected));
        assert_eq!(*seen.borrow(), vec![expected.to_string()]);
    }

    #[test]
    fn test_untainted_branch_is_skipped() {
        let (g, cmp) = branch_graph();
        let mut e = engine();
        assert_eq!(e.after_tainted_branch(&g, cmp, Some(3), None).unwrap(), None);
        assert_eq!(e.after_tainted_branch(&g, cmp, None, None).unwrap(), None);
    }

    #[test]
    fn test_invalid_inputs() {
        let (g, cmp) = branch_graph();
        let mut e = engine();
        let err = e.after_tainted_branch(&g, InstId(99), Some(0), None).unwrap_err();
        assert!(matches!(err, TaintError::UnknownInstruction(99)));

        let not_cmp = InstId(cmp.0 - 1);
        let err = e.after_tainted_branch(&g, not_cmp, Some(0), None).unwrap_err();
        assert!(matches!(err, TaintError::NotAComparison(_)));
    }
}
