/*
 * Backward slice of a tainted comparison
 *
 * Starting from each operand of the comparison, walk the instruction graph
 * backward and rebuild the computation as a SymbolicExpr:
 *
 *   %eax_v = load %env.eax          ; regs['eax_v']
 *   %t1    = sub i32 %eax_v, 88     ; (regs['eax_v'] - 88)
 *   %t2    = trunc i32 %t1 to i8    ; Extract(8, 0, (regs['eax_v'] - 88))
 *   %c     = icmp eq i8 %t2, 0      ; ((Extract(8, 0, ...)) == (0))
 *
 * Base cases: literals and loads from CPU state. Recursion is bounded by
 * max_depth; deeper nodes render as Error_depth.
 */

use crate::shared::models::{
    BinaryOp, CastOp, InstId, InstKind, Instruction, InstructionGraph, Operand, Predicate,
};

use crate::features::branch_constraints::domain::{MemoryHelper, SymbolicExpr};

/// Infix symbol of a binary operator; `None` for the function forms
fn infix_symbol(op: BinaryOp) -> Option<&'static str> {
    match op {
        BinaryOp::Add | BinaryOp::FAdd => Some("+"),
        BinaryOp::Sub | BinaryOp::FSub => Some("-"),
        BinaryOp::Mul | BinaryOp::FMul => Some("*"),
        BinaryOp::SDiv | BinaryOp::FDiv => Some("/"),
        BinaryOp::SRem | BinaryOp::FRem => Some("%"),
        BinaryOp::Shl => Some("<<"),
        BinaryOp::AShr => Some(">>"),
        BinaryOp::And => Some("&"),
        BinaryOp::Or => Some("|"),
        BinaryOp::Xor => Some("^"),
        BinaryOp::UDiv | BinaryOp::URem | BinaryOp::LShr => None,
    }
}

fn function_form(op: BinaryOp) -> Option<&'static str> {
    match op {
        BinaryOp::UDiv => Some("UDiv"),
        BinaryOp::URem => Some("URem"),
        BinaryOp::LShr => Some("LShr"),
        _ => None,
    }
}

/// Builds symbolic expressions over one translation unit
#[derive(Debug, Clone, Copy)]
pub struct ConstraintExtractor<'g> {
    graph: &'g InstructionGraph,
    max_depth: usize,
}

impl<'g> ConstraintExtractor<'g> {
    pub fn new(graph: &'g InstructionGraph, max_depth: usize) -> Self {
        Self { graph, max_depth }
    }

    /// Expression computing `operand`
    pub fn slice(&self, operand: &Operand) -> SymbolicExpr {
        self.slice_operand(operand, 0)
    }

    fn slice_operand(&self, operand: &Operand, depth: usize) -> SymbolicExpr {
        if depth >= self.max_depth {
            return SymbolicExpr::DepthExceeded;
        }
        match operand {
            Operand::ConstInt { value, .. } => SymbolicExpr::Literal(*value),
            Operand::Inst(id) => match self.graph.get(*id) {
                Some(inst) => self.slice_inst(*id, inst, depth),
                None => SymbolicExpr::BadValue,
            },
            Operand::Argument(_) | Operand::Global(_) | Operand::Undef => SymbolicExpr::BadValue,
        }
    }

    fn child(&self, inst: &Instruction, idx: usize, depth: usize) -> SymbolicExpr {
        match inst.operand(idx) {
            Some(op) => self.slice_operand(op, depth + 1),
            None => SymbolicExpr::BadValue,
        }
    }

    fn slice_inst(&self, id: InstId, inst: &Instruction, depth: usize) -> SymbolicExpr {
        match &inst.kind {
            InstKind::Cast(op) => {
                let value = Box::new(self.child(inst, 0, depth));
                match (inst.ty.int_width(), op) {
                    (Some(bits), CastOp::Trunc) => SymbolicExpr::Extract { bits, value },
                    (Some(bits), CastOp::ZExt) => SymbolicExpr::ZeroExt { bits, value },
                    (Some(bits), CastOp::SExt) => SymbolicExpr::SignExt { bits, value },
                    (Some(_), _) => SymbolicExpr::BadIntCast(value),
                    (None, _) if inst.ty.is_pointer() => SymbolicExpr::PtrCast(value),
                    (None, _) => SymbolicExpr::TypeCast {
                        ty: inst.ty.clone(),
                        value,
                    },
                }
            }
            InstKind::Binary(op) => {
                let lhs = self.child(inst, 0, depth);
                let rhs = self.child(inst, 1, depth);
                match function_form(*op) {
                    Some(name) => SymbolicExpr::call2(name, lhs, rhs),
                    None => SymbolicExpr::infix(infix_symbol(*op), lhs, rhs),
                }
            }
            InstKind::Call {
                callee: Some(callee),
            } => match MemoryHelper::parse(callee) {
                Some(helper) => SymbolicExpr::MemAccess {
                    helper,
                    addr: Box::new(self.child(inst, 1, depth)),
                },
                None => SymbolicExpr::UnknownCall(Some(callee.clone())),
            },
            InstKind::Call { callee: None } => SymbolicExpr::UnknownCall(None),
            InstKind::Load => SymbolicExpr::Register(
                inst.name.clone().unwrap_or_else(|| id.to_string()),
            ),
            _ => SymbolicExpr::BadInstruction,
        }
    }

    /// Top-level rendering of a comparison operand
    pub fn render_operand(&self, operand: &Operand, tainted: bool) -> String {
        match operand {
            Operand::ConstInt { value, .. } => value.to_string(),
            Operand::Inst(_) if tainted => self.slice(operand).to_string(),
            Operand::Inst(_) => "no_taint".to_string(),
            _ => "???".to_string(),
        }
    }

    /// Render a full comparison given which operand slots are tainted
    pub fn render_comparison(
        &self,
        pred: Predicate,
        cmp: &Instruction,
        tainted: [bool; 2],
    ) -> String {
        let render = |idx: usize| match cmp.operand(idx) {
            Some(op) => self.render_operand(op, tainted[idx]),
            None => "???".to_string(),
        };
        let (lhs, rhs) = (render(0), render(1));
        if pred.is_unsigned_ordering() {
            format!("{}(({}),({}))", pred.symbol(), lhs, rhs)
        } else {
            format!("(({}) {} ({}))", lhs, pred.symbol(), rhs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ValueType;
    use pretty_assertions::assert_eq;

    fn lit(v: u128) -> Operand {
        Operand::const_int(v, 32)
    }

    fn eax_minus_88(g: &mut InstructionGraph) -> InstId {
        let eax = g.push(Instruction::load(Operand::Argument(0), ValueType::Int(32)).named("eax_v"));
        g.push(Instruction::binary(BinaryOp::Sub, eax, lit(88), ValueType::Int(32)))
    }

    #[test]
    fn test_slice_sub_trunc() {
        let mut g = InstructionGraph::new();
        let sub = eax_minus_88(&mut g);
        let trunc = g.push(Instruction::cast(CastOp::Trunc, sub, ValueType::Int(8)));
        let x = ConstraintExtractor::new(&g, 256);
        assert_eq!(
            x.slice(&Operand::Inst(trunc)).to_string(),
            "Extract(8, 0, (regs['eax_v'] - 88))"
        );
    }

    #[test]
    fn test_function_forms_and_exts() {
        let mut g = InstructionGraph::new();
        let eax = g.push(Instruction::load(Operand::Argument(0), ValueType::Int(32)).named("eax"));
        let div = g.push(Instruction::binary(BinaryOp::UDiv, eax, lit(4), ValueType::Int(32)));
        let shr = g.push(Instruction::binary(BinaryOp::LShr, div, lit(1), ValueType::Int(32)));
        let ext = g.push(Instruction::cast(CastOp::SExt, shr, ValueType::Int(64)));
        let x = ConstraintExtractor::new(&g, 256);
        assert_eq!(
            x.slice(&Operand::Inst(ext)).to_string(),
            "SignExt(64, LShr(UDiv(regs['eax'], 4), 1))"
        );
    }

    #[test]
    fn test_casts() {
        let mut g = InstructionGraph::new();
        let eax = g.push(Instruction::load(Operand::Argument(0), ValueType::Int(32)).named("eax"));
        let p = g.push(Instruction::cast(CastOp::IntToPtr, eax, ValueType::Pointer));
        let back = g.push(Instruction::cast(CastOp::PtrToInt, p, ValueType::Int(32)));
        let fp = g.push(Instruction::cast(CastOp::UIToFP, eax, ValueType::Float(64)));
        let x = ConstraintExtractor::new(&g, 256);
        assert_eq!(
            x.slice(&Operand::Inst(back)).to_string(),
            "ERROR(xxxptrcast(regs['eax']))"
        );
        assert_eq!(x.slice(&Operand::Inst(fp)).to_string(), "xxxcast(double,regs['eax'])");
    }

    #[test]
    fn test_memory_helper_call() {
        let mut g = InstructionGraph::new();
        let addr = g.push(Instruction::load(Operand::Argument(0), ValueType::Int(32)).named("esp"));
        let call = g.push(Instruction::call(
            Some("helper_le_ldul_mmu_panda"),
            vec![Operand::Argument(0), Operand::Inst(addr), lit(2), lit(0xdead_beef)],
            ValueType::Int(32),
        ));
        let other = g.push(Instruction::call(Some("helper_cc_compute_all"), vec![], ValueType::Int(32)));
        let x = ConstraintExtractor::new(&g, 256);
        assert_eq!(
            x.slice(&Operand::Inst(call)).to_string(),
            "load(1,0,4,0,regs['esp'])"
        );
        assert_eq!(
            x.slice(&Operand::Inst(other)).to_string(),
            "XXX_unk_helper_cc_compute_all"
        );
    }

    #[test]
    fn test_bad_nodes() {
        let mut g = InstructionGraph::new();
        let phi = g.push(Instruction::new(InstKind::Phi, vec![], ValueType::Int(32)));
        let x = ConstraintExtractor::new(&g, 256);
        assert_eq!(x.slice(&Operand::Inst(phi)).to_string(), "Error_bad_insn");
        assert_eq!(x.slice(&Operand::Inst(InstId(42))).to_string(), "Error_bad_value");
        assert_eq!(x.slice(&Operand::Global("env".into())).to_string(), "Error_bad_value");
    }

    #[test]
    fn test_depth_guard() {
        let mut g = InstructionGraph::new();
        let mut v = g.push(Instruction::load(Operand::Argument(0), ValueType::Int(32)).named("eax"));
        for _ in 0..10 {
            v = g.push(Instruction::binary(BinaryOp::Add, v, lit(1), ValueType::Int(32)));
        }
        let x = ConstraintExtractor::new(&g, 3);
        assert_eq!(
            x.slice(&Operand::Inst(v)).to_string(),
            "(((Error_depth + Error_depth) + 1) + 1)"
        );
    }

    #[test]
    fn test_render_comparison_forms() {
        let mut g = InstructionGraph::new();
        let sub = eax_minus_88(&mut g);
        let x = ConstraintExtractor::new(&g, 256);

        let ult = Instruction::cmp(Predicate::Ult, sub, lit(10));
        assert_eq!(
            x.render_comparison(Predicate::Ult, &ult, [true, false]),
            "ULT(((regs['eax_v'] - 88)),(10))"
        );
        let eq = Instruction::cmp(Predicate::Eq, sub, Operand::Undef);
        assert_eq!(
            x.render_comparison(Predicate::Eq, &eq, [false, false]),
            "((no_taint) == (???))"
        );
    }
}
