//! Branch constraint extraction end to end
//!
//! Builds small translation units the way the translator lowers guest code,
//! taints the comparison operands and checks the string every sink receives.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use pretty_assertions::assert_eq;
use taintflow_ir::config::EngineConfig;
use taintflow_ir::{
    BinaryOp, CastOp, InstId, Instruction, InstructionGraph, Operand, Predicate, ShadowAddr,
    TaintError, ValueType,
};

fn env() -> Operand {
    Operand::Argument(0)
}

fn i32_lit(v: u128) -> Operand {
    Operand::const_int(v, 32)
}

fn load_reg(g: &mut InstructionGraph, name: &str) -> InstId {
    g.push(Instruction::load(env(), ValueType::Int(32)).named(name))
}

fn collect_sink(e: &mut taintflow_ir::TaintEngine<taintflow_shadow::MemoryShadow>) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    e.add_constraint_sink(move |c: &str| sink.borrow_mut().push(c.to_string()));
    seen
}

#[test]
fn test_register_equals_literal() {
    let mut g = InstructionGraph::new();
    let eax = load_reg(&mut g, "eax");
    let cmp = g.push(Instruction::cmp(Predicate::Eq, eax, i32_lit(5)));

    let mut e = default_engine();
    taint(&mut e, ShadowAddr::llv(0), 4, 1);
    let seen = collect_sink(&mut e);

    let out = e.after_tainted_branch(&g, cmp, Some(0), None).unwrap();
    assert_eq!(out.as_deref(), Some("((regs['eax']) == (5))"));
    assert_eq!(*seen.borrow(), vec!["((regs['eax']) == (5))".to_string()]);
}

#[test]
fn test_unsigned_less_than() {
    let mut g = InstructionGraph::new();
    let ecx = load_reg(&mut g, "ecx");
    let edx = load_reg(&mut g, "edx");
    let sum = g.push(Instruction::binary(BinaryOp::Add, ecx, edx, ValueType::Int(32)));
    let cmp = g.push(Instruction::cmp(Predicate::Ult, sum, edx));

    let mut e = default_engine();
    taint(&mut e, ShadowAddr::llv(8), 1, 2);

    let out = e.after_tainted_branch(&g, cmp, Some(8), Some(12)).unwrap();
    assert_eq!(
        out.as_deref(),
        Some("ULT(((regs['ecx'] + regs['edx'])),(no_taint))")
    );
}

#[test]
fn test_byte_compare_after_subtract() {
    // cmp al, 0x58 ; je ...
    let mut g = InstructionGraph::new();
    let eax = load_reg(&mut g, "eax");
    let sub = g.push(Instruction::binary(BinaryOp::Sub, eax, i32_lit(88), ValueType::Int(32)));
    let low = g.push(Instruction::cast(CastOp::Trunc, sub, ValueType::Int(8)));
    let cmp = g.push(Instruction::cmp(Predicate::Eq, low, Operand::const_int(0, 8)));

    let mut e = default_engine();
    taint(&mut e, ShadowAddr::llv(16), 1, 4);

    let out = e.after_tainted_branch(&g, cmp, Some(16), None).unwrap();
    assert_eq!(
        out.as_deref(),
        Some("((Extract(8, 0, (regs['eax'] - 88))) == (0))")
    );
}

#[test]
fn test_memory_load_operand() {
    let mut g = InstructionGraph::new();
    let esp = load_reg(&mut g, "esp");
    let addr = g.push(Instruction::binary(BinaryOp::Add, esp, i32_lit(4), ValueType::Int(32)));
    let word = g.push(Instruction::call(
        Some("helper_le_ldul_mmu_panda"),
        vec![env(), Operand::Inst(addr), i32_lit(1), i32_lit(0)],
        ValueType::Int(32),
    ));
    let cmp = g.push(Instruction::cmp(Predicate::Sgt, word, i32_lit(100)));

    let mut e = default_engine();
    taint(&mut e, ShadowAddr::llv(0), 4, 1);

    let out = e.after_tainted_branch(&g, cmp, Some(0), None).unwrap();
    assert_eq!(
        out.as_deref(),
        Some("((load(1,0,4,0,(regs['esp'] + 4))) > (100))")
    );
}

#[test]
fn test_untainted_branch_reaches_no_sink() {
    let mut g = InstructionGraph::new();
    let eax = load_reg(&mut g, "eax");
    let cmp = g.push(Instruction::cmp(Predicate::Ne, eax, i32_lit(0)));

    let mut e = default_engine();
    let seen = collect_sink(&mut e);

    assert_eq!(e.after_tainted_branch(&g, cmp, Some(0), None).unwrap(), None);
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_non_comparison_is_rejected() {
    let mut g = InstructionGraph::new();
    let eax = load_reg(&mut g, "eax");

    let mut e = default_engine();
    taint(&mut e, ShadowAddr::llv(0), 1, 1);

    let err = e.after_tainted_branch(&g, eax, Some(0), None).unwrap_err();
    assert!(matches!(err, TaintError::NotAComparison(_)));
    assert!(err.is_invariant_violation());
}

#[test]
fn test_depth_guard_on_long_chain() {
    let mut g = InstructionGraph::new();
    let mut v = load_reg(&mut g, "eax");
    for _ in 0..50 {
        v = g.push(Instruction::binary(BinaryOp::Xor, v, i32_lit(1), ValueType::Int(32)));
    }
    let cmp = g.push(Instruction::cmp(Predicate::Eq, v, i32_lit(0)));

    let mut e = engine(EngineConfig::default().max_constraint_depth(8));
    taint(&mut e, ShadowAddr::llv(0), 1, 1);

    let out = e.after_tainted_branch(&g, cmp, Some(0), None).unwrap().unwrap();
    assert!(out.contains("Error_depth"));
    assert!(!out.contains("regs['eax']"));
}
