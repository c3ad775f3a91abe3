use std::collections::BTreeSet;

use pcf2_bytecode::{Instruction, TruthTable, Wire};
use pcf2_opt::{CfgError, ControlFlowGraph};
use smallvec::SmallVec;

// ============================================================================
// Helpers
// ============================================================================

fn label(name: &str) -> Instruction {
    Instruction::Label { name: name.into() }
}

fn konst(dest: u32, value: u64) -> Instruction {
    Instruction::Const {
        dest: Wire(dest),
        value,
    }
}

fn gate(dest: u32, in1: u32, in2: u32) -> Instruction {
    Instruction::Gate {
        dest: Wire(dest),
        in1: Wire(in1),
        in2: Wire(in2),
        table: TruthTable::AND,
    }
}

fn bits(dests: &[u32], src: u32) -> Instruction {
    Instruction::Bits {
        dests: dests.iter().map(|&w| Wire(w)).collect::<SmallVec<_>>(),
        src: Wire(src),
    }
}

fn call(function: &str) -> Instruction {
    Instruction::Call {
        base: 0,
        function: function.into(),
    }
}

fn branch(cond: u32, target: &str) -> Instruction {
    Instruction::Branch {
        cond: Wire(cond),
        target: target.into(),
    }
}

fn ret(value: u32) -> Instruction {
    Instruction::Return { value: Wire(value) }
}

fn init() -> Instruction {
    Instruction::InitBase { base: 1 }
}

fn assert_edge_symmetry(cfg: &ControlFlowGraph) {
    for block in cfg.blocks.values() {
        for s in &block.successors {
            let succ = cfg.block(*s).expect("successor block exists");
            assert!(
                succ.predecessors.contains(&block.id),
                "edge {} -> {} has no matching predecessor entry",
                block.id,
                s
            );
        }
        for p in &block.predecessors {
            let pred = cfg.block(*p).expect("predecessor block exists");
            assert!(
                pred.successors.contains(&block.id),
                "edge {} <- {} has no matching successor entry",
                block.id,
                p
            );
        }
    }
}

/// main calls f once; f's gate depends on wires main sets up first.
///
///   0 initbase   4 label main   7 call f
///   1 label f    5 const w1=1   8 bits [w4] w3
///   2 gate w3    6 const w2=1   9 return w4
///   3 return w3
fn call_program() -> Vec<Instruction> {
    vec![
        init(),
        label("f"),
        gate(3, 1, 2),
        ret(3),
        label("main"),
        konst(1, 1),
        konst(2, 1),
        call("f"),
        bits(&[4], 3),
        ret(4),
    ]
}

// ============================================================================
// Edge construction
// ============================================================================

#[test]
fn initbase_edge_targets_main_not_next_instruction() {
    let cfg = ControlFlowGraph::build(&call_program()).unwrap();
    assert_eq!(cfg.block(0).unwrap().successors, BTreeSet::from([4]));
}

#[test]
fn call_and_return_round_trip() {
    let cfg = ControlFlowGraph::build(&call_program()).unwrap();

    // The call block gets both the fallthrough slot and the callee entry.
    assert_eq!(cfg.block(7).unwrap().successors, BTreeSet::from([1, 8]));
    // The callee's return block resumes after the call.
    assert!(cfg.block(3).unwrap().successors.contains(&8));
    // The resume point sees both incoming paths: direct-from-call and
    // via-the-callee.
    assert_eq!(cfg.block(8).unwrap().predecessors, BTreeSet::from([3, 7]));

    assert_eq!(cfg.bottom, 9);
    assert_edge_symmetry(&cfg);
}

#[test]
fn multiple_call_sites_merge_at_callee() {
    let prog = vec![
        init(),
        label("f"),
        konst(1, 1),
        ret(1),
        label("main"),
        call("f"),
        call("f"),
        ret(1),
    ];
    let cfg = ControlFlowGraph::build(&prog).unwrap();

    // Context-insensitive: both sites enter the same body...
    assert_eq!(cfg.block(1).unwrap().predecessors, BTreeSet::from([5, 6]));
    // ...and the one return block fans out to both resume points.
    assert_eq!(cfg.block(3).unwrap().successors, BTreeSet::from([6, 7]));
    assert_edge_symmetry(&cfg);
}

#[test]
fn branch_keeps_both_arms() {
    let prog = vec![branch(0, "$L"), gate(1, 0, 0), label("$L"), ret(0)];
    let cfg = ControlFlowGraph::build(&prog).unwrap();

    assert_eq!(cfg.block(0).unwrap().successors, BTreeSet::from([1, 2]));
    assert_eq!(cfg.block(2).unwrap().predecessors, BTreeSet::from([0, 1]));
    assert_eq!(cfg.len(), 4);
    assert_edge_symmetry(&cfg);
}

#[test]
fn builtin_call_is_an_ordinary_instruction() {
    let prog = vec![init(), label("main"), call("alice"), konst(0, 1), ret(0)];
    let cfg = ControlFlowGraph::build(&prog).unwrap();

    assert_eq!(cfg.block(2).unwrap().successors, BTreeSet::from([3]));
    assert_edge_symmetry(&cfg);
}

#[test]
fn no_fallthrough_into_function_body() {
    let prog = vec![
        init(),
        konst(9, 0),
        label("f"),
        konst(1, 1),
        ret(1),
        label("main"),
        call("f"),
        ret(1),
    ];
    let cfg = ControlFlowGraph::build(&prog).unwrap();

    // The preamble const sits right before f's label but may not fall
    // through into the body.
    assert!(cfg.block(1).unwrap().successors.is_empty());
    assert_edge_symmetry(&cfg);
}

#[test]
fn loop_back_edge_is_recorded() {
    let prog = vec![
        init(),
        label("main"),
        konst(0, 1),
        label("$loop"),
        gate(1, 0, 0),
        bits(&[2], 1),
        branch(2, "$loop"),
        ret(2),
    ];
    let cfg = ControlFlowGraph::build(&prog).unwrap();

    assert_eq!(cfg.block(6).unwrap().successors, BTreeSet::from([3, 7]));
    assert_eq!(cfg.block(3).unwrap().predecessors, BTreeSet::from([2, 6]));
    assert_edge_symmetry(&cfg);
}

// ============================================================================
// Fatal construction errors
// ============================================================================

#[test]
fn unknown_function_fails_closed() {
    let prog = vec![init(), label("main"), call("g"), ret(0)];
    assert_eq!(
        ControlFlowGraph::build(&prog).unwrap_err(),
        CfgError::UnknownFunction {
            function: "g".into(),
            index: 2
        }
    );
}

#[test]
fn missing_main_label_fails_closed() {
    let prog = vec![init(), konst(0, 1), ret(0)];
    assert_eq!(
        ControlFlowGraph::build(&prog).unwrap_err(),
        CfgError::UnknownLabel {
            label: "main".into(),
            index: 0
        }
    );
}

#[test]
fn called_function_without_return_fails_closed() {
    let prog = vec![init(), label("f"), konst(1, 1), label("main"), call("f"), konst(2, 2)];
    assert_eq!(
        ControlFlowGraph::build(&prog).unwrap_err(),
        CfgError::MissingReturn {
            function: "f".into()
        }
    );
}

#[test]
fn return_outside_any_function_fails_closed() {
    let prog = vec![init(), label("main"), ret(0), konst(0, 1), ret(0)];
    assert_eq!(
        ControlFlowGraph::build(&prog).unwrap_err(),
        CfgError::UnbalancedReturn { index: 2 }
    );
}
