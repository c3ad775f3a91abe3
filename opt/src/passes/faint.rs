//! Faint-variable analysis — the dual of liveness.
//!
//! A wire is faint at a program point if, along every path from that point
//! to the program end, it is either never used before being redefined or
//! used only to define other faint wires. Faint wires carry no information
//! to any output, which makes their defining gates elimination candidates.
//!
//! Backward direction, intersection confluence: a wire stays faint only if
//! it is faint on every successor path.

use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};

use pcf2_bytecode::{wire_range, Instruction, Wire};

use crate::cfg::{BasicBlock, ControlFlowGraph};
use crate::dataflow::{Analysis, Direction};

/// The set of faint wires at a program point.
///
/// At the program exit every wire is faint, so the fact stores the
/// complement — the wires proven non-faint. The default (empty complement)
/// is simultaneously the conceptual universal-set top and the identity for
/// intersection, which lets blocks start uninitialized without knowing the
/// wire universe up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaintFact {
    not_faint: FxHashSet<Wire>,
}

impl FaintFact {
    /// Everything faint: the uninitialized value and the intersection
    /// identity.
    pub fn top() -> Self {
        Self::default()
    }

    pub fn is_faint(&self, wire: Wire) -> bool {
        !self.not_faint.contains(&wire)
    }

    /// Intersection of the faint sets (union of their complements) — the
    /// all-paths confluence operator.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut not_faint = self.not_faint.clone();
        not_faint.extend(other.not_faint.iter().copied());
        Self { not_faint }
    }

    /// `in = (out − kill) ∪ gen`, applied on the complement.
    fn transfer(&self, gen: &[Wire], kill: &[Wire]) -> Self {
        let mut not_faint = self.not_faint.clone();
        not_faint.extend(kill.iter().copied());
        for w in gen {
            not_faint.remove(w);
        }
        Self { not_faint }
    }
}

/// Per-instruction contribution to the faint equations.
///
/// gen holds wires that become faint at this point (their current value is
/// about to be redefined); kill holds wires proven non-faint (used toward
/// an output). Gates, arithmetic, pointer operations, and control
/// instructions contribute nothing — each is an explicit arm so the empty
/// default stays auditable.
pub fn gen_kill(inst: &Instruction) -> (SmallVec<[Wire; 8]>, SmallVec<[Wire; 8]>) {
    match inst {
        Instruction::Bits { dests, src } => (SmallVec::from_slice(dests), smallvec![*src]),
        Instruction::Const { dest, .. } => (smallvec![*dest], SmallVec::new()),
        Instruction::Copy { dest, width, .. } => (wire_range(*dest, *width), SmallVec::new()),
        Instruction::Join { dest, sources } => {
            (smallvec![*dest], SmallVec::from_slice(sources))
        }
        Instruction::Gate { .. }
        | Instruction::Add { .. }
        | Instruction::Sub { .. }
        | Instruction::Mul { .. }
        | Instruction::CopyIndir { .. }
        | Instruction::IndirCopy { .. }
        | Instruction::MkPtr { .. }
        | Instruction::Label { .. }
        | Instruction::InitBase { .. }
        | Instruction::Branch { .. }
        | Instruction::Call { .. }
        | Instruction::Return { .. } => (SmallVec::new(), SmallVec::new()),
    }
}

/// The faint set *after* a block: the intersection over its successors'
/// stored entry facts. The engine stores entry facts, so the eliminator
/// recomputes exit facts through this as well.
pub fn out_fact(block: &BasicBlock, cfg: &ControlFlowGraph) -> FaintFact {
    block
        .successors
        .iter()
        .filter_map(|&s| cfg.block(s))
        .fold(FaintFact::top(), |acc, succ| acc.intersect(&succ.facts.faint))
}

/// Backward, all-paths instantiation of the worklist engine.
pub struct FaintAnalysis;

impl Analysis for FaintAnalysis {
    type Fact = FaintFact;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn flow(&self, block: &BasicBlock, cfg: &ControlFlowGraph) -> FaintFact {
        let (gen, kill) = gen_kill(&block.instruction);
        out_fact(block, cfg).transfer(&gen, &kill)
    }

    fn join(&self, a: &FaintFact, b: &FaintFact) -> FaintFact {
        a.intersect(b)
    }

    fn weaker_than(&self, candidate: &FaintFact, current: &FaintFact) -> bool {
        candidate != current
    }

    fn fact<'a>(&self, block: &'a BasicBlock) -> &'a FaintFact {
        &block.facts.faint
    }

    fn apply(&self, block: &mut BasicBlock, fact: FaintFact) {
        block.facts.faint = fact;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::SmallVec;

    #[test]
    fn bits_gen_is_dests_kill_is_src() {
        let inst = Instruction::Bits {
            dests: SmallVec::from_slice(&[Wire(1), Wire(2), Wire(3)]),
            src: Wire(0),
        };
        let (gen, kill) = gen_kill(&inst);
        assert_eq!(gen.as_slice(), &[Wire(1), Wire(2), Wire(3)]);
        assert_eq!(kill.as_slice(), &[Wire(0)]);
    }

    #[test]
    fn join_gen_is_dest_kill_is_sources() {
        let inst = Instruction::Join {
            dest: Wire(9),
            sources: SmallVec::from_slice(&[Wire(4), Wire(5)]),
        };
        let (gen, kill) = gen_kill(&inst);
        assert_eq!(gen.as_slice(), &[Wire(9)]);
        assert_eq!(kill.as_slice(), &[Wire(4), Wire(5)]);
    }

    #[test]
    fn gates_and_arithmetic_contribute_nothing() {
        let gate = Instruction::Gate {
            dest: Wire(2),
            in1: Wire(0),
            in2: Wire(1),
            table: pcf2_bytecode::TruthTable::XOR,
        };
        let (gen, kill) = gen_kill(&gate);
        assert!(gen.is_empty());
        assert!(kill.is_empty());
    }

    #[test]
    fn top_is_intersection_identity() {
        let mut fact = FaintFact::top();
        fact = fact.transfer(&[], &[Wire(7)]);
        assert!(!fact.is_faint(Wire(7)));
        assert!(fact.is_faint(Wire(8)));

        let joined = FaintFact::top().intersect(&fact);
        assert_eq!(joined, fact);
    }

    #[test]
    fn transfer_regenerates_killed_wires() {
        let killed = FaintFact::top().transfer(&[], &[Wire(3)]);
        let regen = killed.transfer(&[Wire(3)], &[]);
        assert!(regen.is_faint(Wire(3)));
    }
}
