//! Classic liveness, the simpler sibling of the faint analysis.
//!
//! Same engine, opposite lattice polarity: backward direction with union
//! confluence (any-path), gen = wires read, kill = wires written. Its one
//! consumer here is [`undefined_wires`], which reports wires the program
//! may read before any instruction defines them — the downstream evaluator
//! trusts that this never happens.

use rustc_hash::FxHashSet;

use pcf2_bytecode::Wire;

use crate::cfg::{BasicBlock, ControlFlowGraph};
use crate::dataflow::{self, Analysis, Direction};

/// Wires live on entry to a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveFact(pub FxHashSet<Wire>);

impl LiveFact {
    pub fn contains(&self, wire: Wire) -> bool {
        self.0.contains(&wire)
    }

    fn union(&self, other: &Self) -> Self {
        let mut set = self.0.clone();
        set.extend(other.0.iter().copied());
        Self(set)
    }
}

/// Backward, any-path instantiation of the worklist engine.
pub struct LivenessAnalysis;

impl Analysis for LivenessAnalysis {
    type Fact = LiveFact;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn flow(&self, block: &BasicBlock, cfg: &ControlFlowGraph) -> LiveFact {
        let out = block
            .successors
            .iter()
            .filter_map(|&s| cfg.block(s))
            .fold(LiveFact::default(), |acc, succ| acc.union(&succ.facts.live));

        let mut set = out.0;
        for w in block.instruction.dest_wires() {
            set.remove(&w);
        }
        set.extend(block.instruction.used_wires());
        LiveFact(set)
    }

    fn join(&self, a: &LiveFact, b: &LiveFact) -> LiveFact {
        a.union(b)
    }

    fn weaker_than(&self, candidate: &LiveFact, current: &LiveFact) -> bool {
        candidate != current
    }

    fn fact<'a>(&self, block: &'a BasicBlock) -> &'a LiveFact {
        &block.facts.live
    }

    fn apply(&self, block: &mut BasicBlock, fact: LiveFact) {
        block.facts.live = fact;
    }
}

/// Wires live into the program entry: read somewhere before any write
/// reaches them. Sorted for stable reporting.
pub fn undefined_wires(cfg: &mut ControlFlowGraph) -> Vec<Wire> {
    dataflow::solve(cfg, &LivenessAnalysis);
    let Some(entry) = cfg.blocks.values().next() else {
        return Vec::new();
    };
    let mut wires: Vec<Wire> = entry.facts.live.0.iter().copied().collect();
    wires.sort();
    wires
}
