//! A direction-agnostic worklist fixpoint engine.
//!
//! Chaotic iteration over the CFG: pop a block, recompute its fact from its
//! neighbors, store it, and re-enqueue any neighbor whose fact the new value
//! would change. Termination holds for any monotone transfer/join pair over
//! a finite-height lattice; every re-enqueue is a strict step toward the
//! fixpoint.
//!
//! The engine itself knows nothing about what a fact means. The faint
//! analysis, constant propagation, and local liveness are all
//! instantiations of the same loop, differing only in the supplied
//! [`Analysis`] implementation.

use std::collections::VecDeque;

use crate::cfg::{BasicBlock, ControlFlowGraph};

/// Which way facts propagate. A backward analysis pushes changes to
/// predecessors, a forward analysis to successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One dataflow problem: a transfer function, a confluence operator, an
/// ordering test, and accessors for the per-block fact slot it owns.
pub trait Analysis {
    type Fact: Clone;

    fn direction(&self) -> Direction;

    /// Recompute the block's fact from its neighbors' stored facts. The
    /// result is a fresh value; stored facts only change through
    /// [`Analysis::apply`], so a fact read earlier in the same step is
    /// never retroactively modified.
    fn flow(&self, block: &BasicBlock, cfg: &ControlFlowGraph) -> Self::Fact;

    /// Confluence of two facts.
    fn join(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact;

    /// True if storing `candidate` over `current` would be a strict change
    /// toward the fixpoint.
    fn weaker_than(&self, candidate: &Self::Fact, current: &Self::Fact) -> bool;

    fn fact<'a>(&self, block: &'a BasicBlock) -> &'a Self::Fact;

    fn apply(&self, block: &mut BasicBlock, fact: Self::Fact);
}

/// Run `analysis` to its fixpoint, updating facts in place.
///
/// The worklist is FIFO and seeded with every block id — ascending for
/// backward problems, descending for forward ones. The ordering is a
/// convergence heuristic only; correctness does not depend on it.
pub fn solve<A: Analysis>(cfg: &mut ControlFlowGraph, analysis: &A) {
    let mut worklist: VecDeque<usize> = match analysis.direction() {
        Direction::Backward => cfg.blocks.keys().copied().collect(),
        Direction::Forward => cfg.blocks.keys().rev().copied().collect(),
    };

    // Monotonicity bounds fact changes per block by the lattice height,
    // which the wire count bounds in turn; each change enqueues at most one
    // entry per edge. Exceeding this budget means a non-monotone
    // instantiation — an internal invariant violation, not a recoverable
    // condition.
    let edges: usize = cfg
        .blocks
        .values()
        .map(|b| b.predecessors.len() + b.successors.len())
        .sum();
    let budget = (cfg.len() + edges + 1) * (cfg.wire_bound() as usize + 4) * 4;
    let mut steps = 0usize;

    while let Some(id) = worklist.pop_front() {
        steps += 1;
        assert!(
            steps <= budget,
            "dataflow engine exceeded its iteration budget ({budget}): non-monotone analysis"
        );

        let Some(block) = cfg.block(id) else { continue };
        let new_fact = analysis.flow(block, cfg);

        // Neighbors hear about this block only when its own fact strictly
        // changed; without that guard, two blocks whose facts disagree at
        // the fixpoint re-enqueue each other around a loop forever.
        if !analysis.weaker_than(&new_fact, analysis.fact(block)) {
            continue;
        }

        let neighbors: Vec<usize> = match analysis.direction() {
            Direction::Backward => block.predecessors.iter().copied().collect(),
            Direction::Forward => block.successors.iter().copied().collect(),
        };

        if let Some(block) = cfg.block_mut(id) {
            analysis.apply(block, new_fact.clone());
        }

        for n in neighbors {
            let Some(neighbor) = cfg.block(n) else { continue };
            let current = analysis.fact(neighbor);
            let joined = analysis.join(&new_fact, current);
            if analysis.weaker_than(&joined, current) {
                worklist.push_back(n);
            }
        }
    }
}
