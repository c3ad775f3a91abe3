//! Dead-gate elimination.
//!
//! A single rewrite pass over the converged facts. Only gate blocks are
//! candidates; everything else passes through untouched, so offering the
//! rewrite a block it does not apply to is a no-op, never an error. The
//! pass runs no re-analysis afterwards: a block that would only become
//! dead after these removals stays put until the next analyze round.

use pcf2_bytecode::Instruction;

use crate::cfg::ControlFlowGraph;
use crate::passes::faint;

/// Prune or specialize gate blocks, splicing the graph around removals.
///
/// Per gate with destination `d`:
/// - `d` faint after the gate → the gate's output reaches no output wire
///   on any path; remove the block and absorb its edges into its
///   neighbors.
/// - otherwise, `d` statically known → the gate always computes the same
///   bit; replace it in place with a constant load.
/// - otherwise → keep.
pub fn run(cfg: &mut ControlFlowGraph) {
    let ids: Vec<usize> = cfg.blocks.keys().copied().collect();
    for id in ids {
        let Some(block) = cfg.block(id) else { continue };
        let dest = match &block.instruction {
            Instruction::Gate { dest, .. } => *dest,
            _ => continue,
        };

        let dead = faint::out_fact(block, cfg).is_faint(dest);
        let known = block.facts.constants.get(dest);

        if dead {
            cfg.remove_block(id);
        } else if let Some(value) = known {
            if let Some(block) = cfg.block_mut(id) {
                block.instruction = Instruction::Const { dest, value };
            }
        }
    }
}
