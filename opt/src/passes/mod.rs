pub mod constants;
pub mod eliminate;
pub mod faint;
pub mod liveness;

use pcf2_bytecode::{Instruction, Program, Wire};

use crate::cfg::ControlFlowGraph;
use crate::dataflow;
use crate::error::CfgError;

/// Run the full optimization pipeline on a program.
///
/// Builds the interprocedural CFG, converges constant propagation and the
/// faint-variable analysis, applies one dead-gate elimination pass, and
/// re-emits the surviving instructions in program order.
pub fn optimize(instructions: &[Instruction]) -> Result<Program, CfgError> {
    let mut cfg = ControlFlowGraph::build(instructions)?;
    optimize_cfg(&mut cfg);
    Ok(cfg.to_program())
}

/// The analyze-then-eliminate round on an already-built graph.
pub fn optimize_cfg(cfg: &mut ControlFlowGraph) {
    dataflow::solve(cfg, &constants::ConstantAnalysis);
    dataflow::solve(cfg, &faint::FaintAnalysis);
    eliminate::run(cfg);
}

/// Run the liveness check and report wires the program may read before
/// any instruction defines them.
pub fn analyze(instructions: &[Instruction]) -> Result<Vec<Wire>, CfgError> {
    let mut cfg = ControlFlowGraph::build(instructions)?;
    Ok(liveness::undefined_wires(&mut cfg))
}
