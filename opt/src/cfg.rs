//! Control-flow graph construction from a flat PCF2 instruction stream.
//!
//! PCF2 encodes calls and returns implicitly, via labels and a call stack of
//! function names, so the builder reconstructs interprocedural edges in four
//! passes: a label/function scan, successor construction with one
//! instruction of lookahead, predecessor reconstruction, and return-edge
//! linking. The result is a single connected graph for the whole program —
//! every function body merged in, call sites joined at the callee
//! (context-insensitive).

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use pcf2_bytecode::{is_builtin, is_function_label, Instruction, Program, ENTRY_LABEL};

use crate::error::CfgError;
use crate::passes::constants::ConstFact;
use crate::passes::faint::FaintFact;
use crate::passes::liveness::LiveFact;

/// Per-block dataflow facts, updated in place while an engine converges.
#[derive(Debug, Clone, Default)]
pub struct BlockFacts {
    /// Wires with statically known values after this instruction.
    pub constants: ConstFact,
    /// Wires faint on entry to this instruction.
    pub faint: FaintFact,
    /// Wires live on entry to this instruction.
    pub live: LiveFact,
}

/// One CFG node per original instruction index.
///
/// `id` equals the instruction's position in the input sequence and never
/// changes, even after other blocks are removed around it.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: usize,
    pub instruction: Instruction,
    pub predecessors: BTreeSet<usize>,
    pub successors: BTreeSet<usize>,
    pub facts: BlockFacts,
}

impl BasicBlock {
    fn new(id: usize, instruction: Instruction) -> Self {
        Self {
            id,
            instruction,
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            facts: BlockFacts::default(),
        }
    }
}

/// The whole-program control-flow graph: an ordered map from instruction
/// index to block, plus the index of the final instruction (the entry
/// function's return).
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub blocks: IndexMap<usize, BasicBlock>,
    pub bottom: usize,
}

/// Label and function maps gathered by the first pass.
struct FunctionScan {
    labels: FxHashMap<String, usize>,
    /// Call-site index → callee name, user functions only.
    call_sites: Vec<(usize, String)>,
    /// Function name → index of its return instruction.
    returns: FxHashMap<String, usize>,
}

impl ControlFlowGraph {
    /// Build the graph. Total on well-formed input; a branch or call whose
    /// target cannot be resolved is a fatal error, never a guessed edge.
    pub fn build(instructions: &[Instruction]) -> Result<Self, CfgError> {
        if instructions.is_empty() {
            return Err(CfgError::Empty);
        }

        let scan = scan_functions(instructions)?;
        let mut blocks = build_successors(instructions, &scan)?;
        link_predecessors(&mut blocks);
        link_returns(&mut blocks, &scan, instructions.len())?;

        Ok(Self {
            blocks,
            bottom: instructions.len() - 1,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: usize) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: usize) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&id)
    }

    /// One past the highest wire id mentioned by any remaining block.
    pub fn wire_bound(&self) -> u32 {
        self.blocks
            .values()
            .map(|b| b.instruction.wire_bound())
            .max()
            .unwrap_or(0)
    }

    /// Remove a block and splice its neighbors together: every predecessor
    /// gains all of the block's successors and vice versa, so reachability
    /// through the removed block is preserved. A no-op for absent ids —
    /// the removal is never partially applied.
    pub fn remove_block(&mut self, id: usize) {
        let Some(removed) = self.blocks.shift_remove(&id) else {
            return;
        };
        for &p in &removed.predecessors {
            if let Some(pred) = self.blocks.get_mut(&p) {
                pred.successors.remove(&id);
                pred.successors
                    .extend(removed.successors.iter().filter(|&&s| s != id));
            }
        }
        for &s in &removed.successors {
            if let Some(succ) = self.blocks.get_mut(&s) {
                succ.predecessors.remove(&id);
                succ.predecessors
                    .extend(removed.predecessors.iter().filter(|&&p| p != id));
            }
        }
    }

    /// Re-emit the remaining instructions in original program order.
    pub fn to_program(&self) -> Program {
        // Blocks were inserted in ascending id order and shift_remove
        // preserves the order of the rest.
        Program::from(
            self.blocks
                .values()
                .map(|b| b.instruction.clone())
                .collect::<Vec<_>>(),
        )
    }
}

/// Pass 1: scan labels, called user functions, and return points.
///
/// Function bodies follow a call-stack discipline over label declarations:
/// a label that is neither `$`-prefixed nor the entry label pushes its name;
/// a return pops the stack and records the current index as that function's
/// return point. A return under an empty stack is the entry function's exit
/// and is only legal as the final instruction.
fn scan_functions(instructions: &[Instruction]) -> Result<FunctionScan, CfgError> {
    let mut labels = FxHashMap::default();
    let mut call_sites = Vec::new();
    let mut returns = FxHashMap::default();
    let mut stack: Vec<String> = Vec::new();

    for (i, inst) in instructions.iter().enumerate() {
        match inst {
            Instruction::Label { name } => {
                labels.insert(name.clone(), i);
                if is_function_label(name) {
                    stack.push(name.clone());
                }
            }
            Instruction::Return { .. } => match stack.pop() {
                Some(function) => {
                    returns.insert(function, i);
                }
                None if i + 1 == instructions.len() => {}
                None => return Err(CfgError::UnbalancedReturn { index: i }),
            },
            Instruction::Call { function, .. } if !is_builtin(function) => {
                call_sites.push((i, function.clone()));
            }
            _ => {}
        }
    }

    Ok(FunctionScan {
        labels,
        call_sites,
        returns,
    })
}

/// Pass 2: successor edges, one left-to-right fold with single lookahead.
fn build_successors(
    instructions: &[Instruction],
    scan: &FunctionScan,
) -> Result<IndexMap<usize, BasicBlock>, CfgError> {
    let len = instructions.len();
    let mut blocks: IndexMap<usize, BasicBlock> = IndexMap::with_capacity(len);

    for (i, inst) in instructions.iter().enumerate() {
        // Control may not fall through into another function's body.
        let next_opens_function = matches!(
            instructions.get(i + 1),
            Some(Instruction::Label { name }) if is_function_label(name)
        );
        let fallthrough = i + 1 < len && !next_opens_function;

        let mut block = BasicBlock::new(i, inst.clone());
        match inst {
            // Execution enters at `main` no matter where it sits lexically.
            Instruction::InitBase { .. } => {
                let entry = resolve_label(scan, ENTRY_LABEL, i)?;
                block.successors.insert(entry);
            }
            // Return edges are interprocedural; pass 4 wires them.
            Instruction::Return { .. } => {}
            Instruction::Branch { target, .. } => {
                if i + 1 < len {
                    block.successors.insert(i + 1);
                }
                block.successors.insert(resolve_label(scan, target, i)?);
            }
            Instruction::Call { function, .. } if !is_builtin(function) => {
                let entry =
                    scan.labels
                        .get(function.as_str())
                        .copied()
                        .ok_or_else(|| CfgError::UnknownFunction {
                            function: function.clone(),
                            index: i,
                        })?;
                if fallthrough {
                    block.successors.insert(i + 1);
                }
                block.successors.insert(entry);
            }
            // Builtin I/O calls and everything else fall straight through.
            _ => {
                if fallthrough {
                    block.successors.insert(i + 1);
                }
            }
        }
        blocks.insert(i, block);
    }

    Ok(blocks)
}

fn resolve_label(scan: &FunctionScan, label: &str, index: usize) -> Result<usize, CfgError> {
    scan.labels
        .get(label)
        .copied()
        .ok_or_else(|| CfgError::UnknownLabel {
            label: label.to_string(),
            index,
        })
}

/// Pass 3: make every edge symmetric.
fn link_predecessors(blocks: &mut IndexMap<usize, BasicBlock>) {
    let edges: Vec<(usize, usize)> = blocks
        .values()
        .flat_map(|b| b.successors.iter().map(move |&s| (b.id, s)))
        .collect();
    for (from, to) in edges {
        if let Some(block) = blocks.get_mut(&to) {
            block.predecessors.insert(from);
        }
    }
}

/// Pass 4: interprocedural return edges. Every call site links the callee's
/// return block to the instruction after the call, so a function called
/// from several sites accumulates one outgoing edge per site.
fn link_returns(
    blocks: &mut IndexMap<usize, BasicBlock>,
    scan: &FunctionScan,
    len: usize,
) -> Result<(), CfgError> {
    for (site, function) in &scan.call_sites {
        let ret = scan
            .returns
            .get(function.as_str())
            .copied()
            .ok_or_else(|| CfgError::MissingReturn {
                function: function.clone(),
            })?;
        let resume = site + 1;
        if resume >= len {
            continue;
        }
        if let Some(block) = blocks.get_mut(&ret) {
            block.successors.insert(resume);
        }
        if let Some(block) = blocks.get_mut(&resume) {
            block.predecessors.insert(ret);
        }
    }
    Ok(())
}
