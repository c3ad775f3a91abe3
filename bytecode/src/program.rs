use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

/// A flat PCF2 program — an ordered sequence of instructions.
///
/// The downstream garbled-circuit evaluator consumes this directly: it
/// performs no analysis of its own and trusts that every wire it reads was
/// defined by an earlier instruction in program order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction.
    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// One past the highest wire id mentioned anywhere in the program.
    /// The evaluator sizes its wire tables from this.
    pub fn wire_bound(&self) -> u32 {
        self.instructions
            .iter()
            .map(Instruction::wire_bound)
            .max()
            .unwrap_or(0)
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
