//! The PCF2 instruction set.
//!
//! A PCF2 program is a flat, ordered list of instructions that describes a
//! boolean circuit with named wires. Control flow (calls, returns, branches)
//! is encoded through labels and a frame base pointer; everything else is
//! arithmetic or gate logic over wires. Width-bearing instructions (`Copy`,
//! `CopyIndir`, `IndirCopy`) operate on the contiguous wire range
//! `[base, base + width)`.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A wire — a named value slot in the circuit.
///
/// Wire identifiers are non-negative integers, unique within a program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Wire(pub u32);

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// A two-input boolean gate truth table.
///
/// The entry for inputs `(a, b)` lives at bit `3 - (2a + b)`, so a literal
/// reads left to right as the conventional `t00 t01 t10 t11` string:
/// AND is `0b0001`, XOR is `0b0110`, OR is `0b0111`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthTable(pub u8);

impl TruthTable {
    pub const AND: TruthTable = TruthTable(0b0001);
    pub const XOR: TruthTable = TruthTable(0b0110);
    pub const OR: TruthTable = TruthTable(0b0111);

    /// Evaluate the table for the given inputs.
    pub fn eval(self, a: bool, b: bool) -> bool {
        let entry = ((a as u8) << 1) | (b as u8);
        (self.0 >> (3 - entry)) & 1 == 1
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04b}", self.0 & 0b1111)
    }
}

/// The four reserved I/O primitives: two input providers and two output
/// sinks, one pair per party. Calls to these are ordinary non-branching
/// instructions, never interprocedural control transfers. This set is
/// closed and fixed, not configurable.
pub const BUILTIN_FUNCTIONS: [&str; 4] = ["alice", "bob", "output_alice", "output_bob"];

/// The designated program-entry label.
pub const ENTRY_LABEL: &str = "main";

/// Prefix marking compiler-generated local labels (branch targets). Such
/// labels never open a function body.
pub const LOCAL_LABEL_PREFIX: char = '$';

/// Returns true if `name` is one of the four reserved I/O primitives.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_FUNCTIONS.contains(&name)
}

/// Returns true if a label with this name opens a function body: anything
/// that is neither a local branch target nor the program entry.
pub fn is_function_label(name: &str) -> bool {
    !name.starts_with(LOCAL_LABEL_PREFIX) && name != ENTRY_LABEL
}

/// A single PCF2 instruction.
///
/// This is the complete ISA — a closed set. Analyses match on it
/// exhaustively, so an instruction with no effect on some analysis is an
/// explicit match arm, never an implicit fallthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// A named position in the instruction stream.
    Label { name: String },
    /// The program-entry marker. Sets the initial frame base; control
    /// proceeds at the `main` label regardless of lexical position.
    InitBase { base: u32 },
    /// Conditional jump to `target` when `cond` is non-zero.
    Branch { cond: Wire, target: String },
    /// Function call: shifts the frame base to `base` and transfers to
    /// `function`'s entry label. Calls to the reserved I/O primitives are
    /// plain instructions instead.
    Call { base: u32, function: String },
    /// Return from the current function.
    Return { value: Wire },
    /// dest = value
    Const { dest: Wire, value: u64 },
    /// Two's-complement bit decomposition: dests[i] = bit i of src.
    Bits {
        dests: SmallVec<[Wire; 8]>,
        src: Wire,
    },
    /// Two-input boolean gate: dest = table(in1, in2).
    Gate {
        dest: Wire,
        in1: Wire,
        in2: Wire,
        table: TruthTable,
    },
    /// dest = in1 + in2
    Add { dest: Wire, in1: Wire, in2: Wire },
    /// dest = in1 - in2
    Sub { dest: Wire, in1: Wire, in2: Wire },
    /// dest = in1 * in2
    Mul { dest: Wire, in1: Wire, in2: Wire },
    /// Range copy: dest[0..width] = src[0..width].
    Copy { dest: Wire, src: Wire, width: u32 },
    /// Pointer read: dest[0..width] = (*ptr)[0..width].
    CopyIndir { dest: Wire, ptr: Wire, width: u32 },
    /// Pointer write: (*ptr)[0..width] = src[0..width].
    IndirCopy { ptr: Wire, src: Wire, width: u32 },
    /// dest = a pointer to dest's own frame slot.
    MkPtr { dest: Wire },
    /// Multiplexer-style join of several source wires into dest.
    Join {
        dest: Wire,
        sources: SmallVec<[Wire; 4]>,
    },
}

impl Instruction {
    /// The wires this instruction writes, statically known. Writes through
    /// a pointer (`IndirCopy`) have no static destination and report none.
    pub fn dest_wires(&self) -> SmallVec<[Wire; 8]> {
        match self {
            Instruction::Const { dest, .. }
            | Instruction::Gate { dest, .. }
            | Instruction::Add { dest, .. }
            | Instruction::Sub { dest, .. }
            | Instruction::Mul { dest, .. }
            | Instruction::MkPtr { dest }
            | Instruction::Join { dest, .. } => SmallVec::from_slice(&[*dest]),
            Instruction::Bits { dests, .. } => SmallVec::from_slice(dests),
            Instruction::Copy { dest, width, .. }
            | Instruction::CopyIndir { dest, width, .. } => wire_range(*dest, *width),
            Instruction::Label { .. }
            | Instruction::InitBase { .. }
            | Instruction::Branch { .. }
            | Instruction::Call { .. }
            | Instruction::Return { .. }
            | Instruction::IndirCopy { .. } => SmallVec::new(),
        }
    }

    /// The wires this instruction reads.
    pub fn used_wires(&self) -> SmallVec<[Wire; 8]> {
        match self {
            Instruction::Gate { in1, in2, .. }
            | Instruction::Add { in1, in2, .. }
            | Instruction::Sub { in1, in2, .. }
            | Instruction::Mul { in1, in2, .. } => SmallVec::from_slice(&[*in1, *in2]),
            Instruction::Bits { src, .. } => SmallVec::from_slice(&[*src]),
            Instruction::Branch { cond, .. } => SmallVec::from_slice(&[*cond]),
            Instruction::Return { value } => SmallVec::from_slice(&[*value]),
            Instruction::Copy { src, width, .. } => wire_range(*src, *width),
            Instruction::CopyIndir { ptr, .. } => SmallVec::from_slice(&[*ptr]),
            Instruction::IndirCopy { ptr, src, width } => {
                let mut wires = wire_range(*src, *width);
                wires.push(*ptr);
                wires
            }
            Instruction::Join { sources, .. } => SmallVec::from_slice(sources),
            Instruction::Label { .. }
            | Instruction::InitBase { .. }
            | Instruction::Call { .. }
            | Instruction::Const { .. }
            | Instruction::MkPtr { .. } => SmallVec::new(),
        }
    }

    /// One past the highest wire id this instruction mentions, or 0 if it
    /// mentions none.
    pub fn wire_bound(&self) -> u32 {
        self.dest_wires()
            .iter()
            .chain(self.used_wires().iter())
            .map(|w| w.0 + 1)
            .max()
            .unwrap_or(0)
    }
}

/// The contiguous wire range `[base, base + width)`.
pub fn wire_range(base: Wire, width: u32) -> SmallVec<[Wire; 8]> {
    (base.0..base.0 + width).map(Wire).collect()
}
