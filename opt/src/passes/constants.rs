//! Forward constant propagation.
//!
//! Fills the constants half of each block's fact pair: the wires whose
//! values are statically known immediately after the block's instruction.
//! The elimination rewrite reads this to specialize a gate whose output is
//! already determined into a constant load.
//!
//! All-paths meet: a binding survives a merge point only when every
//! incoming path agrees on it.

use rustc_hash::FxHashMap;

use pcf2_bytecode::{Instruction, Wire};

use crate::cfg::{BasicBlock, ControlFlowGraph};
use crate::dataflow::{Analysis, Direction};

/// Statically known wire values at a program point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConstFact {
    /// Uninitialized — the meet identity for blocks not yet visited.
    #[default]
    Top,
    Known(FxHashMap<Wire, u64>),
}

impl ConstFact {
    pub fn get(&self, wire: Wire) -> Option<u64> {
        match self {
            ConstFact::Top => None,
            ConstFact::Known(map) => map.get(&wire).copied(),
        }
    }

    /// Keep only bindings both facts agree on.
    pub fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstFact::Top, x) | (x, ConstFact::Top) => x.clone(),
            (ConstFact::Known(a), ConstFact::Known(b)) => ConstFact::Known(
                a.iter()
                    .filter(|(w, v)| b.get(w) == Some(v))
                    .map(|(&w, &v)| (w, v))
                    .collect(),
            ),
        }
    }
}

/// Forward instantiation of the worklist engine.
pub struct ConstantAnalysis;

impl Analysis for ConstantAnalysis {
    type Fact = ConstFact;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn flow(&self, block: &BasicBlock, cfg: &ControlFlowGraph) -> ConstFact {
        let incoming = block
            .predecessors
            .iter()
            .filter_map(|&p| cfg.block(p))
            .fold(ConstFact::Top, |acc, pred| acc.meet(&pred.facts.constants));
        // The entry block has no predecessors; it starts with no bindings
        // rather than uninitialized.
        let incoming = match incoming {
            ConstFact::Top if block.predecessors.is_empty() => {
                ConstFact::Known(FxHashMap::default())
            }
            other => other,
        };
        transfer(&block.instruction, incoming)
    }

    fn join(&self, a: &ConstFact, b: &ConstFact) -> ConstFact {
        a.meet(b)
    }

    fn weaker_than(&self, candidate: &ConstFact, current: &ConstFact) -> bool {
        candidate != current
    }

    fn fact<'a>(&self, block: &'a BasicBlock) -> &'a ConstFact {
        &block.facts.constants
    }

    fn apply(&self, block: &mut BasicBlock, fact: ConstFact) {
        block.facts.constants = fact;
    }
}

/// Apply one instruction to the incoming bindings.
fn transfer(inst: &Instruction, incoming: ConstFact) -> ConstFact {
    let mut map = match incoming {
        // Not yet reached along any path: stay uninitialized instead of
        // manufacturing bindings for unreachable code.
        ConstFact::Top => return ConstFact::Top,
        ConstFact::Known(map) => map,
    };

    match inst {
        Instruction::Const { dest, value } => {
            map.insert(*dest, *value);
        }
        Instruction::Gate {
            dest,
            in1,
            in2,
            table,
        } => match (map.get(in1).copied(), map.get(in2).copied()) {
            (Some(a), Some(b)) => {
                map.insert(*dest, table.eval(a != 0, b != 0) as u64);
            }
            _ => {
                map.remove(dest);
            }
        },
        Instruction::Add { dest, in1, in2 } => {
            fold_binary(&mut map, *dest, *in1, *in2, u64::wrapping_add);
        }
        Instruction::Sub { dest, in1, in2 } => {
            fold_binary(&mut map, *dest, *in1, *in2, u64::wrapping_sub);
        }
        Instruction::Mul { dest, in1, in2 } => {
            fold_binary(&mut map, *dest, *in1, *in2, u64::wrapping_mul);
        }
        Instruction::Bits { dests, src } => match map.get(src).copied() {
            Some(v) => {
                for (i, d) in dests.iter().enumerate() {
                    map.insert(*d, (v >> i) & 1);
                }
            }
            None => {
                for d in dests {
                    map.remove(d);
                }
            }
        },
        Instruction::Copy { dest, src, width } => {
            for k in 0..*width {
                match map.get(&Wire(src.0 + k)).copied() {
                    Some(v) => {
                        map.insert(Wire(dest.0 + k), v);
                    }
                    None => {
                        map.remove(&Wire(dest.0 + k));
                    }
                }
            }
        }
        Instruction::CopyIndir { dest, width, .. } => {
            for k in 0..*width {
                map.remove(&Wire(dest.0 + k));
            }
        }
        // A write through a pointer can land on any wire.
        Instruction::IndirCopy { .. } => {
            map.clear();
        }
        // The I/O primitives write party inputs to frame-relative wires
        // not visible here; user calls carry their effects along the
        // callee path instead.
        Instruction::Call { function, .. } => {
            if pcf2_bytecode::is_builtin(function) {
                map.clear();
            }
        }
        Instruction::MkPtr { dest } => {
            map.remove(dest);
        }
        Instruction::Join { dest, .. } => {
            map.remove(dest);
        }
        Instruction::Label { .. }
        | Instruction::InitBase { .. }
        | Instruction::Branch { .. }
        | Instruction::Return { .. } => {}
    }

    ConstFact::Known(map)
}

fn fold_binary(
    map: &mut FxHashMap<Wire, u64>,
    dest: Wire,
    in1: Wire,
    in2: Wire,
    op: fn(u64, u64) -> u64,
) {
    match (map.get(&in1).copied(), map.get(&in2).copied()) {
        (Some(a), Some(b)) => {
            map.insert(dest, op(a, b));
        }
        _ => {
            map.remove(&dest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcf2_bytecode::TruthTable;

    fn known(bindings: &[(u32, u64)]) -> ConstFact {
        ConstFact::Known(bindings.iter().map(|&(w, v)| (Wire(w), v)).collect())
    }

    #[test]
    fn meet_keeps_agreeing_bindings_only() {
        let a = known(&[(0, 1), (1, 5)]);
        let b = known(&[(0, 1), (1, 6), (2, 9)]);
        let m = a.meet(&b);
        assert_eq!(m.get(Wire(0)), Some(1));
        assert_eq!(m.get(Wire(1)), None);
        assert_eq!(m.get(Wire(2)), None);
    }

    #[test]
    fn top_is_meet_identity() {
        let a = known(&[(3, 7)]);
        assert_eq!(ConstFact::Top.meet(&a), a);
        assert_eq!(a.meet(&ConstFact::Top), a);
    }

    #[test]
    fn gate_folds_when_inputs_known() {
        let fact = transfer(
            &Instruction::Gate {
                dest: Wire(2),
                in1: Wire(0),
                in2: Wire(1),
                table: TruthTable::AND,
            },
            known(&[(0, 1), (1, 1)]),
        );
        assert_eq!(fact.get(Wire(2)), Some(1));
    }

    #[test]
    fn gate_invalidates_when_inputs_unknown() {
        let fact = transfer(
            &Instruction::Gate {
                dest: Wire(2),
                in1: Wire(0),
                in2: Wire(1),
                table: TruthTable::AND,
            },
            known(&[(2, 1)]),
        );
        assert_eq!(fact.get(Wire(2)), None);
    }

    #[test]
    fn bits_decomposes_known_source() {
        let fact = transfer(
            &Instruction::Bits {
                dests: smallvec::SmallVec::from_slice(&[Wire(1), Wire(2), Wire(3)]),
                src: Wire(0),
            },
            known(&[(0, 0b101)]),
        );
        assert_eq!(fact.get(Wire(1)), Some(1));
        assert_eq!(fact.get(Wire(2)), Some(0));
        assert_eq!(fact.get(Wire(3)), Some(1));
    }

    #[test]
    fn pointer_write_clears_everything() {
        let fact = transfer(
            &Instruction::IndirCopy {
                ptr: Wire(9),
                src: Wire(0),
                width: 1,
            },
            known(&[(0, 1), (4, 2)]),
        );
        assert_eq!(fact, known(&[]));
    }
}
