//! Optimizing pass over PCF2 circuit bytecode.
//!
//! The pipeline: reconstruct a whole-program control-flow graph from the
//! flat instruction stream (calls and returns are implicit, encoded via
//! labels and a call-stack discipline), converge dataflow analyses on a
//! generic worklist engine, and prune or specialize gates that provably
//! carry no information to any output.

pub mod cfg;
pub mod dataflow;
pub mod error;
pub mod passes;

pub use cfg::{BasicBlock, BlockFacts, ControlFlowGraph};
pub use dataflow::{solve, Analysis, Direction};
pub use error::CfgError;
pub use passes::{analyze, optimize};
