use thiserror::Error;

/// Fatal conditions raised while building a control-flow graph.
///
/// Construction fails closed: none of these leaves a partial graph behind,
/// and no edge is ever synthesized for a target that cannot be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CfgError {
    /// The input instruction sequence was empty.
    #[error("cannot build a CFG from an empty program")]
    Empty,

    /// A branch or the entry marker names a label that does not exist.
    #[error("instruction {index} references unknown label `{label}`")]
    UnknownLabel { label: String, index: usize },

    /// A call names a function with no defining label in the program.
    #[error("call at instruction {index} references unknown function `{function}`")]
    UnknownFunction { function: String, index: usize },

    /// A return with no matching pending function label. The entry
    /// function's own return is exempt, but only as the final instruction.
    #[error("return at instruction {index} has no matching function label")]
    UnbalancedReturn { index: usize },

    /// A called function's body never reaches a return instruction.
    #[error("function `{function}` is called but never returns")]
    MissingReturn { function: String },
}
