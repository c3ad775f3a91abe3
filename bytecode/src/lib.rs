pub mod instruction;
pub mod program;

pub use instruction::{
    is_builtin, is_function_label, wire_range, Instruction, TruthTable, Wire, BUILTIN_FUNCTIONS,
    ENTRY_LABEL,
    LOCAL_LABEL_PREFIX,
};
pub use program::Program;
