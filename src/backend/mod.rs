//! The backend lowers a finished ILOC program to target assembly. The code
//! is walked once, front to back: virtual registers are mapped to a small
//! pool of physical registers or to stack slots, functions get their
//! prologue and epilogue, and redundant loads are dropped on the way.

pub mod assemblers;
pub mod layout;
pub mod peephole;
pub mod targets;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Precede every lowered instruction with its ILOC form as a comment
    pub emit_debug_info: bool,
    /// Symbol the program starts executing at
    pub entry_symbol: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            emit_debug_info: false,
            entry_symbol: "main".to_owned(),
        }
    }
}
