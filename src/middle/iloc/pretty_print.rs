use colored::Colorize;
use itertools::Itertools;

use crate::{
    index::Index,
    middle::iloc::{Instruction, InstructionList, Label, Operand, OperandKind, Register},
};

/// Renders a list one instruction per line, without color
pub fn dump(list: &InstructionList) -> String {
    list.iter().map(|instruction| plain(instruction) + "\n").collect()
}

/// A single instruction as plain text, e.g. `L2: cbr r4 -> L3, L4`
pub fn plain(instruction: &Instruction) -> String {
    strip_ansi_escapes::strip_str(instruction.to_string())
}

impl core::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}{} ", label.to_string().bright_red(), ":".white())?;
        }

        write!(f, "{}", self.opcode.to_string().cyan())?;

        if !self.sources.is_empty() {
            write!(f, " {}", self.sources.iter().join(", "))?;
        }

        if !self.targets.is_empty() {
            let arrow = if self.opcode.is_control_flow() { "->" } else { "=>" };
            write!(f, " {} {}", arrow.white(), self.targets.iter().join(", "))?;
        }

        Ok(())
    }
}

impl core::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            OperandKind::Register(register) => write!(f, "{register}"),
            OperandKind::Immediate(value) => write!(f, "{}", value.to_string().purple()),
            OperandKind::Label(label) => write!(f, "{}", label.to_string().blue()),
        }
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Register::Virtual(id) => write!(f, "{}", format!("r{}", id.index()).yellow()),
            Register::FramePointer => write!(f, "{}", "rfp".green()),
            Register::DataBase => write!(f, "{}", "rbss".green()),
        }
    }
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Generated(id) => write!(f, "L{}", id.index()),
            Label::Function(name) => write!(f, "{name}"),
        }
    }
}
