//! Stack frame layout.
//!
//! ```text
//!          +------------------+
//!          | saved %rbp       |  <- %rbp
//!          | saved pool regs  |  32 bytes
//!          | local variables  |  `locals` bytes
//!          | spilled regs     |  4 bytes each
//!          +------------------+  <- %rsp, 16 byte aligned
//! ```
//!
//! Every function of a program shares one layout, computed from a scan of
//! the whole instruction list.

use tracing::debug;

use crate::{
    index::Index,
    middle::{
        iloc::{InstructionList, Register, RegisterId},
        ty::Type,
    },
};

/// Bytes pushed below `%rbp` by the prologue to preserve the register pool
pub const SAVED_REGISTERS_SIZE: u32 = 32;

pub const STACK_ALIGNMENT: u32 = 16;

pub fn align_to(value: u32, alignment: u32) -> u32 {
    value.next_multiple_of(alignment)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameLayout {
    /// Bytes taken by local variables
    pub locals: u32,
    /// Virtual registers that did not fit in the physical pool
    pub spills: u32,
    /// Number of virtual registers held in physical registers
    pub pool_size: u32,
}

impl FrameLayout {
    /// Finds the highest virtual register and the highest local offset used
    /// anywhere in `code`
    pub fn scan(code: &InstructionList, pool_size: u32) -> Self {
        let mut registers = 0;
        let mut locals = 0;

        for instruction in code {
            for register in instruction
                .operands()
                .filter_map(|operand| operand.as_register()?.as_virtual())
            {
                registers = registers.max(register.index() as u32 + 1);
            }

            if let Some(memory) = instruction
                .memory_operand()
                .filter(|memory| *memory.base == Register::FramePointer)
            {
                locals = locals.max(memory.offset as u32 + Type::WORD_SIZE);
            }
        }

        let layout = Self {
            locals,
            spills: registers.saturating_sub(pool_size),
            pool_size,
        };

        debug!(
            registers,
            locals,
            spills = layout.spills,
            frame = layout.size(),
            "computed frame layout"
        );

        layout
    }

    /// Bytes reserved below the saved registers, rounded up to the stack
    /// alignment
    pub fn size(&self) -> u32 {
        align_to(self.locals + self.spills * Type::WORD_SIZE, STACK_ALIGNMENT)
    }

    /// `%rbp` displacement of the local variable at `offset`
    pub fn local_displacement(&self, offset: u32) -> i64 {
        -i64::from(SAVED_REGISTERS_SIZE + offset + Type::WORD_SIZE)
    }

    /// `%rbp` displacement of a spilled register, `None` if the register
    /// lives in the physical pool
    pub fn spill_displacement(&self, register: RegisterId) -> Option<i64> {
        let slot = (register.index() as u32).checked_sub(self.pool_size)?;

        Some(-i64::from(
            SAVED_REGISTERS_SIZE + self.locals + slot * Type::WORD_SIZE + Type::WORD_SIZE,
        ))
    }
}
