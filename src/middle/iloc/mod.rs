//! ILOC, the three-address intermediate representation. Loops and
//! conditionals are already flattened to labels and branches, and expression
//! trees to a linear sequence of register operations.

use crate::{
    index::simple_index,
    middle::symbol::{Location, Storage},
};

mod list;
pub mod pretty_print;

pub use list::{Concat, InstructionList};

/// A finished compilation unit, ready to be lowered
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub code: InstructionList,
    /// Global variables in declaration order
    pub globals: Vec<String>,
}

simple_index! {
    /// Identifies a virtual register which holds a temporary value
    pub struct RegisterId;
}

simple_index! {
    /// Identifies a label generated for control flow
    pub struct LabelId;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Register {
    Virtual(RegisterId),
    /// `rfp`, base of the current stack frame
    FramePointer,
    /// `rbss`, base of the global data segment
    DataBase,
}

impl Register {
    /// Base register used to address variables of a storage class
    pub fn base_of(storage: Storage) -> Self {
        match storage {
            Storage::Global => Register::DataBase,
            Storage::Local => Register::FramePointer,
        }
    }

    pub fn as_virtual(&self) -> Option<RegisterId> {
        match self {
            Register::Virtual(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<RegisterId> for Register {
    fn from(id: RegisterId) -> Self {
        Register::Virtual(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// Internal control flow target
    Generated(LabelId),
    /// Entry point of a user function
    Function(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Opcode {
    #[strum(serialize = "nop")]
    Nop,
    #[strum(serialize = "loadI")]
    LoadI,
    #[strum(serialize = "load")]
    Load,
    #[strum(serialize = "loadAI")]
    LoadAI,
    #[strum(serialize = "store")]
    Store,
    #[strum(serialize = "storeAI")]
    StoreAI,
    #[strum(serialize = "i2i")]
    I2I,
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "sub")]
    Sub,
    #[strum(serialize = "mult")]
    Mult,
    #[strum(serialize = "div")]
    Div,
    #[strum(serialize = "rsubI")]
    RSubI,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "xor")]
    Xor,
    #[strum(serialize = "cmp_LT")]
    CmpLT,
    #[strum(serialize = "cmp_LE")]
    CmpLE,
    #[strum(serialize = "cmp_EQ")]
    CmpEQ,
    #[strum(serialize = "cmp_GE")]
    CmpGE,
    #[strum(serialize = "cmp_GT")]
    CmpGT,
    #[strum(serialize = "cmp_NE")]
    CmpNE,
    #[strum(serialize = "cbr")]
    Cbr,
    #[strum(serialize = "jump")]
    Jump,
    #[strum(serialize = "jumpI")]
    JumpI,
    #[strum(serialize = "return")]
    Return,
}

impl Opcode {
    /// Control flow opcodes print their targets after `->` instead of `=>`
    pub fn is_control_flow(self) -> bool {
        matches!(self, Opcode::Cbr | Opcode::Jump | Opcode::JumpI)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    Register(Register),
    Immediate(i32),
    Label(Label),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    /// Name of the global variable an offset operand refers to, so the
    /// backend can address it by symbol instead of by offset
    pub global: Option<String>,
}

impl Operand {
    pub fn register(register: impl Into<Register>) -> Self {
        Self {
            kind: OperandKind::Register(register.into()),
            global: None,
        }
    }

    pub fn immediate(value: i32) -> Self {
        Self {
            kind: OperandKind::Immediate(value),
            global: None,
        }
    }

    pub fn label(label: Label) -> Self {
        Self {
            kind: OperandKind::Label(label),
            global: None,
        }
    }

    fn offset(offset: u32, global: Option<&str>) -> Self {
        Self {
            kind: OperandKind::Immediate(offset as i32),
            global: global.map(str::to_owned),
        }
    }

    pub fn as_register(&self) -> Option<&Register> {
        match &self.kind {
            OperandKind::Register(register) => Some(register),
            _ => None,
        }
    }

    pub fn as_immediate(&self) -> Option<i32> {
        match self.kind {
            OperandKind::Immediate(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&Label> {
        match &self.kind {
            OperandKind::Label(label) => Some(label),
            _ => None,
        }
    }
}

/// A variable's address as seen by `loadAI`/`storeAI`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address<'a> {
    pub location: Location,
    /// Symbol name, recorded for globals only
    pub name: &'a str,
}

impl Address<'_> {
    fn operands(&self) -> [Operand; 2] {
        let global = (self.location.storage == Storage::Global).then_some(self.name);

        [
            Operand::register(Register::base_of(self.location.storage)),
            Operand::offset(self.location.offset, global),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub sources: Vec<Operand>,
    pub targets: Vec<Operand>,
    pub label: Option<Label>,
}

impl Instruction {
    pub fn new(opcode: Opcode, sources: Vec<Operand>, targets: Vec<Operand>) -> Self {
        Self {
            opcode,
            sources,
            targets,
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    /// `nop`, usually carrying a label
    pub fn nop() -> Self {
        Self::new(Opcode::Nop, vec![], vec![])
    }

    /// `loadI value => destination`
    pub fn load_immediate(value: i32, destination: RegisterId) -> Self {
        Self::new(
            Opcode::LoadI,
            vec![Operand::immediate(value)],
            vec![Operand::register(destination)],
        )
    }

    /// `load address => destination`
    pub fn load(address: RegisterId, destination: RegisterId) -> Self {
        Self::new(
            Opcode::Load,
            vec![Operand::register(address)],
            vec![Operand::register(destination)],
        )
    }

    /// `loadAI base, offset => destination`
    pub fn load_offset(address: &Address, destination: RegisterId) -> Self {
        Self::new(
            Opcode::LoadAI,
            address.operands().into(),
            vec![Operand::register(destination)],
        )
    }

    /// `store source => address`
    pub fn store(source: RegisterId, address: RegisterId) -> Self {
        Self::new(
            Opcode::Store,
            vec![Operand::register(source)],
            vec![Operand::register(address)],
        )
    }

    /// `storeAI source => base, offset`
    pub fn store_offset(source: RegisterId, address: &Address) -> Self {
        Self::new(
            Opcode::StoreAI,
            vec![Operand::register(source)],
            address.operands().into(),
        )
    }

    /// `i2i source => destination`
    pub fn copy(source: RegisterId, destination: RegisterId) -> Self {
        Self::new(
            Opcode::I2I,
            vec![Operand::register(source)],
            vec![Operand::register(destination)],
        )
    }

    /// Two register operation such as `add lhs, rhs => destination`
    pub fn binary(opcode: Opcode, lhs: RegisterId, rhs: RegisterId, destination: RegisterId) -> Self {
        Self::new(
            opcode,
            vec![Operand::register(lhs), Operand::register(rhs)],
            vec![Operand::register(destination)],
        )
    }

    /// `rsubI source, value => destination`, computing `value - source`
    pub fn reverse_subtract_immediate(
        source: RegisterId,
        value: i32,
        destination: RegisterId,
    ) -> Self {
        Self::new(
            Opcode::RSubI,
            vec![Operand::register(source), Operand::immediate(value)],
            vec![Operand::register(destination)],
        )
    }

    /// `cbr condition -> positive, negative`
    pub fn branch(condition: RegisterId, positive: Label, negative: Label) -> Self {
        Self::new(
            Opcode::Cbr,
            vec![Operand::register(condition)],
            vec![Operand::label(positive), Operand::label(negative)],
        )
    }

    /// `jumpI -> destination`
    pub fn jump(destination: Label) -> Self {
        Self::new(Opcode::JumpI, vec![], vec![Operand::label(destination)])
    }

    /// `return value`
    pub fn ret(value: Option<RegisterId>) -> Self {
        Self::new(
            Opcode::Return,
            value.into_iter().map(Operand::register).collect(),
            vec![],
        )
    }

    /// Every operand, sources first
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.sources.iter().chain(&self.targets)
    }

    /// The memory location read by `loadAI` or written by `storeAI`
    pub fn memory_operand(&self) -> Option<MemoryOperand<'_>> {
        let operands = match self.opcode {
            Opcode::LoadAI => &self.sources,
            Opcode::StoreAI => &self.targets,
            _ => return None,
        };

        let [base, offset] = operands.as_slice() else {
            return None;
        };

        Some(MemoryOperand {
            base: base.as_register()?,
            offset: offset.as_immediate()?,
            global: offset.global.as_deref(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperand<'a> {
    pub base: &'a Register,
    pub offset: i32,
    pub global: Option<&'a str>,
}
