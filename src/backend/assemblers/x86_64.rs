use crate::{
    backend::layout::FrameLayout,
    index::Index,
    middle::iloc::{Label, MemoryOperand, Operand, OperandKind, Register, RegisterId},
};

/// Callee-saved registers holding the lowest numbered virtual registers
pub const REGISTER_POOL: [X86FullRegister; 4] = [
    X86FullRegister::Rbx,
    X86FullRegister::R12,
    X86FullRegister::R13,
    X86FullRegister::R14,
];

/// Writes AT&T syntax assembly text
pub struct Assembler<'a> {
    output: String,
    layout: &'a FrameLayout,
}

impl<'a> Assembler<'a> {
    pub fn new(layout: &'a FrameLayout) -> Self {
        Self {
            output: String::new(),
            layout,
        }
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn push_line(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
        self.output.push('\n');
    }

    pub fn emit(&mut self, string: impl AsRef<str>) {
        self.output.push_str("    ");
        self.push_line(string);
    }

    pub fn global_label(&mut self, name: &str) {
        self.emit(format!(".globl {name}"));
        self.emit(format!(".type {name}, @function"));
        self.push_line(format!("{name}:"));
    }

    pub fn label(&mut self, label: &Label) {
        self.push_line(format!("{}:", label_name(label)));
    }

    pub fn comment(&mut self, comment: impl AsRef<str>) {
        self.emit(format!("# {}", comment.as_ref()));
    }

    pub fn function_prologue(&mut self) {
        self.emit("pushq %rbp");
        self.emit("movq %rsp, %rbp");

        for register in REGISTER_POOL {
            self.emit(format!("pushq %{register}"));
        }

        let frame_size = self.layout.size();
        if frame_size > 0 {
            self.emit(format!("subq ${frame_size}, %rsp"));
        }
    }

    /// Restores the pool registers and returns. `%rsp` is first moved back
    /// to the last saved register, since the frame below it is still
    /// allocated.
    pub fn function_epilogue(&mut self) {
        self.emit(format!("leaq -{}(%rbp), %rsp", REGISTER_POOL.len() * 8));

        for register in REGISTER_POOL.iter().rev() {
            self.emit(format!("popq %{register}"));
        }

        self.emit("leave");
        self.emit("ret");
    }

    /// Where a virtual register lives: a pool register or a stack slot
    pub fn register(&self, register: RegisterId) -> String {
        match self.layout.spill_displacement(register) {
            Some(displacement) => format!("{displacement}(%rbp)"),
            None => format!("%{}", REGISTER_POOL[register.index()].as_32_bit()),
        }
    }

    /// An operand usable as an instruction argument. Base registers have no
    /// value of their own and are only valid inside a memory operand.
    pub fn operand(&self, operand: &Operand) -> Option<String> {
        match &operand.kind {
            OperandKind::Immediate(value) => Some(format!("${value}")),
            OperandKind::Label(label) => Some(label_name(label)),
            OperandKind::Register(Register::Virtual(register)) => Some(self.register(*register)),
            OperandKind::Register(Register::FramePointer | Register::DataBase) => None,
        }
    }

    /// A variable in memory. Globals are addressed by name, locals by their
    /// frame displacement.
    pub fn memory(&self, memory: &MemoryOperand) -> Option<String> {
        match memory.base {
            Register::DataBase => memory.global.map(|name| format!("{name}(%rip)")),
            Register::FramePointer => Some(format!(
                "{}(%rbp)",
                self.layout
                    .local_displacement(u32::try_from(memory.offset).ok()?)
            )),
            Register::Virtual(_) => None,
        }
    }
}

/// Generated labels get the assembler-local `.L` prefix
pub fn label_name(label: &Label) -> String {
    match label {
        Label::Generated(id) => format!(".L{}", id.index()),
        Label::Function(name) => name.clone(),
    }
}

/// General Purpose Register 64-bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum X86FullRegister {
    Rax,
    Rbx,
    R12,
    R13,
    R14,
}

impl X86FullRegister {
    pub fn as_32_bit(self) -> X86Register {
        match self {
            Self::Rax => X86Register::Eax,
            Self::Rbx => X86Register::Ebx,
            Self::R12 => X86Register::R12d,
            Self::R13 => X86Register::R13d,
            Self::R14 => X86Register::R14d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[rustfmt::skip]
pub enum X86Register {
    // 32-bit
    Eax, Ebx, R12d, R13d, R14d,

    // 8-bit low
    Al,
}
