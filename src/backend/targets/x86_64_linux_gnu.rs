use itertools::Itertools;
use tracing::{debug, warn};

use crate::{
    backend::{
        CodegenOptions,
        assemblers::x86_64::{Assembler, REGISTER_POOL, X86FullRegister, X86Register},
        layout::FrameLayout,
        peephole::LoadCache,
        targets::CodeGenerator,
    },
    middle::{
        error::InternalFault,
        iloc::{Instruction, Label, Opcode, Program, pretty_print},
    },
};

const ACCUMULATOR: X86FullRegister = X86FullRegister::Rax;

pub struct CodeGeneratorX86_64LinuxGnu;

impl CodeGenerator for CodeGeneratorX86_64LinuxGnu {
    fn translate_to_asm(
        &self,
        program: &Program,
        options: &CodegenOptions,
    ) -> Result<String, InternalFault> {
        let defines_entry = program.code.iter().any(|instruction| {
            matches!(&instruction.label, Some(Label::Function(name)) if *name == options.entry_symbol)
        });
        if !defines_entry {
            warn!(entry = %options.entry_symbol, "program does not define its entry symbol");
        }

        let global_data = program
            .globals
            .iter()
            .map(|name| {
                indoc::formatdoc! {"
                        .globl {name}
                        .align 4
                        .type {name}, @object
                        .size {name}, 4
                    {name}:
                        .zero 4",
                    name = name
                }
            })
            .join("\n");

        let text = codegen_program(program, options)?;

        Ok(indoc::formatdoc! {"
                .data
            {global_data}
                .text
            {text}    .ident \"{ident}\"
                .section .note.GNU-stack,\"\",@progbits
            ",
            global_data = global_data,
            text = text,
            ident = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
        })
    }
}

fn codegen_program(program: &Program, options: &CodegenOptions) -> Result<String, InternalFault> {
    let layout = FrameLayout::scan(&program.code, REGISTER_POOL.len() as u32);
    let mut assembler = Assembler::new(&layout);
    let mut cache = LoadCache::new();

    for instruction in &program.code {
        if let Some(label) = &instruction.label {
            cache.invalidate();

            match label {
                Label::Function(name) => {
                    debug!(%name, "lowering function");
                    assembler.global_label(name);
                    assembler.function_prologue();
                }
                Label::Generated(_) => assembler.label(label),
            }
        }

        if options.emit_debug_info {
            assembler.comment(pretty_print::plain(instruction));
        }

        let keeps_cache = codegen_instruction(&mut assembler, &mut cache, instruction)?;
        if !keeps_cache {
            cache.invalidate();
        }
    }

    Ok(assembler.into_output())
}

/// Lowers one instruction. Returns true when the accumulator is left
/// mirroring the memory location recorded in the cache.
fn codegen_instruction(
    assembler: &mut Assembler,
    cache: &mut LoadCache,
    instruction: &Instruction,
) -> Result<bool, InternalFault> {
    let eax = ACCUMULATOR.as_32_bit();
    let unsupported = || InternalFault::UnsupportedInstruction(pretty_print::plain(instruction));

    let source = |index: usize| {
        instruction
            .sources
            .get(index)
            .and_then(|operand| assembler.operand(operand))
            .ok_or_else(unsupported)
    };
    let target = |index: usize| {
        instruction
            .targets
            .get(index)
            .and_then(|operand| assembler.operand(operand))
            .ok_or_else(unsupported)
    };

    let mut lines = Vec::new();
    let mut keeps_cache = false;

    match instruction.opcode {
        Opcode::Nop => {}
        Opcode::LoadI => {
            lines.push(format!("movl {}, {}", source(0)?, target(0)?));
        }
        Opcode::I2I => {
            lines.push(format!("movl {}, %{eax}", source(0)?));
            lines.push(format!("movl %{eax}, {}", target(0)?));
        }
        Opcode::LoadAI => {
            let memory = instruction.memory_operand().ok_or_else(unsupported)?;

            if !cache.hit(&memory) {
                let address = assembler.memory(&memory).ok_or_else(unsupported)?;
                lines.push(format!("movl {address}, %{eax}"));
            }
            lines.push(format!("movl %{eax}, {}", target(0)?));

            cache.record(&memory);
            keeps_cache = true;
        }
        Opcode::StoreAI => {
            let memory = instruction.memory_operand().ok_or_else(unsupported)?;
            let address = assembler.memory(&memory).ok_or_else(unsupported)?;

            lines.push(format!("movl {}, %{eax}", source(0)?));
            lines.push(format!("movl %{eax}, {address}"));

            cache.record(&memory);
            keeps_cache = true;
        }
        opcode @ (Opcode::Add | Opcode::Sub | Opcode::Mult | Opcode::And | Opcode::Or | Opcode::Xor) => {
            let mnemonic = match opcode {
                Opcode::Add => "addl",
                Opcode::Sub => "subl",
                Opcode::Mult => "imull",
                Opcode::And => "andl",
                Opcode::Or => "orl",
                _ => "xorl",
            };

            lines.push(format!("movl {}, %{eax}", source(0)?));
            lines.push(format!("{mnemonic} {}, %{eax}", source(1)?));
            lines.push(format!("movl %{eax}, {}", target(0)?));
        }
        Opcode::Div => {
            lines.push(format!("movl {}, %{eax}", source(0)?));
            lines.push("cltd".to_owned());
            lines.push(format!("idivl {}", source(1)?));
            lines.push(format!("movl %{eax}, {}", target(0)?));
        }
        Opcode::RSubI => {
            lines.push(format!("movl {}, %{eax}", source(1)?));
            lines.push(format!("subl {}, %{eax}", source(0)?));
            lines.push(format!("movl %{eax}, {}", target(0)?));
        }
        opcode @ (Opcode::CmpLT
        | Opcode::CmpLE
        | Opcode::CmpEQ
        | Opcode::CmpGE
        | Opcode::CmpGT
        | Opcode::CmpNE) => {
            let set = match opcode {
                Opcode::CmpLT => "setl",
                Opcode::CmpLE => "setle",
                Opcode::CmpEQ => "sete",
                Opcode::CmpGE => "setge",
                Opcode::CmpGT => "setg",
                _ => "setne",
            };
            let al = X86Register::Al;

            lines.push(format!("movl {}, %{eax}", source(0)?));
            lines.push(format!("cmpl {}, %{eax}", source(1)?));
            lines.push(format!("{set} %{al}"));
            lines.push(format!("movzbl %{al}, %{eax}"));
            lines.push(format!("movl %{eax}, {}", target(0)?));
        }
        Opcode::Cbr => {
            lines.push(format!("movl {}, %{eax}", source(0)?));
            lines.push(format!("cmpl $0, %{eax}"));
            lines.push(format!("jne {}", target(0)?));
            lines.push(format!("jmp {}", target(1)?));
        }
        Opcode::JumpI => {
            lines.push(format!("jmp {}", target(0)?));
        }
        Opcode::Return => {
            if !instruction.sources.is_empty() {
                lines.push(format!("movl {}, %{eax}", source(0)?));
            }
        }
        Opcode::Load | Opcode::Store | Opcode::Jump => return Err(unsupported()),
    }

    for line in lines {
        assembler.emit(line);
    }

    if instruction.opcode == Opcode::Return {
        assembler.function_epilogue();
    }

    Ok(keeps_cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        index::Index,
        middle::{
            iloc::{Address, InstructionList, LabelId, RegisterId},
            symbol::{Location, Storage},
        },
    };

    fn r(n: usize) -> RegisterId {
        RegisterId::new(n)
    }

    fn local(offset: u32) -> Address<'static> {
        Address {
            location: Location {
                storage: Storage::Local,
                offset,
            },
            name: "v",
        }
    }

    fn lower(code: impl IntoIterator<Item = Instruction>) -> Result<Vec<String>, InternalFault> {
        let program = Program {
            code: code.into_iter().collect::<InstructionList>(),
            globals: vec![],
        };

        Ok(codegen_program(&program, &CodegenOptions::default())?
            .lines()
            .map(|line| line.trim().to_owned())
            .collect())
    }

    #[test]
    fn repeated_load_reads_memory_once() {
        let lines = lower([
            Instruction::load_offset(&local(0), r(0)),
            Instruction::load_offset(&local(0), r(1)),
        ])
        .unwrap();

        assert_eq!(
            lines,
            [
                "movl -36(%rbp), %eax",
                "movl %eax, %ebx",
                "movl %eax, %r12d",
            ]
        );
    }

    #[test]
    fn load_after_store_of_same_location_is_elided() {
        let lines = lower([
            Instruction::load_immediate(7, r(0)),
            Instruction::store_offset(r(0), &local(4)),
            Instruction::load_offset(&local(4), r(1)),
        ])
        .unwrap();

        assert_eq!(
            lines,
            [
                "movl $7, %ebx",
                "movl %ebx, %eax",
                "movl %eax, -40(%rbp)",
                "movl %eax, %r12d",
            ]
        );
    }

    #[test]
    fn store_elsewhere_between_loads_keeps_the_reload() {
        let lines = lower([
            Instruction::load_offset(&local(0), r(0)),
            Instruction::store_offset(r(0), &local(4)),
            Instruction::load_offset(&local(0), r(1)),
        ])
        .unwrap();

        assert_eq!(
            lines,
            [
                "movl -36(%rbp), %eax",
                "movl %eax, %ebx",
                "movl %ebx, %eax",
                "movl %eax, -40(%rbp)",
                "movl -36(%rbp), %eax",
                "movl %eax, %r12d",
            ]
        );
    }

    #[test]
    fn labels_and_other_instructions_invalidate_the_cache() {
        let lines = lower([
            Instruction::load_offset(&local(0), r(0)),
            Instruction::load_offset(&local(0), r(1)).with_label(Label::Generated(LabelId::new(0))),
            Instruction::copy(r(1), r(2)),
            Instruction::load_offset(&local(0), r(3)),
        ])
        .unwrap();

        let reads = lines
            .iter()
            .filter(|line| line.starts_with("movl -36(%rbp)"))
            .count();

        assert_eq!(reads, 3);
        assert!(lines.contains(&".L0:".to_owned()));
    }

    #[test]
    fn different_location_is_not_elided() {
        let lines = lower([
            Instruction::load_offset(&local(0), r(0)),
            Instruction::load_offset(&local(4), r(1)),
        ])
        .unwrap();

        assert_eq!(lines[0], "movl -36(%rbp), %eax");
        assert_eq!(lines[2], "movl -40(%rbp), %eax");
    }

    #[test]
    fn function_label_emits_prologue() {
        let lines = lower([
            Instruction::nop().with_label(Label::Function("main".into())),
            Instruction::load_immediate(0, r(0)),
            Instruction::ret(Some(r(0))),
        ])
        .unwrap();

        assert_eq!(
            lines,
            [
                ".globl main",
                ".type main, @function",
                "main:",
                "pushq %rbp",
                "movq %rsp, %rbp",
                "pushq %rbx",
                "pushq %r12",
                "pushq %r13",
                "pushq %r14",
                "movl $0, %ebx",
                "movl %ebx, %eax",
                "leaq -32(%rbp), %rsp",
                "popq %r14",
                "popq %r13",
                "popq %r12",
                "popq %rbx",
                "leave",
                "ret",
            ]
        );
    }

    #[test]
    fn spilled_registers_get_frame_slots() {
        let code: Vec<_> = (0..6).map(|n| Instruction::load_immediate(n, r(n as usize))).collect();
        let lines = lower(code).unwrap();

        assert_eq!(lines[4], "movl $4, -36(%rbp)");
        assert_eq!(lines[5], "movl $5, -40(%rbp)");
    }

    #[test]
    fn branches_and_arithmetic() {
        let lines = lower([
            Instruction::binary(Opcode::Div, r(0), r(1), r(2)),
            Instruction::reverse_subtract_immediate(r(2), 0, r(3)),
            Instruction::branch(
                r(3),
                Label::Generated(LabelId::new(1)),
                Label::Generated(LabelId::new(2)),
            ),
        ])
        .unwrap();

        assert_eq!(
            lines,
            [
                "movl %ebx, %eax",
                "cltd",
                "idivl %r12d",
                "movl %eax, %r13d",
                "movl $0, %eax",
                "subl %r13d, %eax",
                "movl %eax, %r14d",
                "movl %r14d, %eax",
                "cmpl $0, %eax",
                "jne .L1",
                "jmp .L2",
            ]
        );
    }

    #[test]
    fn comparisons_materialize_a_flag() {
        let lines = lower([Instruction::binary(Opcode::CmpLE, r(0), r(1), r(2))]).unwrap();

        assert_eq!(
            lines,
            [
                "movl %ebx, %eax",
                "cmpl %r12d, %eax",
                "setle %al",
                "movzbl %al, %eax",
                "movl %eax, %r13d",
            ]
        );
    }

    #[test]
    fn instructions_without_a_template_fail() {
        assert_eq!(
            lower([Instruction::load(r(0), r(1))]),
            Err(InternalFault::UnsupportedInstruction("load r0 => r1".into()))
        );
        assert!(lower([Instruction::store(r(0), r(1))]).is_err());
    }

    #[test]
    fn debug_info_precedes_each_instruction() {
        let program = Program {
            code: InstructionList::single(Instruction::load_immediate(3, r(0))),
            globals: vec![],
        };
        let options = CodegenOptions {
            emit_debug_info: true,
            ..Default::default()
        };

        let text = codegen_program(&program, &options).unwrap();

        assert_eq!(text, "    # loadI 3 => r0\n    movl $3, %ebx\n");
    }
}
