//! Output rendering and fatal error reporting for a finished compilation.

use colored::Colorize;

use crate::{
    backend::{
        CodegenOptions,
        targets::{CodeGenerator, Target},
    },
    middle::{ast::Node, builder::Compiler, error::CompileError, iloc::pretty_print},
};

/// What the compiler writes out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmitMode {
    /// The ILOC program, one instruction per line
    #[default]
    Iloc,
    /// x86-64 assembly for the selected target
    #[strum(serialize = "assembly", serialize = "asm")]
    Assembly,
}

/// Renders the program rooted at `root`, which gives up its code
pub fn compile_output(
    compiler: &Compiler,
    root: Option<Node>,
    mode: EmitMode,
    target: Target,
    options: &CodegenOptions,
) -> Result<String, CompileError> {
    let program = compiler.program(root);

    match mode {
        EmitMode::Iloc => Ok(pretty_print::dump(&program.code)),
        EmitMode::Assembly => Ok(target
            .get_code_generator()
            .translate_to_asm(&program, options)?),
    }
}

/// Process status for the outcome of a compilation
pub fn exit_status<T>(result: &Result<T, CompileError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(error) => error.exit_code(),
    }
}

/// Ends the process on a fatal error. The scope stack is released before the
/// diagnostic is printed.
pub fn report_fatal(compiler: &mut Compiler, error: CompileError) -> ! {
    let open_scopes = compiler.abort();
    tracing::debug!(open_scopes, "compilation aborted");

    eprintln!("{} {error}", "error:".red().bold());
    std::process::exit(error.exit_code());
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::{frontend::Token, middle::ty::Type};

    #[test]
    fn emit_mode_from_str() {
        assert_eq!(EmitMode::from_str("iloc"), Ok(EmitMode::Iloc));
        assert_eq!(EmitMode::from_str("asm"), Ok(EmitMode::Assembly));
        assert_eq!(EmitMode::from_str("Assembly"), Ok(EmitMode::Assembly));
        assert!(EmitMode::from_str("llvm").is_err());
    }

    #[test]
    fn exit_status_of_results() {
        let undeclared: Result<(), _> = Err(CompileError::Undeclared {
            name: "x".into(),
            line: 3,
        });

        assert_eq!(exit_status(&Ok::<_, CompileError>(())), 0);
        assert_eq!(exit_status(&undeclared), 10);
    }

    #[test]
    fn empty_program_renders_in_both_modes() {
        let compiler = Compiler::new();
        let options = CodegenOptions::default();

        let iloc = compile_output(&compiler, None, EmitMode::Iloc, Target::default(), &options);
        let asm = compile_output(&compiler, None, EmitMode::Assembly, Target::default(), &options)
            .unwrap();

        assert_eq!(iloc, Ok(String::new()));
        assert!(asm.contains(".text"));
        assert!(asm.contains(".note.GNU-stack"));
    }

    #[test]
    fn iloc_mode_dumps_the_root() {
        let mut compiler = Compiler::new();
        compiler.declare_function(Token::identifier("main", 1), Type::Int).unwrap();
        let value = compiler.literal(Token::integer(1, 2), Type::Int).unwrap();
        let body = compiler.return_statement(value, Type::Int).unwrap();
        let main = compiler.define_function(Some(body)).unwrap();

        let output = compile_output(
            &compiler,
            Some(main),
            EmitMode::Iloc,
            Target::x86_64LinuxGnu,
            &CodegenOptions::default(),
        )
        .unwrap();

        assert_eq!(output, "main: nop\nloadI 1 => r0\nreturn r0\n");
    }
}
