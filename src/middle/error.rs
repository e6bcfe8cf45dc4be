//! Fatal compilation errors.
//!
//! Every semantic fault stops the compilation. The builder returns these as
//! `Err` values so the first fault unwinds straight to the driver, which
//! drains the scope stack and exits with [`CompileError::exit_code`].

use crate::middle::{ast::BinaryOperator, ty::Type};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("line {line}: identifier `{name}` was not declared")]
    Undeclared { name: String, line: u32 },

    #[error("line {line}: identifier `{name}` was already declared on line {previous_line}")]
    AlreadyDeclared {
        name: String,
        line: u32,
        previous_line: u32,
    },

    /// A variable was called like a function
    #[error("line {line}: variable `{name}` used as a function")]
    UsedAsFunction { name: String, line: u32 },

    /// A function was read or written like a variable
    #[error("line {line}: function `{name}` used as a variable")]
    UsedAsVariable { name: String, line: u32 },

    #[error("line {line}: incompatible types, {mismatch}")]
    TypeMismatch { mismatch: TypeMismatch, line: u32 },

    #[error(
        "line {line}: call to `{name}` is missing arguments (expected {expected}, received {received})"
    )]
    TooFewArgs {
        name: String,
        line: u32,
        expected: usize,
        received: usize,
    },

    #[error(
        "line {line}: call to `{name}` has too many arguments (expected {expected}, received {received})"
    )]
    TooManyArgs {
        name: String,
        line: u32,
        expected: usize,
        received: usize,
    },

    #[error(
        "line {line}: argument {} of call to `{name}` has type {received}, expected {expected}",
        index + 1
    )]
    ArgTypeMismatch {
        name: String,
        line: u32,
        /// Zero based argument position
        index: usize,
        expected: Type,
        received: Type,
    },

    #[error("internal compiler fault: {0}")]
    Internal(#[from] InternalFault),
}

impl CompileError {
    pub const EXIT_UNDECLARED: i32 = 10;
    pub const EXIT_DECLARED: i32 = 11;
    pub const EXIT_VARIABLE: i32 = 20;
    pub const EXIT_FUNCTION: i32 = 21;
    pub const EXIT_WRONG_TYPE: i32 = 30;
    pub const EXIT_MISSING_ARGS: i32 = 40;
    pub const EXIT_EXCESS_ARGS: i32 = 41;
    pub const EXIT_WRONG_TYPE_ARGS: i32 = 42;
    pub const EXIT_INTERNAL: i32 = 1;

    /// Process status reported when this error ends the compilation
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Undeclared { .. } => Self::EXIT_UNDECLARED,
            CompileError::AlreadyDeclared { .. } => Self::EXIT_DECLARED,
            CompileError::UsedAsFunction { .. } => Self::EXIT_VARIABLE,
            CompileError::UsedAsVariable { .. } => Self::EXIT_FUNCTION,
            CompileError::TypeMismatch { .. } => Self::EXIT_WRONG_TYPE,
            CompileError::TooFewArgs { .. } => Self::EXIT_MISSING_ARGS,
            CompileError::TooManyArgs { .. } => Self::EXIT_EXCESS_ARGS,
            CompileError::ArgTypeMismatch { .. } => Self::EXIT_WRONG_TYPE_ARGS,
            CompileError::Internal(_) => Self::EXIT_INTERNAL,
        }
    }

    /// Source line the error points at, if it has one
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Undeclared { line, .. }
            | CompileError::AlreadyDeclared { line, .. }
            | CompileError::UsedAsFunction { line, .. }
            | CompileError::UsedAsVariable { line, .. }
            | CompileError::TypeMismatch { line, .. }
            | CompileError::TooFewArgs { line, .. }
            | CompileError::TooManyArgs { line, .. }
            | CompileError::ArgTypeMismatch { line, .. } => Some(*line),
            CompileError::Internal(fault) => fault.line(),
        }
    }

    pub(crate) fn type_mismatch(line: u32, mismatch: TypeMismatch) -> Self {
        CompileError::TypeMismatch { mismatch, line }
    }
}

/// The construct in which two types failed to agree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeMismatch {
    #[error("expression `{lhs} {operator} {rhs}`")]
    BinaryOperation {
        operator: BinaryOperator,
        lhs: Type,
        rhs: Type,
    },

    #[error("assigning {expression} to `{name}` of type {variable}")]
    Assignment {
        name: String,
        variable: Type,
        expression: Type,
    },

    #[error("initializing `{name}` of type {variable} with {expression}")]
    Initialization {
        name: String,
        variable: Type,
        expression: Type,
    },

    #[error("returned expression has type {expression} but the return declares {declared}")]
    ReturnExpression { expression: Type, declared: Type },

    #[error(
        "return declares {declared} but the function returns {}",
        .function.map_or_else(|| "no value".to_owned(), |ty| ty.to_string())
    )]
    ReturnFunction {
        declared: Type,
        function: Option<Type>,
    },

    #[error("if branch has type {positive} but else branch has type {negative}")]
    IfElse { positive: Type, negative: Type },
}

/// Violations of the core's own invariants. These are never caused by a
/// well-formed stream of construction calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalFault {
    #[error("scope stack used before a scope was pushed")]
    ScopeStackEmpty,

    #[error("parameters bound outside of a function scope")]
    NoEnclosingFunction,

    #[error("line {line}: operand produces no value to compute with")]
    ValuelessOperand { line: u32 },

    #[error("line {line}: `{lexeme}` is not a valid integer literal")]
    MalformedLiteral { lexeme: String, line: u32 },

    #[error("instruction `{0}` has no lowering template")]
    UnsupportedInstruction(String),
}

impl InternalFault {
    fn line(&self) -> Option<u32> {
        match self {
            InternalFault::ValuelessOperand { line }
            | InternalFault::MalformedLiteral { line, .. } => Some(*line),
            _ => None,
        }
    }
}
