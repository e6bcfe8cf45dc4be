//! Semantic analysis and code generation for a small imperative language.
//!
//! A parser (not part of this crate) drives a [`middle::builder::Compiler`]
//! with one construction call per grammar reduction. The compiler checks
//! declarations and types, builds the typed tree and emits ILOC alongside it.
//! The finished program is printed as ILOC or lowered to x86-64 assembly by
//! [`driver::compile_output`].

pub mod backend;
pub mod driver;
pub mod frontend;
pub mod index;
pub mod middle;
