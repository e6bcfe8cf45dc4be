//! Semantic analysis and intermediate code. The parser drives a
//! [`builder::Compiler`] which resolves names, checks types and builds the
//! ILOC code of every construct as it goes.

pub mod ast;
pub mod builder;
pub mod error;
pub mod iloc;
pub mod scope;
pub mod symbol;
pub mod ty;
