//! Sedra: a Lisp-syntax front end for smart contracts.
//!
//! Source text is read into S-expression forms, macro-expanded, and lowered
//! into the annotated AST the downstream contract compiler consumes. The
//! pipeline entry points are [`compile_src`] and [`compile_file`].

pub use crate::errors::{ErrorKind, SedraError};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod macros;
pub mod parser;
pub mod syntax;

pub use crate::compiler::{compile_file, compile_src, Compilation};
