//! Code generation module for the compiler.
//!
//! This module turns the typed trees of a checked compilation into a
//! textual LLVM IR module. It handles:
//!
//! - The IR builder (blocks, labels, hoisted allocas, string constants)
//! - Lowering of expressions, storages and statements
//! - Struct types, globals and the `main` wrapper
//! - The bundled `std` prelude and its macro handlers
//! - Native object emission behind the `llvm` feature

pub mod builder;
pub mod compiler;
pub mod expr;
#[cfg(feature = "llvm")]
pub mod native;
pub mod stdlib;
pub mod stmt;

#[cfg(test)]
mod tests;
