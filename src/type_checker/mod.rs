//! Type checking and semantic analysis module.
//!
//! This module lowers parsed source modules into typed trees while:
//!
//! - Registering packages, globals, structs, aliases, macros and templates
//! - Resolving names, types and struct layouts on demand
//! - Instantiating templates with a per-template instance cache
//! - Checking expressions, coercions and constant folding
//! - Tracking ownership of unique values and their release points
//! - Detecting unreachable code and missing returns
//!
//! The `TypeChecker` is the compilation context: it owns every arena and
//! queue, and the lowering functions thread it through explicitly.

pub mod control_flow;
pub mod expr;
pub mod members;
pub mod ownership;
pub mod resolve;
pub mod stmt;
pub mod templates;
pub mod type_checker;
pub mod typed_ast;

#[cfg(test)]
mod tests;
