//! Parser module for building an Abstract Syntax Tree (AST).
//!
//! This module contains the parser that transforms a stream of tokens
//! into a source module. It uses a Pratt parser for expressions with
//! proper operator precedence and handles:
//!
//! - Top-level declarations (functions, structs, globals, aliases, macros,
//!   template prefixes)
//! - Statement parsing (declarations, assignments, control flow, labels)
//! - Expression parsing (operators, calls, initializers, `new`, macro calls)
//! - Type parsing for type annotations
//!
//! The parser uses NUD (null denotation) and LED (left denotation) functions
//! for expression parsing with binding power for precedence handling.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;
