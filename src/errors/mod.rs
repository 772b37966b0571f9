//! Diagnostics for the compiler.
//!
//! This module defines the diagnostics raised throughout compilation:
//!
//! - `Error`: a fatal diagnostic with its source span and an optional
//!   cross-referenced span (earlier declaration, move site)
//! - `ErrorImpl`: the closed set of error variants and their messages
//! - `Warning`: non-fatal diagnostics collected while compiling
//! - `report`: rendering of diagnostics against the source text

pub mod errors;
pub mod report;

#[cfg(test)]
mod tests;
