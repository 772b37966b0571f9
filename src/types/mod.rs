//! Semantic types.
//!
//! - `Type`: the closed set of value types (integers, bool, void, function,
//!   owner and shared pointers, arrays, structs)
//! - `AliasedType`: a type plus the alias name it was written with
//! - `ConstValue`: compile-time values carried by constant expressions

pub mod types;

#[cfg(test)]
mod tests;
