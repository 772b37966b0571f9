//! Symbol and scope model.
//!
//! Every named entity lives in an arena on the type checker and is referred
//! to by a typed index:
//!
//! - `symbols`: packages, globals, structs, aliases, macros and templates
//! - `scope`: locals, block frames and loop frames of the function being
//!   lowered

pub mod scope;
pub mod symbols;
