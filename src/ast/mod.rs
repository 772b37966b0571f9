/// AST (Abstract Syntax Tree) module
/// Contains the syntax produced by the parser and consumed by the type checker
///
/// Submodules:
/// - ast: identifiers shared by every node family
/// - expressions: expression nodes and operators
/// - statements: statements, declarations and source modules
/// - types: type-name expressions
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
