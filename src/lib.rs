#![allow(clippy::module_inception)]

use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::statements::SourceModule,
    compiler::{compiler::emit_module, stdlib::STD_PRELUDE},
    config::CompileOptions,
    errors::errors::{Error, Warning},
    lexer::lexer::tokenize,
    parser::parser::parse,
    type_checker::type_checker::TypeChecker,
};

pub mod ast;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod symbols;
pub mod type_checker;
pub mod types;

extern crate regex;

/// Byte offset into a named source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position(pub u32, pub Rc<String>);

impl Position {
    pub fn null() -> Self {
        Position(0, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn null() -> Self {
        Span {
            start: Position::null(),
            end: Position::null(),
        }
    }

    /// Span from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span {
            start: self.start.clone(),
            end: other.end.clone(),
        }
    }
}

/// A named source text fed into the pipeline.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Result of a successful compilation: the textual IR module and any
/// warnings raised along the way.
#[derive(Debug)]
pub struct Compilation {
    pub ir: String,
    pub warnings: Vec<Warning>,
}

/// Tokenizes and parses one source file.
pub fn parse_source(file: &SourceFile) -> Result<SourceModule, Error> {
    let tokens = tokenize(file.text.clone(), Some(file.name.clone()))?;
    parse(tokens, Rc::new(file.name.clone()))
}

/// Runs the whole pipeline over `files`: parse, the three lowering passes,
/// then IR emission. The first fatal diagnostic aborts compilation.
pub fn compile(files: &[SourceFile], options: &CompileOptions) -> Result<Compilation, Error> {
    let mut modules = Vec::new();
    if options.include_std {
        modules.push(parse_source(&SourceFile::new("std.own", STD_PRELUDE))?);
    }
    for file in files {
        debug!(file = %file.name, "parsing");
        modules.push(parse_source(file)?);
    }

    let mut checker = TypeChecker::new(options.clone());
    checker.check_modules(modules)?;

    if options.warnings_as_errors {
        if let Some(warning) = checker.warnings.first() {
            return Err(warning.clone().into_error());
        }
    }

    let ir = emit_module(&checker)?;
    Ok(Compilation {
        ir,
        warnings: checker.warnings,
    })
}
