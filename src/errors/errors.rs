use std::fmt::Display;

use thiserror::Error;

use crate::{Position, Span};

/// A fatal diagnostic. Carries the primary span and, for conflicts and
/// moves, a second labelled span pointing at the earlier related site.
#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    span: Span,
    related: Option<Related>,
}

#[derive(Debug, Clone)]
pub struct Related {
    pub label: String,
    pub span: Span,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, span: Span) -> Self {
        Error {
            internal_error: error_impl,
            span,
            related: None,
        }
    }

    pub fn at(error_impl: ErrorImpl, position: Position) -> Self {
        Error::new(
            error_impl,
            Span {
                start: position.clone(),
                end: position,
            },
        )
    }

    pub fn with_related(mut self, label: &str, span: Span) -> Self {
        self.related = Some(Related {
            label: label.to_string(),
            span,
        });
        self
    }

    pub fn get_position(&self) -> &Position {
        &self.span.start
    }

    pub fn get_span(&self) -> &Span {
        &self.span
    }

    pub fn get_related(&self) -> Option<&Related> {
        self.related.as_ref()
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn message(&self) -> String {
        self.internal_error.to_string()
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::UnknownPackage { .. } => "UnknownPackage",
            ErrorImpl::UndefinedVariable { .. } => "UndefinedVariable",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::UndefinedMacro { .. } => "UndefinedMacro",
            ErrorImpl::AlreadyExists { .. } => "AlreadyExists",
            ErrorImpl::MemberNotFound { .. } => "MemberNotFound",
            ErrorImpl::UndefinedProperty { .. } => "UndefinedProperty",
            ErrorImpl::MissingProperty { .. } => "MissingProperty",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::TemplateArity { .. } => "TemplateArity",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::NotIndexable { .. } => "NotIndexable",
            ErrorImpl::NotDereferenceable { .. } => "NotDereferenceable",
            ErrorImpl::NotAStruct { .. } => "NotAStruct",
            ErrorImpl::IntegerOutOfRange { .. } => "IntegerOutOfRange",
            ErrorImpl::IllegalType { .. } => "IllegalType",
            ErrorImpl::ExpectedConstant => "ExpectedConstant",
            ErrorImpl::ExpectedVariable => "ExpectedVariable",
            ErrorImpl::InvalidArraySize => "InvalidArraySize",
            ErrorImpl::IncompleteType { .. } => "IncompleteType",
            ErrorImpl::RecursiveStruct { .. } => "RecursiveStruct",
            ErrorImpl::UniqueField { .. } => "UniqueField",
            ErrorImpl::UnsizedDereference { .. } => "UnsizedDereference",
            ErrorImpl::UnprintableType { .. } => "UnprintableType",
            ErrorImpl::InvalidOperands { .. } => "InvalidOperands",
            ErrorImpl::InvalidOperand { .. } => "InvalidOperand",
            ErrorImpl::MovedValue { .. } => "MovedValue",
            ErrorImpl::ModifyConstant => "ModifyConstant",
            ErrorImpl::ConstReceiver { .. } => "ConstReceiver",
            ErrorImpl::CannotTakeOwnership { .. } => "CannotTakeOwnership",
            ErrorImpl::UniqueDereference { .. } => "UniqueDereference",
            ErrorImpl::MissingInitializer { .. } => "MissingInitializer",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::NotInLoop { .. } => "NotInLoop",
            ErrorImpl::CyclicTemplate { .. } => "CyclicTemplate",
            ErrorImpl::CyclicDefinition { .. } => "CyclicDefinition",
            ErrorImpl::InstantiationDepth { .. } => "InstantiationDepth",
            ErrorImpl::NotATemplate { .. } => "NotATemplate",
            ErrorImpl::MissingTemplateArguments { .. } => "MissingTemplateArguments",
            ErrorImpl::MacroWithoutBody { .. } => "MacroWithoutBody",
            ErrorImpl::FormatArguments { .. } => "FormatArguments",
            ErrorImpl::MissingEntryPoint { .. } => "MissingEntryPoint",
            ErrorImpl::InvalidEntryPoint { .. } => "InvalidEntryPoint",
            ErrorImpl::UnreachableCode => "UnreachableCode",
            ErrorImpl::Backend { .. } => "Backend",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::MovedValue { name } => ErrorTip::Suggestion(format!(
                "share `{}` with `#{}` instead of moving it",
                name, name
            )),
            ErrorImpl::ConstReceiver { method } => ErrorTip::Suggestion(format!(
                "declare `{}` as `const fn` or call it on a mutable value",
                method
            )),
            ErrorImpl::MissingReturn { .. } => ErrorTip::Suggestion(String::from(
                "every path through a non-void function must end in `return`",
            )),
            ErrorImpl::IncompleteType { .. } => {
                ErrorTip::Suggestion(String::from("use a pointer to refer to it before it is complete"))
            }
            ErrorImpl::NotInLoop { .. } => ErrorTip::Suggestion(String::from(
                "labels are written `while @name (...)` and `break @name`",
            )),
            _ => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.internal_error)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("Unrecognised token: {token}")]
    UnrecognisedToken { token: String },
    #[error("Unexpected token: {token}")]
    UnexpectedToken { token: String },
    #[error("Unexpected token: {token}, {message}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("Invalid number: {token}")]
    NumberParseError { token: String },

    #[error("Unknown package '{name}'")]
    UnknownPackage { name: String },
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Unknown type '{name}'")]
    UnknownType { name: String },
    #[error("Undefined macro '{name}'")]
    UndefinedMacro { name: String },
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("Member '{member}' doesn't exist on '{ty}'")]
    MemberNotFound { member: String, ty: String },
    #[error("Undefined property '{name}'")]
    UndefinedProperty { name: String },
    #[error("Property '{name}' has to be initialized")]
    MissingProperty { name: String },

    #[error("Expected '{expected}' but found '{received}'")]
    TypeMatchError { expected: String, received: String },
    #[error("Expected {expected} argument(s) but found {received}")]
    UnexpectedArguments { expected: usize, received: usize },
    #[error("Template '{name}' expects {expected} type argument(s) but found {received}")]
    TemplateArity {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Cannot call an object of type '{ty}'")]
    NotCallable { ty: String },
    #[error("Expected array but found '{ty}'")]
    NotIndexable { ty: String },
    #[error("Expected pointer but found '{ty}'")]
    NotDereferenceable { ty: String },
    #[error("Expected struct but found '{ty}'")]
    NotAStruct { ty: String },
    #[error("{value} cannot be stored in {ty}")]
    IntegerOutOfRange { value: i128, ty: String },
    #[error("Illegal object type '{ty}'")]
    IllegalType { ty: String },
    #[error("Expected constant")]
    ExpectedConstant,
    #[error("Expected variable")]
    ExpectedVariable,
    #[error("Array size must be a non-negative integer constant")]
    InvalidArraySize,
    #[error("Cannot use incomplete type '{ty}' by value")]
    IncompleteType { ty: String },
    #[error("Struct '{name}' contains itself by value")]
    RecursiveStruct { name: String },
    #[error("Properties cannot be of unique type '{ty}'")]
    UniqueField { ty: String },
    #[error("Cannot dereference pointer to unsized array '{ty}'")]
    UnsizedDereference { ty: String },
    #[error("Cannot print objects of type '{ty}'")]
    UnprintableType { ty: String },
    #[error("Operator '{op}' cannot be applied to '{left}' and '{right}'")]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
    },
    #[error("Operator '{op}' cannot be applied to '{ty}'")]
    InvalidOperand { op: String, ty: String },

    #[error("Cannot use moved value '{name}'")]
    MovedValue { name: String },
    #[error("Cannot modify constant")]
    ModifyConstant,
    #[error("Cannot call non-const method '{method}' on a constant receiver")]
    ConstReceiver { method: String },
    #[error("Cannot store unique value of type '{ty}' here")]
    CannotTakeOwnership { ty: String },
    #[error("Cannot copy unique object of type '{ty}' out of a pointer")]
    UniqueDereference { ty: String },
    #[error("Variable '{name}' of unique type has to be initialized")]
    MissingInitializer { name: String },

    #[error("Function '{function}' has to return a value")]
    MissingReturn { function: String },
    #[error("'{statement}' is not in a loop")]
    NotInLoop { statement: String },

    #[error("Cyclic instantiation of template '{name}'")]
    CyclicTemplate { name: String },
    #[error("'{name}' depends on itself")]
    CyclicDefinition { name: String },
    #[error("Template instantiation depth of {limit} exceeded while instantiating '{name}'")]
    InstantiationDepth { name: String, limit: usize },
    #[error("'{name}' is not a template")]
    NotATemplate { name: String },
    #[error("Template '{name}' needs type arguments")]
    MissingTemplateArguments { name: String },

    #[error("Macro '{name}' doesn't have a body")]
    MacroWithoutBody { name: String },
    #[error("Format string expects {expected} argument(s) but found {received}")]
    FormatArguments { expected: usize, received: usize },

    #[error("Entry point '{name}' not found")]
    MissingEntryPoint { name: String },
    #[error("Entry point '{name}' must take no parameters and return i32 or void")]
    InvalidEntryPoint { name: String },

    #[error("Unreachable code")]
    UnreachableCode,

    #[error("Code generation failed: {message}")]
    Backend { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    UnreachableCode,
}

/// Non-fatal diagnostic. Collected on the compilation context and printed
/// by the driver.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub span: Span,
}

impl Warning {
    pub fn new(kind: WarningKind, span: Span) -> Self {
        Warning { kind, span }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            WarningKind::UnreachableCode => "Unreachable code",
        }
    }

    pub fn into_error(self) -> Error {
        match self.kind {
            WarningKind::UnreachableCode => Error::new(ErrorImpl::UnreachableCode, self.span),
        }
    }
}
