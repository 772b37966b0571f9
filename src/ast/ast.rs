use std::fmt::Display;

use crate::Span;

/// A name as written in the source, with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Joins a `a::b::c` path for display.
pub fn path_to_string(path: &[Ident]) -> String {
    path.iter()
        .map(|ident| ident.name.as_str())
        .collect::<Vec<_>>()
        .join("::")
}

/// Span covering a whole path.
pub fn path_span(path: &[Ident]) -> Span {
    match (path.first(), path.last()) {
        (Some(first), Some(last)) => first.span.to(&last.span),
        _ => Span::null(),
    }
}
