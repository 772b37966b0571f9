//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::errors::errors::{Error, ErrorImpl, ErrorTip, Warning, WarningKind};
use crate::errors::report::{render_error, render_warning, SourceMap};
use crate::{Position, Span};

fn span(start: u32, end: u32) -> Span {
    let file = Rc::new("test.own".to_string());
    Span {
        start: Position(start, Rc::clone(&file)),
        end: Position(end, file),
    }
}

#[test]
fn test_error_creation() {
    let error = Error::at(
        ErrorImpl::UnrecognisedToken {
            token: "$".to_string(),
        },
        Position(10, Rc::new("test.own".to_string())),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().0, 10);
}

#[test]
fn test_type_mismatch_message() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            expected: "i32".to_string(),
            received: "bool".to_string(),
        },
        span(0, 1),
    );

    assert_eq!(error.get_error_name(), "TypeMatchError");
    assert_eq!(error.message(), "Expected 'i32' but found 'bool'");
}

#[test]
fn test_integer_range_message() {
    let error = Error::new(
        ErrorImpl::IntegerOutOfRange {
            value: 300,
            ty: "i8".to_string(),
        },
        span(0, 3),
    );

    assert_eq!(error.message(), "300 cannot be stored in i8");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(ErrorImpl::ExpectedVariable, span(0, 1));
    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_suggestion() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "}".to_string(),
        },
        span(0, 1),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(_) => (),
        _ => panic!("Expected suggestion tip"),
    }
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_related_span() {
    let error = Error::new(
        ErrorImpl::AlreadyExists {
            kind: "Property".to_string(),
            name: "x".to_string(),
        },
        span(20, 21),
    )
    .with_related("Already declared here", span(4, 5));

    let related = error.get_related().unwrap();
    assert_eq!(related.label, "Already declared here");
    assert_eq!(related.span.start.0, 4);
    assert_eq!(error.message(), "Property 'x' already exists");
}

#[test]
fn test_source_map_line_col() {
    let mut sources = SourceMap::new();
    sources.add("test.own", "fn a() {\n    b();\n}\n");

    assert_eq!(sources.line_col(&Position(0, Rc::new("test.own".to_string()))), Some((1, 1, 0)));
    assert_eq!(sources.line_col(&Position(13, Rc::new("test.own".to_string()))), Some((2, 5, 9)));
    assert_eq!(sources.line_col(&Position(0, Rc::new("other.own".to_string()))), None);
}

#[test]
fn test_render_error_with_related() {
    let mut sources = SourceMap::new();
    sources.add("test.own", "var x = 1;\nvar x = 2;\n");

    let error = Error::new(
        ErrorImpl::AlreadyExists {
            kind: "Global".to_string(),
            name: "x".to_string(),
        },
        span(15, 16),
    )
    .with_related("Already declared here", span(4, 5));

    let expected = "Error: Global 'x' already exists\n\
                    -> test.own:2:5\n  |\n2 | var x = 2;\n  |     ^\n\
                    Already declared here:\n\
                    -> test.own:1:5\n  |\n1 | var x = 1;\n  |     ^\n";
    assert_eq!(render_error(&error, &sources), expected);
}

#[test]
fn test_render_multiline_warning() {
    let mut sources = SourceMap::new();
    sources.add("test.own", "ab\ncd\n");

    let warning = Warning::new(WarningKind::UnreachableCode, span(1, 4));
    let expected = "Warning: Unreachable code\n-> test.own:1:2\n  |\n1 | ab\n  |  ^\n2 | cd\n  | ^\n";
    assert_eq!(render_warning(&warning, &sources), expected);
}
