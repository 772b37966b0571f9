//! Unit tests for the lexer module.
//!
//! Covers keywords and identifiers, integer and string literals with escape
//! sequences, punctuation that shares prefixes, comments and error cases.

use super::{lexer::tokenize, tokens::TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source.to_string(), Some("test.own".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    assert_eq!(
        kinds("var const static fn struct macro template typealias package import"),
        vec![
            TokenKind::Var,
            TokenKind::Const,
            TokenKind::Static,
            TokenKind::Fn,
            TokenKind::Struct,
            TokenKind::Macro,
            TokenKind::Template,
            TokenKind::Typealias,
            TokenKind::Package,
            TokenKind::Import,
            TokenKind::EOF,
        ]
    );
    assert_eq!(
        kinds("return break continue if else while for new true false"),
        vec![
            TokenKind::Return,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::For,
            TokenKind::New,
            TokenKind::True,
            TokenKind::False,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo baz_123 _x variable".to_string(), None).unwrap();

    assert_eq!(tokens[0].value, "foo");
    assert_eq!(tokens[1].value, "baz_123");
    assert_eq!(tokens[2].value, "_x");
    assert_eq!(tokens[3].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].value, "variable");
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("42 0 300".to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[2].value, "300");
}

#[test]
fn test_tokenize_string_escapes() {
    let tokens = tokenize(r#""a\n\t\"b\x41""#.to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, "a\n\t\"bA");
}

#[test]
fn test_string_span_covers_quotes() {
    let tokens = tokenize(r#"x "hi""#.to_string(), None).unwrap();

    assert_eq!(tokens[1].span.start.0, 2);
    assert_eq!(tokens[1].span.end.0, 6);
}

#[test]
fn test_tokenize_shared_prefixes() {
    assert_eq!(
        kinds(":: : ... . == = != ! <= < >= > && & || += -= *= /= %="),
        vec![
            TokenKind::ColonColon,
            TokenKind::Colon,
            TokenKind::Ellipsis,
            TokenKind::Dot,
            TokenKind::Equals,
            TokenKind::Assignment,
            TokenKind::NotEquals,
            TokenKind::Not,
            TokenKind::LessEquals,
            TokenKind::Less,
            TokenKind::GreaterEquals,
            TokenKind::Greater,
            TokenKind::And,
            TokenKind::Ampersand,
            TokenKind::Or,
            TokenKind::PlusEquals,
            TokenKind::MinusEquals,
            TokenKind::StarEquals,
            TokenKind::SlashEquals,
            TokenKind::PercentEquals,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_sigils() {
    assert_eq!(
        kinds("&x *p #p @outer"),
        vec![
            TokenKind::Ampersand,
            TokenKind::Identifier,
            TokenKind::Star,
            TokenKind::Identifier,
            TokenKind::Hash,
            TokenKind::Identifier,
            TokenKind::At,
            TokenKind::Identifier,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_skip_comments() {
    assert_eq!(
        kinds("a // line comment\n/* block\n comment */ b"),
        vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::EOF]
    );
}

#[test]
fn test_positions_are_byte_offsets() {
    let tokens = tokenize("var  x".to_string(), Some("test.own".to_string())).unwrap();

    assert_eq!(tokens[1].span.start.0, 5);
    assert_eq!(tokens[1].span.end.0, 6);
    assert_eq!(tokens[1].span.start.1.as_str(), "test.own");
}

#[test]
fn test_unrecognised_token() {
    let error = tokenize("var x = $;".to_string(), None).unwrap_err();

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().0, 8);
}

#[test]
fn test_unterminated_string() {
    let error = tokenize("\"abc".to_string(), None).unwrap_err();
    assert_eq!(error.get_error_name(), "UnrecognisedToken");
}
