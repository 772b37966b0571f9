//! Token construction shorthands used by the lexer's pattern table.

/// `Token { kind, value, span }` in one line.
#[macro_export]
macro_rules! MK_TOKEN {
    ($kind:expr, $value:expr, $span:expr) => {
        Token {
            kind: $kind,
            value: $value,
            span: $span,
        }
    };
}

/// Handler for punctuation whose text is always `$value`: pushes one token
/// covering it and skips over it.
///
/// ```ignore
/// pattern(r"^::", MK_DEFAULT_HANDLER!(TokenKind::ColonColon, "::"))
/// ```
#[macro_export]
macro_rules! MK_DEFAULT_HANDLER {
    ($kind:expr, $value:literal) => {
        |lexer: &mut Lexer, _matched: &str| {
            let width = $value.len();
            let span = lexer.span_of(width);
            lexer.push(MK_TOKEN!($kind, String::from($value), span));
            lexer.advance_n(width);
        }
    };
}
