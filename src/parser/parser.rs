//! Token stream cursor and the module entry point.
//!
//! Statements, prefix/infix expressions and types are all dispatched through
//! per-token tables filled in by `lookups` and `types`.

use std::rc::Rc;

use crate::{
    ast::{ast::Ident, statements::SourceModule},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    Position, Span,
};

use super::{
    lookups::{
        create_token_lookups, BPLookup, BindingPower, LEDHandler, LEDLookup, NUDHandler, NUDLookup,
        StmtHandler, StmtLookup,
    },
    stmt::parse_item,
    types::{
        create_token_type_lookups, TypeBPLookup, TypeLEDHandler, TypeLEDLookup, TypeNUDHandler,
        TypeNUDLookup,
    },
};

#[derive(Default)]
struct ExprTables {
    stmt: StmtLookup,
    nud: NUDLookup,
    led: LEDLookup,
    power: BPLookup,
}

#[derive(Default)]
struct TypeTables {
    nud: TypeNUDLookup,
    led: TypeLEDLookup,
    power: TypeBPLookup,
}

/// Cursor over one file's tokens. The stream always ends with `EOF` and the
/// cursor never moves past it.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Rc<String>,
    exprs: ExprTables,
    types: TypeTables,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: Rc<String>) -> Self {
        let mut parser = Parser {
            tokens,
            pos: 0,
            file,
            exprs: ExprTables::default(),
            types: TypeTables::default(),
        };
        create_token_lookups(&mut parser);
        create_token_type_lookups(&mut parser);
        parser
    }

    pub fn current_token(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    /// Kind of the token `n` positions ahead, clamped to `EOF`.
    pub fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    /// Returns the current token and moves on, staying put at `EOF`.
    pub fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    /// Current token index, for backtracking.
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Rewinds to a position obtained from `mark`.
    pub fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Consumes a token of `expected_kind`, failing with `error` (or a generic
    /// "expected ..." error) otherwise.
    pub fn expect_error(
        &mut self,
        expected_kind: TokenKind,
        error: Option<Error>,
    ) -> Result<Token, Error> {
        let token = self.current_token();
        if token.kind != expected_kind {
            return match error {
                Some(error) => Err(error),
                None => Err(Error::new(
                    ErrorImpl::UnexpectedTokenDetailed {
                        token: token.value.clone(),
                        message: format!("expected {}", expected_kind),
                    },
                    token.span.clone(),
                )),
            };
        }
        Ok(self.advance().clone())
    }

    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        self.expect_error(expected_kind, None)
    }

    pub fn expect_ident(&mut self) -> Result<Ident, Error> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Ident::new(token.value, token.span))
    }

    /// Consumes the current token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current_token_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    /// `UnexpectedTokenDetailed` at the current token.
    pub fn unexpected(&self, message: &str) -> Error {
        let token = self.current_token();
        Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: token.value.clone(),
                message: message.to_string(),
            },
            token.span.clone(),
        )
    }

    pub fn get_stmt_lookup(&self) -> &StmtLookup {
        &self.exprs.stmt
    }

    pub fn get_nud_lookup(&self) -> &NUDLookup {
        &self.exprs.nud
    }

    pub fn get_led_lookup(&self) -> &LEDLookup {
        &self.exprs.led
    }

    pub fn get_bp_lookup(&self) -> &BPLookup {
        &self.exprs.power
    }

    pub fn get_type_bp_lookup(&self) -> &TypeBPLookup {
        &self.types.power
    }

    pub fn get_type_nud_lookup(&self) -> &TypeNUDLookup {
        &self.types.nud
    }

    pub fn get_type_led_lookup(&self) -> &TypeLEDLookup {
        &self.types.led
    }

    /// Infix handler plus the power it binds with.
    pub fn led(&mut self, kind: TokenKind, binding_power: BindingPower, led_fn: LEDHandler) {
        self.exprs.power.insert(kind, binding_power);
        self.exprs.led.insert(kind, led_fn);
    }

    pub fn nud(&mut self, kind: TokenKind, nud_fn: NUDHandler) {
        self.exprs.nud.insert(kind, nud_fn);
    }

    pub fn stmt(&mut self, kind: TokenKind, stmt_fn: StmtHandler) {
        self.exprs.stmt.insert(kind, stmt_fn);
    }

    pub fn type_led(
        &mut self,
        kind: TokenKind,
        binding_power: BindingPower,
        led_fn: TypeLEDHandler,
    ) {
        self.types.power.insert(kind, binding_power);
        self.types.led.insert(kind, led_fn);
    }

    pub fn type_nud(&mut self, kind: TokenKind, nud_fn: TypeNUDHandler) {
        self.types.nud.insert(kind, nud_fn);
    }

    /// Position of the current token.
    pub fn get_position(&self) -> Position {
        self.current_token().span.start.clone()
    }

    /// End of the most recently consumed token.
    pub fn previous_end(&self) -> Position {
        match self.pos.checked_sub(1) {
            Some(index) => self.tokens[index].span.end.clone(),
            None => Position(0, Rc::clone(&self.file)),
        }
    }

    /// Span from `start` to the end of the most recently consumed token.
    pub fn span_from(&self, start: &Position) -> Span {
        Span {
            start: start.clone(),
            end: self.previous_end(),
        }
    }
}

/// `package` (defaulting to `main`), then `import`s, then items until `EOF`.
pub fn parse(tokens: Vec<Token>, file: Rc<String>) -> Result<SourceModule, Error> {
    let mut parser = Parser::new(tokens, Rc::clone(&file));

    let package = if parser.current_token_kind() == TokenKind::Package {
        parser.advance();
        let name = parser.expect_ident()?;
        parser.expect(TokenKind::Semicolon)?;
        name
    } else {
        let start = parser.get_position();
        Ident::new(
            "main",
            Span {
                start: start.clone(),
                end: start,
            },
        )
    };

    let mut imports = Vec::new();
    while parser.current_token_kind() == TokenKind::Import {
        parser.advance();
        imports.push(parser.expect_ident()?);
        parser.expect(TokenKind::Semicolon)?;
    }

    let mut items = Vec::new();
    while parser.has_tokens() {
        items.push(parse_item(&mut parser)?);
    }

    Ok(SourceModule {
        file,
        package,
        imports,
        items,
    })
}
