//! Type parsing implementation.
//!
//! This module handles parsing of type annotations and type expressions.
//! It supports:
//!
//! - Named types, qualified `pkg::Name` and template arguments `Name<T>`
//! - Owner `&T` and shared `*T` pointers with an optional `const` prefix
//! - Sized `T[N]` and unsized `T[]` arrays
//! - Grouping `(T)` and function types `(A, B, ...): R`
//!
//! Similar to expression parsing, it uses NUD/LED handlers with
//! binding powers for parsing complex type expressions. Pointer sigils bind
//! looser than array suffixes, so `*i32[]` is a pointer to an array.

use std::collections::HashMap;

use crate::{
    ast::types::{TypeExpr, TypeExprKind},
    errors::errors::Error,
    lexer::tokens::TokenKind,
};

use super::{expr::parse_expr, lookups::BindingPower, parser::Parser};

/// Type alias for type null denotation handler functions.
pub type TypeNUDHandler = fn(&mut Parser) -> Result<TypeExpr, Error>;

/// Type alias for type left denotation handler functions.
pub type TypeLEDHandler = fn(&mut Parser, TypeExpr, BindingPower) -> Result<TypeExpr, Error>;

/// Type alias for type NUD lookup table.
pub type TypeNUDLookup = HashMap<TokenKind, TypeNUDHandler>;

/// Type alias for type LED lookup table.
pub type TypeLEDLookup = HashMap<TokenKind, TypeLEDHandler>;

/// Type alias for type binding power lookup table.
pub type TypeBPLookup = HashMap<TokenKind, BindingPower>;

/// Initializes the type parsing lookup tables.
pub fn create_token_type_lookups(parser: &mut Parser) {
    parser.type_nud(TokenKind::Identifier, parse_symbol_type);
    parser.type_nud(TokenKind::Ampersand, parse_pointer_type);
    parser.type_nud(TokenKind::Star, parse_pointer_type);
    parser.type_nud(TokenKind::Const, parse_const_type);
    parser.type_nud(TokenKind::OpenParen, parse_paren_type);
    parser.type_led(TokenKind::OpenBracket, BindingPower::Call, parse_array_type);
}

pub fn parse_symbol_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let first = parser.expect_ident()?;
    let start = first.span.start.clone();

    let mut path = vec![first];
    while parser.current_token_kind() == TokenKind::ColonColon {
        parser.advance();
        path.push(parser.expect_ident()?);
    }

    let args = if parser.current_token_kind() == TokenKind::Less {
        parse_type_args(parser)?
    } else {
        vec![]
    };

    Ok(TypeExpr {
        kind: TypeExprKind::Named { path, args },
        span: parser.span_from(&start),
    })
}

/// `<T, U>`
pub fn parse_type_args(parser: &mut Parser) -> Result<Vec<TypeExpr>, Error> {
    parser.expect(TokenKind::Less)?;

    let mut args = vec![parse_type(parser, BindingPower::Default)?];
    while parser.eat(TokenKind::Comma) {
        args.push(parse_type(parser, BindingPower::Default)?);
    }
    parser.expect(TokenKind::Greater)?;

    Ok(args)
}

pub fn parse_pointer_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    parse_pointer(parser, false)
}

fn parse_pointer(parser: &mut Parser, constant: bool) -> Result<TypeExpr, Error> {
    let sigil = parser.advance().clone();
    let to = Box::new(parse_type(parser, BindingPower::Unary)?);
    let span = sigil.span.to(&to.span);

    let kind = if sigil.kind == TokenKind::Ampersand {
        TypeExprKind::Owner { to, constant }
    } else {
        TypeExprKind::Shared { to, constant }
    };
    Ok(TypeExpr { kind, span })
}

/// `const *T`, `const &T` and `const T[]`.
pub fn parse_const_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let start = parser.advance().span.start.clone();

    let mut ty = match parser.current_token_kind() {
        TokenKind::Ampersand | TokenKind::Star => parse_pointer(parser, true)?,
        _ => {
            let mut inner = parse_type(parser, BindingPower::Unary)?;
            match &mut inner.kind {
                TypeExprKind::Array { constant, .. } => *constant = true,
                _ => return Err(parser.unexpected("`const` applies to pointers and arrays only")),
            }
            inner
        }
    };

    ty.span = parser.span_from(&start);
    Ok(ty)
}

/// `(T)` or `(A, B, ...): R`
pub fn parse_paren_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let start = parser.advance().span.start.clone();

    let mut params = vec![];
    let mut vararg = false;
    while parser.current_token_kind() != TokenKind::CloseParen {
        if parser.eat(TokenKind::Ellipsis) {
            vararg = true;
            break;
        }
        params.push(parse_type(parser, BindingPower::Default)?);
        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    if parser.eat(TokenKind::Colon) {
        let returns = Box::new(parse_type(parser, BindingPower::Unary)?);
        return Ok(TypeExpr {
            kind: TypeExprKind::Func {
                params,
                vararg,
                returns,
            },
            span: parser.span_from(&start),
        });
    }

    if params.len() != 1 || vararg {
        return Err(parser.unexpected("expected `:` and a return type after function parameters"));
    }

    let mut inner = params.remove(0);
    inner.span = parser.span_from(&start);
    Ok(inner)
}

pub fn parse_array_type(
    parser: &mut Parser,
    left: TypeExpr,
    _bp: BindingPower,
) -> Result<TypeExpr, Error> {
    parser.expect(TokenKind::OpenBracket)?;
    let size = if parser.current_token_kind() == TokenKind::CloseBracket {
        None
    } else {
        Some(Box::new(parse_expr(parser, BindingPower::Default)?))
    };
    parser.expect(TokenKind::CloseBracket)?;

    Ok(TypeExpr {
        span: parser.span_from(&left.span.start),
        kind: TypeExprKind::Array {
            of: Box::new(left),
            constant: false,
            size,
        },
    })
}

pub fn parse_type(parser: &mut Parser, bp: BindingPower) -> Result<TypeExpr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let nud = match parser.get_type_nud_lookup().get(&token_kind) {
        Some(nud) => *nud,
        None => return Err(parser.unexpected("expected type")),
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    loop {
        let token_kind = parser.current_token_kind();
        let next_bp = *parser
            .get_type_bp_lookup()
            .get(&token_kind)
            .unwrap_or(&BindingPower::Default);
        if next_bp <= bp {
            break;
        }
        let led = match parser.get_type_led_lookup().get(&token_kind) {
            Some(led) => *led,
            None => break,
        };
        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}
