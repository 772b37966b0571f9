use crate::{
    ast::{
        ast::{path_span, Ident},
        expressions::{BinaryOp, Expr, ExprKind, UnaryOp},
        types::{TypeExpr, TypeExprKind},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{
    lookups::BindingPower,
    parser::Parser,
    types::{parse_type, parse_type_args},
};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let nud = match parser.get_nud_lookup().get(&token_kind) {
        Some(nud) => *nud,
        None => return Err(parser.unexpected("expected expression")),
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    loop {
        let token_kind = parser.current_token_kind();
        let next_bp = *parser
            .get_bp_lookup()
            .get(&token_kind)
            .unwrap_or(&BindingPower::Default);
        if next_bp <= bp {
            break;
        }
        let led = match parser.get_led_lookup().get(&token_kind) {
            Some(led) => *led,
            None => break,
        };
        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.advance().clone();
    let kind = match token.kind {
        TokenKind::Number => match token.value.parse::<u64>() {
            Ok(value) => ExprKind::Number(value),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span,
                ))
            }
        },
        TokenKind::String => ExprKind::Str(token.value.clone()),
        TokenKind::True => ExprKind::Bool(true),
        TokenKind::False => ExprKind::Bool(false),
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: token.value },
                token.span,
            ))
        }
    };

    Ok(Expr {
        kind,
        span: token.span,
    })
}

/// Identifier-led expressions: `a`, `pkg::a`, `Box<i32>`, `print!(..)`
/// and `Point{x: 1}`.
pub fn parse_path_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let mut path = vec![parser.expect_ident()?];
    while parser.current_token_kind() == TokenKind::ColonColon {
        parser.advance();
        path.push(parser.expect_ident()?);
    }

    let args = try_parse_template_args(parser);

    if parser.current_token_kind() == TokenKind::Not
        && parser.peek_kind(1) == TokenKind::OpenParen
        && args.is_empty()
    {
        parser.advance();
        let args = parse_arguments(parser)?;
        let span = parser.span_from(&path[0].span.start);
        return Ok(Expr {
            kind: ExprKind::MacroCall { path, args },
            span,
        });
    }

    if looks_like_struct_init(parser) {
        let ty = TypeExpr {
            span: path_span(&path),
            kind: TypeExprKind::Named { path, args },
        };
        return parse_struct_init(parser, ty, false);
    }

    let span = parser.span_from(&path[0].span.start);
    Ok(Expr {
        kind: ExprKind::Path { path, args },
        span,
    })
}

/// Speculatively parses `<T, ..>` after a name. Falls back to treating `<`
/// as a comparison when the arguments don't parse or are followed by an
/// operand.
fn try_parse_template_args(parser: &mut Parser) -> Vec<TypeExpr> {
    if parser.current_token_kind() != TokenKind::Less {
        return vec![];
    }

    let mark = parser.mark();
    match parse_type_args(parser) {
        Ok(args)
            if matches!(
                parser.current_token_kind(),
                TokenKind::OpenParen
                    | TokenKind::OpenCurly
                    | TokenKind::CloseParen
                    | TokenKind::CloseBracket
                    | TokenKind::Semicolon
                    | TokenKind::Comma
                    | TokenKind::Dot
            ) =>
        {
            args
        }
        _ => {
            parser.reset(mark);
            vec![]
        }
    }
}

fn looks_like_struct_init(parser: &Parser) -> bool {
    parser.current_token_kind() == TokenKind::OpenCurly
        && (parser.peek_kind(1) == TokenKind::CloseCurly
            || (parser.peek_kind(1) == TokenKind::Identifier
                && parser.peek_kind(2) == TokenKind::Colon))
}

fn parse_struct_init(parser: &mut Parser, ty: TypeExpr, heap: bool) -> Result<Expr, Error> {
    let start = ty.span.start.clone();
    parser.expect(TokenKind::OpenCurly)?;

    let mut fields = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly {
        let name = parser.expect_ident()?;
        parser.expect(TokenKind::Colon)?;
        let value = parse_expr(parser, BindingPower::Default)?;
        fields.push((name, value));

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseCurly)?;

    Ok(Expr {
        kind: ExprKind::StructInit { ty, fields, heap },
        span: parser.span_from(&start),
    })
}

fn parse_arguments(parser: &mut Parser) -> Result<Vec<Expr>, Error> {
    parser.expect(TokenKind::OpenParen)?;

    let mut args = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        args.push(parse_expr(parser, BindingPower::Default)?);
        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    Ok(args)
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Dash => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Equals => BinaryOp::Eq,
        TokenKind::NotEquals => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEquals => BinaryOp::Le,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEquals => BinaryOp::Ge,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        _ => return None,
    })
}

pub fn parse_binary_expr(
    parser: &mut Parser,
    left: Expr,
    bp: BindingPower,
) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();
    let op = match binary_op(operator_token.kind) {
        Some(op) => op,
        None => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: operator_token.value,
                },
                operator_token.span,
            ))
        }
    };

    let right = parse_expr(parser, bp)?;

    Ok(Expr {
        span: left.span.to(&right.span),
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    })
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();
    let op = if operator_token.kind == TokenKind::Not {
        UnaryOp::Not
    } else {
        UnaryOp::Neg
    };
    let rhs = parse_expr(parser, BindingPower::Unary)?;

    Ok(Expr {
        span: operator_token.span.to(&rhs.span),
        kind: ExprKind::Unary {
            op,
            operand: Box::new(rhs),
        },
    })
}

pub fn parse_ref_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.clone();
    let constant = parser.eat(TokenKind::Const);
    let target = parse_expr(parser, BindingPower::Unary)?;

    Ok(Expr {
        span: start.to(&target.span),
        kind: ExprKind::Ref {
            target: Box::new(target),
            constant,
        },
    })
}

pub fn parse_deref_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.clone();
    let target = parse_expr(parser, BindingPower::Unary)?;

    Ok(Expr {
        span: start.to(&target.span),
        kind: ExprKind::Deref(Box::new(target)),
    })
}

pub fn parse_share_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.clone();
    let target = parse_expr(parser, BindingPower::Unary)?;

    Ok(Expr {
        span: start.to(&target.span),
        kind: ExprKind::Share(Box::new(target)),
    })
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start.clone();
    let mut expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    expr.span = parser.span_from(&start);
    Ok(expr)
}

/// `[]T{a, b}` literal or `[N]T{v}` fill.
pub fn parse_array_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parse_array(parser, false)
}

fn parse_array(parser: &mut Parser, heap: bool) -> Result<Expr, Error> {
    let start = parser.expect(TokenKind::OpenBracket)?.span.start;

    let size = if parser.current_token_kind() == TokenKind::CloseBracket {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::CloseBracket)?;

    let of = parse_type(parser, BindingPower::Default)?;
    parser.expect(TokenKind::OpenCurly)?;

    let kind = match size {
        Some(size) => {
            let value = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::CloseCurly)?;
            ExprKind::ArrayFill {
                of,
                size: Box::new(size),
                value: Box::new(value),
                heap,
            }
        }
        None => {
            let mut values = vec![];
            while parser.current_token_kind() != TokenKind::CloseCurly {
                values.push(parse_expr(parser, BindingPower::Default)?);
                if !parser.eat(TokenKind::Comma) {
                    break;
                }
            }
            parser.expect(TokenKind::CloseCurly)?;
            ExprKind::ArrayInit { of, values, heap }
        }
    };

    Ok(Expr {
        kind,
        span: parser.span_from(&start),
    })
}

/// `new T(v)`, `new Name{..}`, `new []T{..}` and `new [n]T{v}`.
pub fn parse_new_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start.clone();

    let mut expr = if parser.current_token_kind() == TokenKind::OpenBracket {
        parse_array(parser, true)?
    } else {
        let ty = parse_type(parser, BindingPower::Default)?;
        if parser.current_token_kind() == TokenKind::OpenCurly {
            parse_struct_init(parser, ty, true)?
        } else {
            parser.expect(TokenKind::OpenParen)?;
            let value = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::CloseParen)?;
            Expr {
                kind: ExprKind::New {
                    ty,
                    value: Box::new(value),
                },
                span: parser.span_from(&start),
            }
        }
    };

    expr.span = parser.span_from(&start);
    Ok(expr)
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let args = parse_arguments(parser)?;

    Ok(Expr {
        span: parser.span_from(&left.span.start),
        kind: ExprKind::Call {
            callee: Box::new(left),
            args,
        },
    })
}

pub fn parse_index_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.expect(TokenKind::OpenBracket)?;
    let index = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseBracket)?;

    Ok(Expr {
        span: parser.span_from(&left.span.start),
        kind: ExprKind::Index {
            base: Box::new(left),
            index: Box::new(index),
        },
    })
}

pub fn parse_member_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.expect(TokenKind::Dot)?;
    let member: Ident = parser.expect_ident()?;

    Ok(Expr {
        span: left.span.to(&member.span),
        kind: ExprKind::Member {
            base: Box::new(left),
            member,
        },
    })
}
