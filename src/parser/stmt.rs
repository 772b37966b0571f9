use crate::{
    ast::{
        ast::Ident,
        expressions::BinaryOp,
        statements::{
            Block, FnDecl, FnKind, Item, ItemKind, MacroDecl, MacroParam, Param, Stmt, StmtKind,
            StructDecl, VarDecl,
        },
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
};

use super::{parser::Parser, types::parse_type};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if let Some(handler) = parser.get_stmt_lookup().get(&parser.current_token_kind()) {
        let handler = *handler;
        return handler(parser);
    }

    let stmt = parse_simple_stmt(parser)?;
    parser.expect(TokenKind::Semicolon)?;
    Ok(stmt)
}

fn compound_op(kind: TokenKind) -> Option<Option<BinaryOp>> {
    Some(match kind {
        TokenKind::Assignment => None,
        TokenKind::PlusEquals => Some(BinaryOp::Add),
        TokenKind::MinusEquals => Some(BinaryOp::Sub),
        TokenKind::StarEquals => Some(BinaryOp::Mul),
        TokenKind::SlashEquals => Some(BinaryOp::Div),
        TokenKind::PercentEquals => Some(BinaryOp::Rem),
        _ => return None,
    })
}

/// Declaration, assignment or expression statement without the trailing
/// semicolon, as used by `for` headers.
pub fn parse_simple_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if matches!(parser.current_token_kind(), TokenKind::Var | TokenKind::Const) {
        let start = parser.get_position();
        let decl = parse_var_decl(parser)?;
        return Ok(Stmt {
            kind: StmtKind::VarDecl(decl),
            span: parser.span_from(&start),
        });
    }

    let target = parse_expr(parser, BindingPower::Default)?;

    if let Some(op) = compound_op(parser.current_token_kind()) {
        parser.advance();
        let value = parse_expr(parser, BindingPower::Default)?;
        return Ok(Stmt {
            span: target.span.to(&value.span),
            kind: StmtKind::Assign { target, op, value },
        });
    }

    Ok(Stmt {
        span: target.span.clone(),
        kind: StmtKind::Expr(target),
    })
}

/// `var name: T = value` / `const name = value`, without the semicolon.
fn parse_var_decl(parser: &mut Parser) -> Result<VarDecl, Error> {
    let constant = parser.advance().kind == TokenKind::Const;

    let error = Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: String::from("expected identifier during variable declaration"),
        },
        parser.current_token().span.clone(),
    );
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?;
    let name = Ident::new(name.value, name.span);

    let ty = if parser.eat(TokenKind::Colon) {
        Some(parse_type(parser, BindingPower::Default)?)
    } else {
        None
    };

    let value = if parser.eat(TokenKind::Assignment) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    if value.is_none() && (ty.is_none() || constant) {
        return Err(parser.unexpected(if constant {
            "expected value in constant definition"
        } else {
            "expected value or explicit type"
        }));
    }

    Ok(VarDecl {
        name,
        constant,
        ty,
        value,
    })
}

pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let stmt = parse_simple_stmt(parser)?;
    parser.expect(TokenKind::Semicolon)?;
    Ok(stmt)
}

pub fn parse_block(parser: &mut Parser) -> Result<Block, Error> {
    let start = parser.expect(TokenKind::OpenCurly)?.span.start;

    let mut stmts = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        if !parser.has_tokens() {
            return Err(parser.unexpected("expected `}`"));
        }
        stmts.push(parse_stmt(parser)?);
    }
    parser.expect(TokenKind::CloseCurly)?;

    Ok(Block {
        stmts,
        span: parser.span_from(&start),
    })
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let block = parse_block(parser)?;
    Ok(Stmt {
        span: block.span.clone(),
        kind: StmtKind::Block(block),
    })
}

fn parse_condition(parser: &mut Parser) -> Result<crate::ast::expressions::Expr, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let condition = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;
    Ok(condition)
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let mut branches = vec![(parse_condition(parser)?, parse_block(parser)?)];
    let mut else_block = None;

    while parser.eat(TokenKind::Else) {
        if parser.eat(TokenKind::If) {
            branches.push((parse_condition(parser)?, parse_block(parser)?));
        } else {
            else_block = Some(parse_block(parser)?);
            break;
        }
    }

    Ok(Stmt {
        kind: StmtKind::If {
            branches,
            else_block,
        },
        span: parser.span_from(&start),
    })
}

fn parse_label(parser: &mut Parser) -> Result<Option<Ident>, Error> {
    if parser.eat(TokenKind::At) {
        Ok(Some(parser.expect_ident()?))
    } else {
        Ok(None)
    }
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    let label = parse_label(parser)?;
    let condition = parse_condition(parser)?;
    let body = parse_block(parser)?;

    Ok(Stmt {
        kind: StmtKind::While {
            label,
            condition,
            body,
        },
        span: parser.span_from(&start),
    })
}

pub fn parse_for_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    let label = parse_label(parser)?;
    parser.expect(TokenKind::OpenParen)?;

    let init = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(Box::new(parse_simple_stmt(parser)?))
    };
    parser.expect(TokenKind::Semicolon)?;

    let condition = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::Semicolon)?;

    let step = if parser.current_token_kind() == TokenKind::CloseParen {
        None
    } else {
        Some(Box::new(parse_simple_stmt(parser)?))
    };
    parser.expect(TokenKind::CloseParen)?;

    let body = parse_block(parser)?;

    Ok(Stmt {
        kind: StmtKind::For {
            label,
            init,
            condition,
            step,
            body,
        },
        span: parser.span_from(&start),
    })
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let value = if parser.current_token_kind() != TokenKind::Semicolon {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt {
        kind: StmtKind::Return(value),
        span: parser.span_from(&start),
    })
}

/// `break [@label];` and `continue [@label];`
pub fn parse_jump_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let token = parser.advance().clone();
    let label = parse_label(parser)?;
    parser.expect(TokenKind::Semicolon)?;

    let kind = if token.kind == TokenKind::Break {
        StmtKind::Break(label)
    } else {
        StmtKind::Continue(label)
    };
    Ok(Stmt {
        kind,
        span: parser.span_from(&token.span.start),
    })
}

/// Parses one top-level declaration, including an optional
/// `template <T, ..>` prefix.
pub fn parse_item(parser: &mut Parser) -> Result<Item, Error> {
    let start = parser.get_position();

    let mut template = vec![];
    if parser.eat(TokenKind::Template) {
        parser.expect(TokenKind::Less)?;
        template.push(parser.expect_ident()?);
        while parser.eat(TokenKind::Comma) {
            template.push(parser.expect_ident()?);
        }
        parser.expect(TokenKind::Greater)?;
    }

    let kind = match parser.current_token_kind() {
        TokenKind::Fn => ItemKind::Function(parse_fn_decl(parser, FnKind::Plain)?),
        TokenKind::Struct => ItemKind::Struct(parse_struct_decl(parser)?),
        TokenKind::Var | TokenKind::Const => {
            let decl = parse_var_decl(parser)?;
            parser.expect(TokenKind::Semicolon)?;
            ItemKind::Global(decl)
        }
        TokenKind::Typealias => {
            parser.advance();
            let name = parser.expect_ident()?;
            parser.expect(TokenKind::Assignment)?;
            let target = parse_type(parser, BindingPower::Default)?;
            parser.expect(TokenKind::Semicolon)?;
            ItemKind::Alias { name, target }
        }
        TokenKind::Macro => ItemKind::Macro(parse_macro_decl(parser)?),
        _ => return Err(parser.unexpected("expected declaration")),
    };

    if !template.is_empty() && matches!(kind, ItemKind::Alias { .. } | ItemKind::Macro(_)) {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: String::from("template"),
                message: String::from("only functions, structs and globals can be templates"),
            },
            parser.span_from(&start),
        ));
    }

    Ok(Item {
        kind,
        template,
        span: parser.span_from(&start),
    })
}

/// `fn name(a: T, ...): R { .. }` or a bodiless declaration ending in `;`.
pub fn parse_fn_decl(parser: &mut Parser, kind: FnKind) -> Result<FnDecl, Error> {
    let start = parser.expect(TokenKind::Fn)?.span.start;
    let name = parser.expect_ident()?;

    parser.expect(TokenKind::OpenParen)?;
    let mut params = Vec::new();
    let mut vararg = false;
    while parser.current_token_kind() != TokenKind::CloseParen {
        if parser.eat(TokenKind::Ellipsis) {
            vararg = true;
            break;
        }
        let name = parser.expect_ident()?;
        parser.expect(TokenKind::Colon)?;
        let ty = parse_type(parser, BindingPower::Default)?;
        params.push(Param { name, ty });

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let returns = if parser.eat(TokenKind::Colon) {
        Some(parse_type(parser, BindingPower::Default)?)
    } else {
        None
    };

    let body = if parser.eat(TokenKind::Semicolon) {
        None
    } else {
        Some(parse_block(parser)?)
    };

    Ok(FnDecl {
        name,
        kind,
        params,
        vararg,
        returns,
        body,
        span: parser.span_from(&start),
    })
}

pub fn parse_struct_decl(parser: &mut Parser) -> Result<StructDecl, Error> {
    parser.expect(TokenKind::Struct)?;
    let name = parser.expect_ident()?;
    parser.expect(TokenKind::OpenCurly)?;

    let mut fields = Vec::new();
    let mut methods = Vec::new();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        match (parser.current_token_kind(), parser.peek_kind(1)) {
            (TokenKind::Fn, _) => methods.push(parse_fn_decl(parser, FnKind::Method)?),
            (TokenKind::Const, TokenKind::Fn) => {
                parser.advance();
                methods.push(parse_fn_decl(parser, FnKind::ConstMethod)?);
            }
            (TokenKind::Static, _) => {
                parser.advance();
                methods.push(parse_fn_decl(parser, FnKind::Static)?);
            }
            (TokenKind::Var, _) | (TokenKind::Const, _) => {
                fields.push(parse_field(parser)?);
            }
            _ => return Err(parser.unexpected("expected field or method")),
        }
    }
    parser.expect(TokenKind::CloseCurly)?;

    Ok(StructDecl {
        name,
        fields,
        methods,
    })
}

/// Fields may omit both type and default only if one of them is present.
fn parse_field(parser: &mut Parser) -> Result<VarDecl, Error> {
    let constant = parser.advance().kind == TokenKind::Const;
    let name = parser.expect_ident()?;

    let ty = if parser.eat(TokenKind::Colon) {
        Some(parse_type(parser, BindingPower::Default)?)
    } else {
        None
    };
    let value = if parser.eat(TokenKind::Assignment) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    if ty.is_none() && value.is_none() {
        return Err(parser.unexpected("expected type or default value"));
    }
    parser.expect(TokenKind::Semicolon)?;

    Ok(VarDecl {
        name,
        constant,
        ty,
        value,
    })
}

/// `macro name(#T, T, ...): R;`
pub fn parse_macro_decl(parser: &mut Parser) -> Result<MacroDecl, Error> {
    parser.expect(TokenKind::Macro)?;
    let name = parser.expect_ident()?;

    parser.expect(TokenKind::OpenParen)?;
    let mut params = Vec::new();
    let mut vararg = false;
    while parser.current_token_kind() != TokenKind::CloseParen {
        if parser.eat(TokenKind::Ellipsis) {
            vararg = true;
            break;
        }
        let constant = parser.eat(TokenKind::Hash);
        let ty = parse_type(parser, BindingPower::Default)?;
        params.push(MacroParam { constant, ty });

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let returns = if parser.eat(TokenKind::Colon) {
        Some(parse_type(parser, BindingPower::Default)?)
    } else {
        None
    };
    parser.expect(TokenKind::Semicolon)?;

    Ok(MacroDecl {
        name,
        params,
        vararg,
        returns,
    })
}
