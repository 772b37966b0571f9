use std::rc::Rc;

use crate::{
    ast::{
        expressions::{BinaryOp, Expr},
        statements::{Stmt, StmtKind, VarDecl},
    },
    errors::errors::{Error, ErrorImpl},
    symbols::symbols::ModuleScope,
    types::types::Type,
};

use super::{
    control_flow::{check_if, check_jump, check_loop, check_return, check_scope},
    expr::{check_expr, check_expr_allow_void, check_storage},
    ownership::{consume, take_ownership},
    type_checker::TypeChecker,
    typed_ast::{TypedExpr, TypedExprKind, TypedStmt, TypedStmtKind},
};

pub fn check_stmt(checker: &mut TypeChecker, stmt: &Stmt, scope: &Rc<ModuleScope>) -> Result<TypedStmt, Error> {
    let span = stmt.span.clone();
    let kind = match &stmt.kind {
        StmtKind::VarDecl(decl) => check_local_decl(checker, decl, scope)?,
        StmtKind::Assign { target, op, value } => check_assign(checker, target, *op, value, scope)?,
        StmtKind::Expr(expr) => {
            let value = check_expr_allow_void(checker, expr, scope)?;
            // A unique temporary nobody takes is freed right away.
            let release = !value.ty.ty.is_copyable() && value.as_storage().is_none();
            TypedStmtKind::Expr { value, release }
        }
        StmtKind::Return(value) => check_return(checker, value.as_ref(), &span, scope)?,
        StmtKind::Break(label) => check_jump(checker, true, label.as_ref(), &span)?,
        StmtKind::Continue(label) => check_jump(checker, false, label.as_ref(), &span)?,
        StmtKind::If {
            branches,
            else_block,
        } => check_if(checker, branches, else_block.as_ref(), scope)?,
        StmtKind::While {
            label,
            condition,
            body,
        } => check_loop(checker, label.as_ref(), None, Some(condition), None, body, scope)?,
        StmtKind::For {
            label,
            init,
            condition,
            step,
            body,
        } => check_loop(
            checker,
            label.as_ref(),
            init.as_deref(),
            condition.as_ref(),
            step.as_deref(),
            body,
            scope,
        )?,
        StmtKind::Block(block) => check_scope(checker, block, scope)?,
    };

    Ok(TypedStmt::new(kind, span))
}

fn check_local_decl(
    checker: &mut TypeChecker,
    decl: &VarDecl,
    scope: &Rc<ModuleScope>,
) -> Result<TypedStmtKind, Error> {
    let declared = match &decl.ty {
        Some(ty) => Some(checker.resolve_type(ty, scope)?),
        None => None,
    };
    let value = match &decl.value {
        Some(value) => Some(check_expr(checker, value, declared.as_ref(), scope)?),
        None => None,
    };

    let ty = match (declared, &value) {
        (Some(ty), _) => ty,
        (None, Some(value)) => value.ty.clone(),
        (None, None) => {
            return Err(Error::new(
                ErrorImpl::MissingInitializer {
                    name: decl.name.name.clone(),
                },
                decl.name.span.clone(),
            ));
        }
    };
    checker.check_value_type(&ty, &decl.name.span)?;
    checker.require_complete(&ty, &decl.name.span)?;

    match &value {
        Some(value) => consume(checker, value)?,
        None if !ty.ty.is_copyable() => {
            return Err(Error::new(
                ErrorImpl::MissingInitializer {
                    name: decl.name.name.clone(),
                },
                decl.name.span.clone(),
            ));
        }
        None => {}
    }

    let known = value
        .as_ref()
        .and_then(|value| value.constant.clone())
        .filter(|_| decl.constant);
    let local = checker.declare_local(&decl.name, ty, decl.constant, known)?;
    Ok(TypedStmtKind::Declare { local, value })
}

fn check_assign(
    checker: &mut TypeChecker,
    target: &Expr,
    op: Option<BinaryOp>,
    value: &Expr,
    scope: &Rc<ModuleScope>,
) -> Result<TypedStmtKind, Error> {
    let storage = check_storage(checker, target, op.is_none(), scope)?;
    if storage.constant {
        return Err(Error::new(ErrorImpl::ModifyConstant, target.span.clone()));
    }

    let value = match op {
        None => check_expr(checker, value, Some(&storage.ty), scope)?,
        Some(op) => {
            let right = check_expr(checker, value, Some(&storage.ty), scope)?;
            if !matches!(storage.ty.ty, Type::Int(_)) {
                return Err(Error::new(
                    ErrorImpl::InvalidOperands {
                        op: op.to_string(),
                        left: storage.ty.describe(),
                        right: right.ty.describe(),
                    },
                    target.span.clone(),
                ));
            }
            let span = target.span.to(&value.span);
            TypedExpr::new(
                TypedExprKind::Binary {
                    op,
                    left: Box::new(TypedExpr::load(storage.clone())),
                    right: Box::new(right),
                },
                storage.ty.clone(),
                span,
            )
        }
    };

    consume(checker, &value)?;
    let release_prior = take_ownership(checker, &storage.kind, &storage.ty, &target.span)?;
    Ok(TypedStmtKind::Assign {
        target: storage,
        value,
        release_prior,
    })
}
