//! Block structure, reachability and release points.
//!
//! Every block records whether it returned or jumped out of a loop. The
//! first statement after a terminated block starts an unreachable region,
//! reported once and lowered with IR emission suppressed. Branches with a
//! constant `false` condition are unreachable as well, and a constant
//! `true` arm makes the rest of the chain unreachable. A loop whose
//! condition is constant `true` and that has no reachable `break` never
//! exits, which terminates the enclosing block.
//!
//! Release lists are fixed here: owning locals leave scope in reverse
//! declaration order on block exit, on `return` (all blocks of the
//! function) and on `break`/`continue` (blocks from the loop body inwards).

use std::rc::Rc;

use tracing::debug;

use crate::{
    ast::{
        ast::Ident,
        expressions::Expr,
        statements::{Block, FnDecl, Stmt},
    },
    errors::errors::{Error, ErrorImpl, WarningKind},
    symbols::{
        scope::{BlockFrame, FunctionFrame, Local, LocalId, LoopFrame, LoopId, Ownership},
        symbols::{GlobalId, GlobalKind, ModuleScope},
    },
    types::types::{AliasedType, ConstValue, StructId, Type},
    Span,
};

use super::{
    expr::{check_expr, check_expr_allow_void},
    ownership::consume,
    stmt::check_stmt,
    type_checker::TypeChecker,
    typed_ast::{TypedBlock, TypedExpr, TypedFunction, TypedStmt, TypedStmtKind},
};

/// Owning locals of a popped block, in release order.
fn release_order(frame: &FunctionFrame, block: &BlockFrame) -> Vec<LocalId> {
    block
        .locals
        .iter()
        .rev()
        .copied()
        .filter(|id| frame.local(*id).owns())
        .collect()
}

fn known_bool(expr: &TypedExpr) -> Option<bool> {
    expr.constant.as_ref().and_then(ConstValue::as_bool)
}

/// Lowers statements into the innermost open block.
pub fn check_stmts(
    checker: &mut TypeChecker,
    stmts: &[Stmt],
    scope: &Rc<ModuleScope>,
) -> Result<Vec<TypedStmt>, Error> {
    let mut typed = vec![];
    let mut suppressed = false;

    for (index, stmt) in stmts.iter().enumerate() {
        if !suppressed && checker.frame_mut().top_block().terminated() {
            if checker.frame().unreachable == 0 {
                let last = &stmts[stmts.len() - 1];
                checker.warn(WarningKind::UnreachableCode, stmts[index].span.to(&last.span));
            }
            checker.frame_mut().unreachable += 1;
            suppressed = true;
        }

        let mut lowered = check_stmt(checker, stmt, scope)?;
        lowered.unreachable = checker.frame().unreachable > 0;
        typed.push(lowered);
    }

    if suppressed {
        checker.frame_mut().unreachable -= 1;
    }
    Ok(typed)
}

/// Lowers a block in a fresh scope and returns it with the state it ended
/// in.
pub fn check_block(
    checker: &mut TypeChecker,
    block: &Block,
    scope: &Rc<ModuleScope>,
) -> Result<(TypedBlock, BlockFrame), Error> {
    checker.frame_mut().blocks.push(BlockFrame::default());
    let stmts = check_stmts(checker, &block.stmts, scope);
    let (drops, frame) = pop_block(checker);
    let stmts = stmts?;
    settle_loop_moves(checker, &frame)?;
    Ok((TypedBlock { stmts, drops }, frame))
}

/// Hands the loop moves of a popped block to its parent. A loop body that
/// falls through to the next iteration must not have moved anything it
/// does not own.
fn settle_loop_moves(checker: &mut TypeChecker, block: &BlockFrame) -> Result<(), Error> {
    if block.terminated() {
        return Ok(());
    }

    let frame = checker.frame_mut();
    let index = frame.blocks.len();
    let moves: Vec<(LocalId, Span)> = block
        .loop_moves
        .iter()
        .filter(|(id, _)| frame.local(*id).depth < index)
        .cloned()
        .collect();

    let is_loop_body = frame.loops.last().map_or(false, |frame| frame.body_depth == index);
    if is_loop_body {
        if let Some((id, span)) = moves.into_iter().next() {
            return Err(moved_in_loop(frame, id, span));
        }
        return Ok(());
    }
    if let Some(parent) = frame.blocks.last_mut() {
        parent.loop_moves.extend(moves);
    }
    Ok(())
}

/// The value is gone by the time the loop comes around again.
pub fn moved_in_loop(frame: &FunctionFrame, id: LocalId, span: Span) -> Error {
    Error::new(
        ErrorImpl::MovedValue {
            name: frame.local(id).name.name.clone(),
        },
        span.clone(),
    )
    .with_related("Moved here on the previous iteration", span)
}

fn pop_block(checker: &mut TypeChecker) -> (Vec<LocalId>, BlockFrame) {
    let frame = checker.frame_mut();
    let block = frame.blocks.pop().unwrap_or_default();
    let drops = if block.terminated() {
        vec![]
    } else {
        release_order(frame, &block)
    };
    (drops, block)
}

/// Lowers a block that may be statically dead, warning once if it is.
fn check_arm(
    checker: &mut TypeChecker,
    block: &Block,
    dead: bool,
    scope: &Rc<ModuleScope>,
) -> Result<(TypedBlock, BlockFrame), Error> {
    if !dead {
        return check_block(checker, block, scope);
    }

    if let (0, Some(first), Some(last)) = (checker.frame().unreachable, block.stmts.first(), block.stmts.last()) {
        checker.warn(WarningKind::UnreachableCode, first.span.to(&last.span));
    }
    checker.frame_mut().unreachable += 1;
    let result = check_block(checker, block, scope);
    checker.frame_mut().unreachable -= 1;
    result
}

/// A nested `{ }` block: its termination carries over to the parent.
pub fn check_scope(
    checker: &mut TypeChecker,
    block: &Block,
    scope: &Rc<ModuleScope>,
) -> Result<TypedStmtKind, Error> {
    let (typed, inner) = check_block(checker, block, scope)?;
    let parent = checker.frame_mut().top_block();
    parent.returned |= inner.returned;
    if parent.break_from.is_none() {
        parent.break_from = inner.break_from;
    }
    Ok(TypedStmtKind::Scope(typed))
}

pub fn check_if(
    checker: &mut TypeChecker,
    branches: &[(Expr, Block)],
    else_block: Option<&Block>,
    scope: &Rc<ModuleScope>,
) -> Result<TypedStmtKind, Error> {
    let bool_ty: AliasedType = Type::Bool.into();
    let mut typed_branches = vec![];
    let mut has_else = false;
    let mut all_terminated = true;
    let mut all_returned = true;
    let mut jump = None;
    let mut decided = false;

    let mut merge = |outcome: &BlockFrame| {
        all_terminated &= outcome.terminated();
        all_returned &= outcome.returned;
        if jump.is_none() {
            jump = outcome.break_from;
        }
    };

    for (condition, body) in branches {
        let condition = check_expr(checker, condition, Some(&bool_ty), scope)?;
        let known = known_bool(&condition);
        let dead = decided || known == Some(false);
        let (block, outcome) = check_arm(checker, body, dead, scope)?;
        if !dead {
            merge(&outcome);
            if known == Some(true) {
                // Acts as the `else` of the chain.
                has_else = true;
                decided = true;
            }
        }
        typed_branches.push((condition, block));
    }

    let else_block = match else_block {
        Some(body) => {
            let (block, outcome) = check_arm(checker, body, decided, scope)?;
            if !decided {
                merge(&outcome);
                has_else = true;
            }
            Some(block)
        }
        None => None,
    };

    if has_else && all_terminated {
        let parent = checker.frame_mut().top_block();
        if all_returned {
            parent.returned = true;
        } else if parent.break_from.is_none() {
            parent.break_from = jump;
        }
    }

    Ok(TypedStmtKind::If {
        branches: typed_branches,
        else_block,
    })
}

/// `while` and `for`. The header of a `for` lives in a scope around the
/// loop and is released after it.
pub fn check_loop(
    checker: &mut TypeChecker,
    label: Option<&Ident>,
    init: Option<&Stmt>,
    condition: Option<&Expr>,
    step: Option<&Stmt>,
    body: &Block,
    scope: &Rc<ModuleScope>,
) -> Result<TypedStmtKind, Error> {
    let id = checker.next_loop_id();
    checker.frame_mut().blocks.push(BlockFrame::default());
    let lowered = check_loop_parts(checker, id, label, init, condition, step, body, scope);
    let (exit_drops, header) = pop_block(checker);
    let (init, condition, step, body, runs_forever) = lowered?;
    settle_loop_moves(checker, &header)?;

    if runs_forever {
        checker.frame_mut().top_block().returned = true;
    }

    Ok(TypedStmtKind::Loop {
        id,
        init: init.map(Box::new),
        condition,
        step: step.map(Box::new),
        body,
        exit_drops,
    })
}

type LoopParts = (
    Option<TypedStmt>,
    Option<TypedExpr>,
    Option<TypedStmt>,
    TypedBlock,
    bool,
);

#[allow(clippy::too_many_arguments)]
fn check_loop_parts(
    checker: &mut TypeChecker,
    id: LoopId,
    label: Option<&Ident>,
    init: Option<&Stmt>,
    condition: Option<&Expr>,
    step: Option<&Stmt>,
    body: &Block,
    scope: &Rc<ModuleScope>,
) -> Result<LoopParts, Error> {
    let init = match init {
        Some(init) => Some(check_stmt(checker, init, scope)?),
        None => None,
    };

    // Condition and step run on every iteration, so they count as inside.
    let frame = checker.frame_mut();
    frame.loops.push(LoopFrame {
        id,
        label: label.map(|label| label.name.clone()),
        body_depth: frame.blocks.len(),
        has_break: false,
    });
    let parts = check_loop_iteration(checker, condition, step, body, scope);
    let has_break = checker
        .frame_mut()
        .loops
        .pop()
        .map_or(false, |frame| frame.has_break);
    let (condition, known, body, step) = parts?;

    Ok((init, condition, step, body, known == Some(true) && !has_break))
}

type IterationParts = (Option<TypedExpr>, Option<bool>, TypedBlock, Option<TypedStmt>);

fn check_loop_iteration(
    checker: &mut TypeChecker,
    condition: Option<&Expr>,
    step: Option<&Stmt>,
    body: &Block,
    scope: &Rc<ModuleScope>,
) -> Result<IterationParts, Error> {
    let condition = match condition {
        Some(condition) => Some(check_expr(checker, condition, Some(&Type::Bool.into()), scope)?),
        None => None,
    };
    let known = match &condition {
        Some(condition) => known_bool(condition),
        None => Some(true),
    };

    let (body, _) = check_arm(checker, body, known == Some(false), scope)?;

    let step = match step {
        Some(step) => Some(check_stmt(checker, step, scope)?),
        None => None,
    };
    Ok((condition, known, body, step))
}

/// `break` and `continue`, optionally labelled.
pub fn check_jump(
    checker: &mut TypeChecker,
    is_break: bool,
    label: Option<&Ident>,
    span: &Span,
) -> Result<TypedStmtKind, Error> {
    let frame = checker.frame_mut();
    let position = match label {
        Some(label) => frame
            .loops
            .iter()
            .rposition(|frame| frame.label.as_deref() == Some(label.name.as_str())),
        None => frame.loops.len().checked_sub(1),
    };

    let keyword = if is_break { "break" } else { "continue" };
    let index = position.ok_or_else(|| {
        let statement = match label {
            Some(label) => format!("{} @{}", keyword, label),
            None => keyword.to_string(),
        };
        Error::new(ErrorImpl::NotInLoop { statement }, span.clone())
    })?;

    let reachable = frame.unreachable == 0;
    let target = &mut frame.loops[index];
    if is_break && reachable {
        target.has_break = true;
    }
    let (id, depth) = (target.id, target.body_depth);

    if reachable {
        let carried: Vec<(LocalId, Span)> = frame.blocks[depth..]
            .iter()
            .flat_map(|block| block.loop_moves.iter())
            .filter(|(local, _)| frame.outlives_loop(*local, index))
            .cloned()
            .collect();
        if !is_break {
            if let Some((local, moved)) = carried.into_iter().next() {
                return Err(moved_in_loop(frame, local, moved));
            }
        } else if let Some(outer) = depth.checked_sub(1) {
            frame.blocks[outer].loop_moves.extend(carried);
        }
    }

    let drops = frame.owned_since(depth);
    frame.top_block().break_from = Some(id);
    Ok(if is_break {
        TypedStmtKind::Break { target: id, drops }
    } else {
        TypedStmtKind::Continue { target: id, drops }
    })
}

pub fn check_return(
    checker: &mut TypeChecker,
    value: Option<&Expr>,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedStmtKind, Error> {
    let returns = checker.frame().returns.clone();
    let mismatch = |received: String| {
        Error::new(
            ErrorImpl::TypeMatchError {
                expected: returns.describe(),
                received,
            },
            span.clone(),
        )
    };

    let value = match (value, &returns.ty) {
        (None, Type::Void) => None,
        (None, _) => return Err(mismatch(String::from("void"))),
        (Some(value), Type::Void) => {
            let value = check_expr_allow_void(checker, value, scope)?;
            if value.ty.ty != Type::Void {
                return Err(mismatch(value.ty.describe()));
            }
            Some(value)
        }
        (Some(value), _) => {
            let value = check_expr(checker, value, Some(&returns), scope)?;
            consume(checker, &value)?;
            Some(value)
        }
    };

    let frame = checker.frame_mut();
    let drops = frame.owned_since(0);
    frame.top_block().returned = true;
    Ok(TypedStmtKind::Return { value, drops })
}

/// Lowers the body of a function or method into a typed tree.
pub fn check_function(checker: &mut TypeChecker, global: GlobalId) -> Result<TypedFunction, Error> {
    let def = &checker.globals[global.0];
    let (decl, owner) = match &def.kind {
        GlobalKind::Function { decl, owner } => (Rc::clone(decl), *owner),
        GlobalKind::Variable { .. } => {
            return Err(Error::new(ErrorImpl::NotCallable { ty: def.display.clone() }, def.name.span.clone()));
        }
    };
    let (scope, shown) = (Rc::clone(&def.scope), def.display.clone());
    debug!(function = %shown, "lowering body");

    let ty = checker.global_type(global, &decl.name.span)?;
    let (params, returns) = match ty.ty {
        Type::Func(func) => (func.params, *func.returns),
        _ => {
            return Err(Error::new(ErrorImpl::NotCallable { ty: ty.describe() }, decl.name.span.clone()));
        }
    };
    for (param, decl_param) in params.iter().rev().zip(decl.params.iter().rev()) {
        checker.require_complete(param, &decl_param.ty.span)?;
    }

    let mut frame = FunctionFrame::new(global, shown.clone(), Rc::clone(&scope), returns.clone());
    frame.blocks.push(BlockFrame::default());
    checker.frames.push(frame);
    let lowered = check_function_body(checker, &decl, owner, params, &scope);
    let frame = checker.frames.pop();
    let (param_ids, mut stmts) = lowered?;
    let Some(frame) = frame else {
        return Err(Error::new(ErrorImpl::NotCallable { ty: shown }, decl.name.span.clone()));
    };

    let block = &frame.blocks[0];
    if !block.terminated() {
        if returns.ty != Type::Void {
            return Err(Error::new(
                ErrorImpl::MissingReturn { function: shown },
                decl.name.span.clone(),
            ));
        }
        let drops = release_order(&frame, block);
        let span = decl.body.as_ref().map_or(decl.span.clone(), |body| body.span.clone());
        stmts.push(TypedStmt::new(TypedStmtKind::Return { value: None, drops }, span));
    }

    Ok(TypedFunction {
        global,
        params: param_ids,
        locals: frame.locals,
        body: TypedBlock { stmts, drops: vec![] },
        returns,
    })
}

fn check_function_body(
    checker: &mut TypeChecker,
    decl: &FnDecl,
    owner: Option<StructId>,
    params: Vec<AliasedType>,
    scope: &Rc<ModuleScope>,
) -> Result<(Vec<LocalId>, Vec<TypedStmt>), Error> {
    let mut params = params.into_iter();
    let mut ids = vec![];

    if let (Some(owner), true) = (owner, params.len() > decl.params.len()) {
        if let Some(this_ty) = params.next() {
            let this = Ident::new("this", decl.name.span.clone());
            let id = checker.declare_local(&this, this_ty, true, None)?;
            checker.frame_mut().receiver = Some((id, owner));
            ids.push(id);
        }
    }
    for (param, ty) in decl.params.iter().zip(params) {
        ids.push(checker.declare_local(&param.name, ty, false, None)?);
    }

    let body = match &decl.body {
        Some(body) => check_stmts(checker, &body.stmts, scope)?,
        None => vec![],
    };
    Ok((ids, body))
}

impl TypeChecker {
    /// Declares a local in the innermost block. Unique values start out
    /// owned.
    pub fn declare_local(
        &mut self,
        name: &Ident,
        ty: AliasedType,
        constant: bool,
        value: Option<ConstValue>,
    ) -> Result<LocalId, Error> {
        let frame = self.frame_mut();
        let block = &frame.blocks[frame.blocks.len() - 1];
        if let Some(previous) = block
            .locals
            .iter()
            .map(|id| &frame.locals[id.0])
            .find(|local| local.name.name == name.name)
        {
            return Err(Error::new(
                ErrorImpl::AlreadyExists {
                    kind: String::from("Variable"),
                    name: name.name.clone(),
                },
                name.span.clone(),
            )
            .with_related("Already declared here", previous.name.span.clone()));
        }

        let ownership = if ty.ty.is_copyable() {
            Ownership::Unset
        } else {
            Ownership::Owns
        };
        frame.locals.push(Local {
            name: name.clone(),
            ty,
            constant,
            ownership,
            value,
            depth: frame.blocks.len() - 1,
        });
        let id = LocalId(frame.locals.len() - 1);
        frame.top_block().locals.push(id);
        Ok(id)
    }
}
