use crate::{
    errors::errors::Error,
    type_checker::typed_ast::{TypedBlock, TypedExpr, TypedStmt, TypedStmtKind},
    types::types::ConstValue,
};

use super::{
    builder::Value,
    compiler::{Compiler, LoopLabels},
    expr::{gen_address, gen_expr},
};

/// Generates IR for a block: its reachable statements, then the release
/// of the owning locals if control can fall off its end.
pub fn gen_block(compiler: &mut Compiler, block: &TypedBlock) -> Result<(), Error> {
    for stmt in &block.stmts {
        if stmt.unreachable {
            continue;
        }
        gen_statement(compiler, stmt)?;
    }

    if !compiler.builder.is_terminated() {
        compiler.drop_locals(&block.drops)?;
    }
    Ok(())
}

/// Generates IR for a single statement.
///
/// # Arguments
///
/// * `compiler` - The compiler instance
/// * `stmt` - The typed statement
pub fn gen_statement(compiler: &mut Compiler, stmt: &TypedStmt) -> Result<(), Error> {
    match &stmt.kind {
        TypedStmtKind::Declare { local, value } => {
            let (slot, ty) = compiler.local(*local)?.clone();
            let value = match value {
                Some(value) => gen_expr(compiler, value)?,
                None => compiler.zero(&ty.ty),
            };
            compiler.builder.store(&value, &slot);
        }
        TypedStmtKind::Assign {
            target,
            value,
            release_prior,
        } => {
            let value = gen_expr(compiler, value)?;
            let address = gen_address(compiler, target)?;
            if *release_prior {
                let ty = compiler.ir_type(&target.ty.ty);
                let prior = compiler.builder.load(&ty, &address);
                compiler.release(&prior, &target.ty.ty);
            }
            compiler.builder.store(&value, &address);
        }
        TypedStmtKind::Expr { value, release } => {
            let result = gen_expr(compiler, value)?;
            if *release {
                compiler.release(&result, &value.ty.ty);
            }
        }
        TypedStmtKind::Return { value, drops } => {
            let value = match value {
                Some(value) => Some(gen_expr(compiler, value)?),
                None => None,
            };
            compiler.drop_locals(drops)?;
            compiler.builder.ret(value.as_ref());
        }
        TypedStmtKind::Break { target, drops } => {
            let labels = compiler.loop_labels(*target)?;
            compiler.drop_locals(drops)?;
            compiler.builder.br(&labels.break_to);
        }
        TypedStmtKind::Continue { target, drops } => {
            let labels = compiler.loop_labels(*target)?;
            compiler.drop_locals(drops)?;
            compiler.builder.br(&labels.continue_to);
        }
        TypedStmtKind::If {
            branches,
            else_block,
        } => gen_if(compiler, branches, else_block.as_ref())?,
        TypedStmtKind::Loop {
            id,
            init,
            condition,
            step,
            body,
            exit_drops,
        } => {
            if let Some(init) = init {
                gen_statement(compiler, init)?;
            }

            let check = compiler.builder.new_label();
            let entry = compiler.builder.new_label();
            let next = compiler.builder.new_label();
            let end = compiler.builder.new_label();
            compiler.enter_loop(
                *id,
                LoopLabels {
                    continue_to: next.clone(),
                    break_to: end.clone(),
                },
            );

            compiler.builder.place_label(&check);
            match condition {
                Some(condition) if known(condition) != Some(true) => {
                    let value = gen_expr(compiler, condition)?;
                    compiler.builder.cond_br(&value, &entry, &end);
                }
                _ => compiler.builder.br(&entry),
            }

            compiler.builder.place_label(&entry);
            gen_block(compiler, body)?;

            compiler.builder.place_label(&next);
            if let Some(step) = step {
                gen_statement(compiler, step)?;
            }
            compiler.builder.br(&check);

            compiler.builder.place_label(&end);
            compiler.drop_locals(exit_drops)?;
        }
        TypedStmtKind::Scope(block) => gen_block(compiler, block)?,
    }
    Ok(())
}

fn known(condition: &TypedExpr) -> Option<bool> {
    condition.constant.as_ref().and_then(ConstValue::as_bool)
}

/// `if` chains. Arms with a constant-false condition are skipped; a
/// constant-true arm ends the chain.
fn gen_if(
    compiler: &mut Compiler,
    branches: &[(TypedExpr, TypedBlock)],
    else_block: Option<&TypedBlock>,
) -> Result<(), Error> {
    let end = compiler.builder.new_label();

    for (condition, block) in branches {
        match known(condition) {
            Some(false) => continue,
            Some(true) => {
                gen_block(compiler, block)?;
                compiler.builder.place_label(&end);
                return Ok(());
            }
            None => {}
        }

        let value: Value = gen_expr(compiler, condition)?;
        let then = compiler.builder.new_label();
        let otherwise = compiler.builder.new_label();
        compiler.builder.cond_br(&value, &then, &otherwise);

        compiler.builder.place_label(&then);
        gen_block(compiler, block)?;
        if !compiler.builder.is_terminated() {
            compiler.builder.br(&end);
        }
        compiler.builder.place_label(&otherwise);
    }

    if let Some(block) = else_block {
        gen_block(compiler, block)?;
    }
    compiler.builder.place_label(&end);
    Ok(())
}
