//! Move tracking for unique values.
//!
//! A unique (non-copyable) value has exactly one holder. Reading a local
//! directly at a consume site (initializer, assignment source, argument,
//! return value, `new` operand, initializer element) moves the value out
//! and marks the local as moved. Moves are flow-insensitive: a move inside
//! a branch leaves the local moved for the rest of the function.
//!
//! Inside a loop, moving a local declared outside of it is only allowed on
//! paths that leave the loop or give the local a new value before the next
//! iteration. Such moves are parked on the innermost block and settled in
//! `control_flow` when the block closes or jumps.

use tracing::trace;

use crate::{
    errors::errors::{Error, ErrorImpl},
    symbols::scope::{FunctionFrame, LocalId, Ownership},
    types::types::AliasedType,
    Span,
};

use super::{
    control_flow::moved_in_loop,
    type_checker::TypeChecker,
    typed_ast::{StorageKind, TypedExpr, TypedExprKind},
};

/// Transfers ownership of `value` to its consumer. Only a direct read of a
/// local can be moved; unique values held anywhere else stay put.
pub fn consume(checker: &mut TypeChecker, value: &TypedExpr) -> Result<(), Error> {
    if value.ty.ty.is_copyable() {
        return Ok(());
    }

    let storage = match &value.kind {
        TypedExprKind::Load(storage) => storage,
        _ => return Ok(()),
    };
    match storage.kind {
        StorageKind::Local(id) => {
            trace!(local = checker.local_name(id), "moved");
            let frame = checker.frame_mut();
            frame.local_mut(id).ownership = Ownership::Moved(value.span.clone());
            park_loop_move(frame, id, &value.span)
        }
        _ => Err(Error::new(
            ErrorImpl::CannotTakeOwnership {
                ty: value.ty.describe(),
            },
            value.span.clone(),
        )),
    }
}

fn park_loop_move(frame: &mut FunctionFrame, id: LocalId, span: &Span) -> Result<(), Error> {
    let Some(index) = frame.loops.len().checked_sub(1) else {
        return Ok(());
    };
    if frame.unreachable > 0 || !frame.outlives_loop(id, index) {
        return Ok(());
    }
    if frame.blocks.len() <= frame.loops[index].body_depth {
        // Loop condition or step.
        return Err(moved_in_loop(frame, id, span.clone()));
    }
    frame.top_block().loop_moves.push((id, span.clone()));
    Ok(())
}

/// Records a store of a unique value into `target`. Returns whether the
/// previous value of the local has to be released first.
pub fn take_ownership(
    checker: &mut TypeChecker,
    target: &StorageKind,
    ty: &AliasedType,
    span: &Span,
) -> Result<bool, Error> {
    if ty.ty.is_copyable() {
        return Ok(false);
    }

    match target {
        StorageKind::Local(id) => {
            let frame = checker.frame_mut();
            frame.top_block().loop_moves.retain(|(moved, _)| moved != id);
            let local = frame.local_mut(*id);
            let release_prior = local.owns();
            local.ownership = Ownership::Owns;
            Ok(release_prior)
        }
        _ => Err(Error::new(
            ErrorImpl::CannotTakeOwnership { ty: ty.describe() },
            span.clone(),
        )),
    }
}
