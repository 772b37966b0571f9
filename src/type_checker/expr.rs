use std::rc::Rc;

use crate::{
    ast::{
        ast::Ident,
        expressions::{BinaryOp, Expr, ExprKind, UnaryOp},
        types::TypeExpr,
    },
    compiler::stdlib::has_macro_handler,
    errors::errors::{Error, ErrorImpl},
    symbols::{scope::Ownership, symbols::ModuleScope},
    types::types::{int_fits, AliasedType, ConstValue, FuncType, Type},
    Span,
};

use super::{
    ownership::consume,
    resolve::Symbol,
    type_checker::TypeChecker,
    typed_ast::{CastKind, Storage, StorageKind, TypedExpr, TypedExprKind},
};

/// Result of lowering an expression that may denote a location.
#[derive(Debug)]
pub enum Place {
    Storage(Storage),
    Value(TypedExpr),
}

fn is_int(ty: &&AliasedType) -> bool {
    matches!(ty.ty, Type::Int(_))
}

fn is_int_literal(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Number(_) => true,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => matches!(operand.kind, ExprKind::Number(_)),
        _ => false,
    }
}

/// Lowers an expression used as a value, converting it to `expected` when
/// given. Void results are rejected.
pub fn check_expr(
    checker: &mut TypeChecker,
    expr: &Expr,
    expected: Option<&AliasedType>,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let value = check_raw(checker, expr, expected, scope)?;
    if value.ty.ty == Type::Void {
        return Err(Error::new(
            ErrorImpl::IllegalType {
                ty: value.ty.describe(),
            },
            expr.span.clone(),
        ));
    }

    match expected {
        Some(expected) => coerce(value, expected),
        None => Ok(value),
    }
}

/// Lowers an expression statement, where a void result is fine.
pub fn check_expr_allow_void(
    checker: &mut TypeChecker,
    expr: &Expr,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    check_raw(checker, expr, None, scope)
}

fn check_raw(
    checker: &mut TypeChecker,
    expr: &Expr,
    expected: Option<&AliasedType>,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let span = expr.span.clone();
    match &expr.kind {
        ExprKind::Number(value) => check_number(*value as i128, expected, &span),
        ExprKind::Bool(value) => Ok(TypedExpr::new(
            TypedExprKind::Bool(*value),
            Type::Bool.into(),
            span,
        )
        .with_constant(Some(ConstValue::Bool(*value)))),
        ExprKind::Str(value) => Ok(TypedExpr::new(
            TypedExprKind::Str(value.clone()),
            Type::string().into(),
            span,
        )
        .with_constant(Some(ConstValue::Str(value.clone())))),
        ExprKind::Call { callee, args } => check_call(checker, callee, args, &span, scope),
        ExprKind::MacroCall { path, args } => check_macro_call(checker, path, args, &span, scope),
        ExprKind::Binary { op, left, right } => {
            check_binary(checker, *op, left, right, expected, &span, scope)
        }
        ExprKind::Unary { op, operand } => check_unary(checker, *op, operand, expected, &span, scope),
        ExprKind::Ref { target, constant } => {
            let storage = check_storage(checker, target, false, scope)?;
            let ty = Type::SharedPointer {
                to: Box::new(storage.ty.clone()),
                constant: *constant || storage.constant,
            };
            Ok(TypedExpr::new(
                TypedExprKind::AddressOf(Box::new(storage)),
                ty.into(),
                span,
            ))
        }
        ExprKind::Share(inner) => {
            let value = check_expr(checker, inner, None, scope)?;
            let shared = match &value.ty.ty {
                Type::OwnerPointer { to, constant } => Type::SharedPointer {
                    to: to.clone(),
                    constant: *constant,
                },
                _ => {
                    return Err(Error::new(
                        ErrorImpl::InvalidOperand {
                            op: String::from("#"),
                            ty: value.ty.describe(),
                        },
                        span,
                    ));
                }
            };
            Ok(TypedExpr::new(
                TypedExprKind::Cast {
                    value: Box::new(value),
                    kind: CastKind::Pointer,
                },
                shared.into(),
                span,
            ))
        }
        ExprKind::New { ty, value } => check_new(checker, ty, value, &span, scope),
        ExprKind::StructInit { ty, fields, heap } => {
            check_struct_init(checker, ty, fields, *heap, &span, scope)
        }
        ExprKind::ArrayInit { of, values, heap } => {
            check_array_init(checker, of, values, *heap, &span, scope)
        }
        ExprKind::ArrayFill {
            of,
            size,
            value,
            heap,
        } => check_array_fill(checker, of, size, value, *heap, &span, scope),
        ExprKind::Path { .. } | ExprKind::Deref(_) | ExprKind::Index { .. } | ExprKind::Member { .. } => {
            let place = check_place(checker, expr, false, scope)?;
            place_value(checker, place)
        }
    }
}

/// Lowers an expression that may denote a location. `write` marks the
/// direct target of an assignment, which may be a moved local.
pub fn check_place(
    checker: &mut TypeChecker,
    expr: &Expr,
    write: bool,
    scope: &Rc<ModuleScope>,
) -> Result<Place, Error> {
    let span = expr.span.clone();
    match &expr.kind {
        ExprKind::Path { path, args } => match checker.resolve_path(path, args, scope)? {
            Symbol::Local(id) => {
                let local = checker.frame().local(id);
                if let (Ownership::Moved(at), false) = (&local.ownership, write) {
                    return Err(Error::new(
                        ErrorImpl::MovedValue {
                            name: local.name.name.clone(),
                        },
                        span,
                    )
                    .with_related("Moved here", at.clone()));
                }
                Ok(Place::Storage(Storage {
                    kind: StorageKind::Local(id),
                    ty: local.ty.clone(),
                    constant: local.constant,
                    span,
                }))
            }
            Symbol::Global(id) => {
                let ty = checker.global_type(id, &span)?;
                let global = &checker.globals[id.0];
                if global.is_function() {
                    return Ok(Place::Value(TypedExpr::new(TypedExprKind::Function(id), ty, span)));
                }
                Ok(Place::Storage(Storage {
                    kind: StorageKind::Global(id),
                    ty,
                    constant: global.constant,
                    span,
                }))
            }
            Symbol::Field { this, id, index } => {
                let this_ty = checker.frame().local(this).ty.clone();
                let field = &checker.structs[id.0].fields[index];
                let constant = this_ty.ty.is_constant() || field.constant;
                let ty = field.ty.clone();
                let base = TypedExpr::load(Storage {
                    kind: StorageKind::Local(this),
                    ty: this_ty,
                    constant: true,
                    span: span.clone(),
                });
                Ok(Place::Storage(Storage {
                    kind: StorageKind::Field {
                        base: Box::new(base),
                        id,
                        index,
                    },
                    ty,
                    constant,
                    span,
                }))
            }
        },
        ExprKind::Deref(inner) => {
            let pointer = check_expr(checker, inner, None, scope)?;
            let (to, constant) = match pointer.ty.ty.pointee() {
                Some((to, constant)) => (to.clone(), constant),
                None => {
                    return Err(Error::new(
                        ErrorImpl::NotDereferenceable {
                            ty: pointer.ty.describe(),
                        },
                        span,
                    ));
                }
            };
            if to.ty.is_unsized_array() {
                return Err(Error::new(
                    ErrorImpl::UnsizedDereference {
                        ty: pointer.ty.describe(),
                    },
                    span,
                ));
            }
            checker.require_complete(&to, &span)?;
            Ok(Place::Storage(Storage {
                kind: StorageKind::Deref(Box::new(pointer)),
                ty: to,
                constant,
                span,
            }))
        }
        ExprKind::Index { base, index } => check_index(checker, base, index, &span, scope),
        ExprKind::Member { base, member } => checker.check_member(base, member, &span, scope),
        _ => Ok(Place::Value(check_raw(checker, expr, None, scope)?)),
    }
}

/// Lowers an expression that has to denote a location.
pub fn check_storage(
    checker: &mut TypeChecker,
    expr: &Expr,
    write: bool,
    scope: &Rc<ModuleScope>,
) -> Result<Storage, Error> {
    match check_place(checker, expr, write, scope)? {
        Place::Storage(storage) => Ok(storage),
        Place::Value(_) => Err(Error::new(ErrorImpl::ExpectedVariable, expr.span.clone())),
    }
}

/// Reads a place. Known values of constant locals and globals are carried
/// along for folding.
pub fn place_value(checker: &TypeChecker, place: Place) -> Result<TypedExpr, Error> {
    let storage = match place {
        Place::Value(value) => return Ok(value),
        Place::Storage(storage) => storage,
    };

    let constant = match &storage.kind {
        StorageKind::Deref(_) if !storage.ty.ty.is_copyable() => {
            return Err(Error::new(
                ErrorImpl::UniqueDereference {
                    ty: storage.ty.describe(),
                },
                storage.span,
            ));
        }
        StorageKind::Local(id) => {
            let local = checker.frame().local(*id);
            local.value.clone().filter(|_| local.constant)
        }
        StorageKind::Global(id) => {
            let global = &checker.globals[id.0];
            global.value.clone().filter(|_| global.constant)
        }
        _ => None,
    };
    Ok(TypedExpr::load(storage).with_constant(constant))
}

fn check_index(
    checker: &mut TypeChecker,
    base: &Expr,
    index: &Expr,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<Place, Error> {
    let not_indexable = |ty: &AliasedType| {
        Error::new(
            ErrorImpl::NotIndexable { ty: ty.describe() },
            base.span.clone(),
        )
    };

    let (data, element, constant) = match check_place(checker, base, false, scope)? {
        Place::Storage(storage) if matches!(storage.ty.ty, Type::Array { size: Some(_), .. }) => {
            let (element, array_constant) = match &storage.ty.ty {
                Type::Array { of, constant, .. } => ((**of).clone(), *constant),
                _ => return Err(not_indexable(&storage.ty)),
            };
            let constant = storage.constant || array_constant;
            let pointer = Type::SharedPointer {
                to: Box::new(storage.ty.clone()),
                constant,
            };
            let data = TypedExpr::new(
                TypedExprKind::AddressOf(Box::new(storage)),
                pointer.into(),
                span.clone(),
            );
            (data, element, constant)
        }
        place => {
            let value = place_value(checker, place)?;
            let parts = match &value.ty.ty {
                Type::Array {
                    of,
                    constant,
                    size: None,
                } => Some(((**of).clone(), *constant)),
                Type::Array { size: Some(_), .. } => {
                    return Err(Error::new(ErrorImpl::ExpectedVariable, base.span.clone()));
                }
                Type::OwnerPointer { to, constant } | Type::SharedPointer { to, constant } => {
                    match &to.ty {
                        Type::Array {
                            of,
                            constant: array_constant,
                            ..
                        } => Some(((**of).clone(), *constant || *array_constant)),
                        _ => None,
                    }
                }
                _ => None,
            };
            match parts {
                Some((element, constant)) => (value, element, constant),
                None => return Err(not_indexable(&value.ty)),
            }
        }
    };

    let index = check_expr(checker, index, Some(&Type::i64().into()), scope)?;
    Ok(Place::Storage(Storage {
        kind: StorageKind::Element {
            data: Box::new(data),
            index: Box::new(index),
        },
        ty: element,
        constant,
        span: span.clone(),
    }))
}

/// Implicit conversions: integer width changes, owner to shared pointers,
/// mutable to constant views and pointers to sized arrays into pointers to
/// unsized arrays. Integer constants are range checked against the target.
pub fn coerce(value: TypedExpr, expected: &AliasedType) -> Result<TypedExpr, Error> {
    if value.ty == *expected {
        return Ok(value);
    }

    let cast = match (&value.ty.ty, &expected.ty) {
        (Type::Int(from), Type::Int(to)) => Some(CastKind::Int {
            from: *from,
            to: *to,
        }),
        (from, to) if pointer_coercible(from, to) || array_view(from, to) => Some(CastKind::Pointer),
        _ => None,
    };

    let span = value.span.clone();
    match cast {
        Some(CastKind::Int { from, to }) => {
            if let Some(ConstValue::Int(constant)) = value.constant {
                if !int_fits(constant, to) {
                    return Err(Error::new(
                        ErrorImpl::IntegerOutOfRange {
                            value: constant,
                            ty: expected.describe(),
                        },
                        span,
                    ));
                }
                return Ok(TypedExpr::new(TypedExprKind::Int(constant), expected.clone(), span)
                    .with_constant(Some(ConstValue::Int(constant))));
            }
            Ok(TypedExpr::new(
                TypedExprKind::Cast {
                    value: Box::new(value),
                    kind: CastKind::Int { from, to },
                },
                expected.clone(),
                span,
            ))
        }
        Some(CastKind::Pointer) => {
            let constant = value.constant.clone();
            Ok(TypedExpr::new(
                TypedExprKind::Cast {
                    value: Box::new(value),
                    kind: CastKind::Pointer,
                },
                expected.clone(),
                span,
            )
            .with_constant(constant))
        }
        None => Err(Error::new(
            ErrorImpl::TypeMatchError {
                expected: expected.describe(),
                received: value.ty.describe(),
            },
            span,
        )),
    }
}

fn pointer_coercible(from: &Type, to: &Type) -> bool {
    let (from_to, from_constant, from_owner) = match from {
        Type::OwnerPointer { to, constant } => (to, *constant, true),
        Type::SharedPointer { to, constant } => (to, *constant, false),
        _ => return false,
    };
    let (to_to, to_constant, to_owner) = match to {
        Type::OwnerPointer { to, constant } => (to, *constant, true),
        Type::SharedPointer { to, constant } => (to, *constant, false),
        _ => return false,
    };

    if (to_owner && !from_owner) || (from_constant && !to_constant) {
        return false;
    }
    from_to == to_to || array_view(&from_to.ty, &to_to.ty) || sized_to_unsized(&from_to.ty, &to_to.ty)
}

/// `T[N]` pointee seen as `T[]`.
fn sized_to_unsized(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (
            Type::Array {
                of: from_of,
                constant: from_constant,
                size: Some(_),
            },
            Type::Array {
                of: to_of,
                constant: to_constant,
                size: None,
            },
        ) => from_of == to_of && (*to_constant || !*from_constant),
        _ => false,
    }
}

/// `T[]` seen as `const T[]`.
fn array_view(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (
            Type::Array {
                of: from_of,
                constant: false,
                size: None,
            },
            Type::Array {
                of: to_of,
                constant: true,
                size: None,
            },
        ) => from_of == to_of,
        _ => false,
    }
}

/// Integer literals take the expected integer type, `i32` otherwise.
fn check_number(value: i128, expected: Option<&AliasedType>, span: &Span) -> Result<TypedExpr, Error> {
    let ty = expected
        .filter(is_int)
        .cloned()
        .unwrap_or_else(|| Type::i32().into());
    let bits = ty.ty.int_width().unwrap_or(32);
    if !int_fits(value, bits) {
        return Err(Error::new(
            ErrorImpl::IntegerOutOfRange {
                value,
                ty: ty.describe(),
            },
            span.clone(),
        ));
    }
    Ok(TypedExpr::new(TypedExprKind::Int(value), ty, span.clone()).with_constant(Some(ConstValue::Int(value))))
}

fn check_unary(
    checker: &mut TypeChecker,
    op: UnaryOp,
    operand: &Expr,
    expected: Option<&AliasedType>,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    if let (UnaryOp::Neg, ExprKind::Number(value)) = (op, &operand.kind) {
        return check_number(-(*value as i128), expected, span);
    }

    let hint = match op {
        UnaryOp::Neg => expected.filter(is_int).cloned(),
        UnaryOp::Not => Some(Type::Bool.into()),
    };
    let value = check_expr(checker, operand, hint.as_ref(), scope)?;
    let constant = match (op, &value.ty.ty, &value.constant) {
        (UnaryOp::Neg, Type::Int(bits), constant) => match constant {
            Some(ConstValue::Int(constant)) => {
                if !int_fits(-constant, *bits) {
                    return Err(Error::new(
                        ErrorImpl::IntegerOutOfRange {
                            value: -constant,
                            ty: value.ty.describe(),
                        },
                        span.clone(),
                    ));
                }
                Some(ConstValue::Int(-constant))
            }
            _ => None,
        },
        (UnaryOp::Not, Type::Bool, constant) => constant
            .as_ref()
            .and_then(ConstValue::as_bool)
            .map(|constant| ConstValue::Bool(!constant)),
        _ => {
            return Err(Error::new(
                ErrorImpl::InvalidOperand {
                    op: op.to_string(),
                    ty: value.ty.describe(),
                },
                span.clone(),
            ));
        }
    };

    let ty = value.ty.clone();
    Ok(TypedExpr::new(
        TypedExprKind::Unary {
            op,
            operand: Box::new(value),
        },
        ty,
        span.clone(),
    )
    .with_constant(constant))
}

fn check_binary(
    checker: &mut TypeChecker,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    expected: Option<&AliasedType>,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let bool_ty: AliasedType = Type::Bool.into();
    if op.is_logical() {
        let left = check_expr(checker, left, Some(&bool_ty), scope)?;
        let right = check_expr(checker, right, Some(&bool_ty), scope)?;
        let folded = match (
            left.constant.as_ref().and_then(ConstValue::as_bool),
            right.constant.as_ref().and_then(ConstValue::as_bool),
        ) {
            (Some(a), Some(b)) if op == BinaryOp::And => Some(ConstValue::Bool(a && b)),
            (Some(a), Some(b)) => Some(ConstValue::Bool(a || b)),
            _ => None,
        };
        return Ok(TypedExpr::new(
            TypedExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            bool_ty,
            span.clone(),
        )
        .with_constant(folded));
    }

    // A literal operand adopts the type of the other side.
    let hint = if op.is_comparison() {
        None
    } else {
        expected.filter(is_int)
    };
    let (left, right) = if hint.is_none() && is_int_literal(left) && !is_int_literal(right) {
        let right = check_expr(checker, right, None, scope)?;
        let left = check_expr(checker, left, Some(&right.ty).filter(is_int), scope)?;
        let right = coerce(right, &left.ty)?;
        (left, right)
    } else {
        let left = check_expr(checker, left, hint, scope)?;
        let right = check_expr(checker, right, Some(&left.ty), scope)?;
        (left, right)
    };

    let valid = match op {
        BinaryOp::Eq | BinaryOp::Ne => matches!(
            left.ty.ty,
            Type::Int(_) | Type::Bool | Type::OwnerPointer { .. } | Type::SharedPointer { .. } | Type::Func(_)
        ),
        _ => matches!(left.ty.ty, Type::Int(_)),
    };
    if !valid {
        return Err(Error::new(
            ErrorImpl::InvalidOperands {
                op: op.to_string(),
                left: left.ty.describe(),
                right: right.ty.describe(),
            },
            span.clone(),
        ));
    }

    let ty = if op.is_comparison() {
        bool_ty
    } else {
        left.ty.clone()
    };
    let folded = fold_binary(op, &left.constant, &right.constant);
    if let (Some(ConstValue::Int(value)), Some(bits)) = (&folded, ty.ty.int_width()) {
        if !int_fits(*value, bits) {
            return Err(Error::new(
                ErrorImpl::IntegerOutOfRange {
                    value: *value,
                    ty: ty.describe(),
                },
                span.clone(),
            ));
        }
    }

    Ok(TypedExpr::new(
        TypedExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        span.clone(),
    )
    .with_constant(folded))
}

fn fold_binary(op: BinaryOp, left: &Option<ConstValue>, right: &Option<ConstValue>) -> Option<ConstValue> {
    match (left, right) {
        (Some(ConstValue::Int(a)), Some(ConstValue::Int(b))) => {
            let (a, b) = (*a, *b);
            Some(match op {
                BinaryOp::Add => ConstValue::Int(a.checked_add(b)?),
                BinaryOp::Sub => ConstValue::Int(a.checked_sub(b)?),
                BinaryOp::Mul => ConstValue::Int(a.checked_mul(b)?),
                BinaryOp::Div => ConstValue::Int(a.checked_div(b)?),
                BinaryOp::Rem => ConstValue::Int(a.checked_rem(b)?),
                BinaryOp::Eq => ConstValue::Bool(a == b),
                BinaryOp::Ne => ConstValue::Bool(a != b),
                BinaryOp::Lt => ConstValue::Bool(a < b),
                BinaryOp::Le => ConstValue::Bool(a <= b),
                BinaryOp::Gt => ConstValue::Bool(a > b),
                BinaryOp::Ge => ConstValue::Bool(a >= b),
                BinaryOp::And | BinaryOp::Or => return None,
            })
        }
        (Some(ConstValue::Bool(a)), Some(ConstValue::Bool(b))) => match op {
            BinaryOp::Eq => Some(ConstValue::Bool(a == b)),
            BinaryOp::Ne => Some(ConstValue::Bool(a != b)),
            _ => None,
        },
        _ => None,
    }
}

fn check_call(
    checker: &mut TypeChecker,
    callee: &Expr,
    args: &[Expr],
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    if let ExprKind::Member { base, member } = &callee.kind {
        return checker.check_method_call(base, member, args, span, scope);
    }

    let callee = check_expr(checker, callee, None, scope)?;
    let func = match &callee.ty.ty {
        Type::Func(func) => func.clone(),
        _ => {
            return Err(Error::new(
                ErrorImpl::NotCallable {
                    ty: callee.ty.describe(),
                },
                callee.span.clone(),
            ));
        }
    };

    let args = check_args(checker, &func, vec![], args, span, scope)?;
    Ok(TypedExpr::new(
        TypedExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        (*func.returns).clone(),
        span.clone(),
    ))
}

/// Lowers call arguments after the already lowered `typed` prefix (the
/// receiver of a method call). Every argument is a consume site.
pub fn check_args(
    checker: &mut TypeChecker,
    func: &FuncType,
    mut typed: Vec<TypedExpr>,
    args: &[Expr],
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<Vec<TypedExpr>, Error> {
    let fixed = func.params.len();
    let received = typed.len() + args.len();
    if received < fixed || (!func.vararg && received > fixed) {
        return Err(Error::new(
            ErrorImpl::UnexpectedArguments {
                expected: fixed - typed.len(),
                received: args.len(),
            },
            span.clone(),
        ));
    }

    for arg in args {
        let param = func.params.get(typed.len());
        let value = check_expr(checker, arg, param, scope)?;
        consume(checker, &value)?;
        typed.push(value);
    }
    Ok(typed)
}

fn check_macro_call(
    checker: &mut TypeChecker,
    path: &[Ident],
    args: &[Expr],
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let id = checker.resolve_macro(path, scope)?;
    let def = &checker.macros[id.0];
    let (name, params, vararg, returns) = (
        def.full_name.clone(),
        def.params.clone(),
        def.decl.vararg,
        def.returns.clone(),
    );

    if !has_macro_handler(&name) {
        return Err(Error::new(ErrorImpl::MacroWithoutBody { name }, span.clone()));
    }
    if args.len() < params.len() || (!vararg && args.len() > params.len()) {
        return Err(Error::new(
            ErrorImpl::UnexpectedArguments {
                expected: params.len(),
                received: args.len(),
            },
            span.clone(),
        ));
    }

    let mut typed = vec![];
    for (index, arg) in args.iter().enumerate() {
        let param = params.get(index);
        let value = check_expr(checker, arg, param.map(|param| &param.ty), scope)?;
        if param.map_or(false, |param| param.constant) && value.constant.is_none() {
            return Err(Error::new(ErrorImpl::ExpectedConstant, arg.span.clone()));
        }
        consume(checker, &value)?;
        typed.push(value);
    }

    Ok(TypedExpr::new(
        TypedExprKind::MacroCall { id, args: typed },
        returns,
        span.clone(),
    ))
}

/// Resolves the element or pointee type of an allocation or initializer.
fn check_object_type(
    checker: &mut TypeChecker,
    ty: &TypeExpr,
    scope: &Rc<ModuleScope>,
) -> Result<AliasedType, Error> {
    let resolved = checker.resolve_type(ty, scope)?;
    checker.check_value_type(&resolved, &ty.span)?;
    checker.require_complete(&resolved, &ty.span)?;
    Ok(resolved)
}

fn owner_of(ty: AliasedType) -> AliasedType {
    Type::OwnerPointer {
        to: Box::new(ty),
        constant: false,
    }
    .into()
}

fn check_new(
    checker: &mut TypeChecker,
    ty: &TypeExpr,
    value: &Expr,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let pointee = check_object_type(checker, ty, scope)?;
    if pointee.ty.is_unsized_array() {
        return Err(Error::new(
            ErrorImpl::IllegalType {
                ty: pointee.describe(),
            },
            ty.span.clone(),
        ));
    }

    let value = check_expr(checker, value, Some(&pointee), scope)?;
    consume(checker, &value)?;
    Ok(TypedExpr::new(
        TypedExprKind::New {
            value: Box::new(value),
        },
        owner_of(pointee),
        span.clone(),
    ))
}

fn check_struct_init(
    checker: &mut TypeChecker,
    ty: &TypeExpr,
    fields: &[(Ident, Expr)],
    heap: bool,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let struct_ty = checker.resolve_type(ty, scope)?;
    let id = match &struct_ty.ty {
        Type::Struct(reference) => reference.id,
        _ => {
            return Err(Error::new(
                ErrorImpl::NotAStruct {
                    ty: struct_ty.describe(),
                },
                ty.span.clone(),
            ));
        }
    };
    checker.complete_struct(id, &ty.span)?;

    let defs = checker.structs[id.0].fields.clone();
    let mut values: Vec<Option<(TypedExpr, Span)>> = vec![None; defs.len()];
    for (name, expr) in fields {
        let index = defs
            .iter()
            .position(|def| def.name.name == name.name)
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::UndefinedProperty {
                        name: name.name.clone(),
                    },
                    name.span.clone(),
                )
            })?;
        if let Some((_, previous)) = &values[index] {
            return Err(Error::new(
                ErrorImpl::AlreadyExists {
                    kind: String::from("Property"),
                    name: name.name.clone(),
                },
                name.span.clone(),
            )
            .with_related("Already initialized here", previous.clone()));
        }

        let value = check_expr(checker, expr, Some(&defs[index].ty), scope)?;
        consume(checker, &value)?;
        values[index] = Some((value, name.span.clone()));
    }

    let values = values
        .into_iter()
        .zip(defs.iter())
        .map(|(value, def)| match value {
            Some((value, _)) => Ok(value),
            None => def.default.clone().ok_or_else(|| {
                Error::new(
                    ErrorImpl::MissingProperty {
                        name: def.name.name.clone(),
                    },
                    span.clone(),
                )
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ty = if heap { owner_of(struct_ty) } else { struct_ty };
    Ok(TypedExpr::new(
        TypedExprKind::StructInit { id, values, heap },
        ty,
        span.clone(),
    ))
}

fn check_array_init(
    checker: &mut TypeChecker,
    of: &TypeExpr,
    values: &[Expr],
    heap: bool,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let element = check_object_type(checker, of, scope)?;
    let mut typed = vec![];
    for value in values {
        let value = check_expr(checker, value, Some(&element), scope)?;
        consume(checker, &value)?;
        typed.push(value);
    }

    let ty = if heap {
        owner_of(
            Type::Array {
                of: Box::new(element.clone()),
                constant: false,
                size: None,
            }
            .into(),
        )
    } else {
        Type::Array {
            of: Box::new(element.clone()),
            constant: false,
            size: Some(typed.len() as u64),
        }
        .into()
    };
    Ok(TypedExpr::new(
        TypedExprKind::ArrayInit {
            of: element,
            values: typed,
            heap,
        },
        ty,
        span.clone(),
    ))
}

fn check_array_fill(
    checker: &mut TypeChecker,
    of: &TypeExpr,
    size: &Expr,
    value: &Expr,
    heap: bool,
    span: &Span,
    scope: &Rc<ModuleScope>,
) -> Result<TypedExpr, Error> {
    let element = check_object_type(checker, of, scope)?;
    if !element.ty.is_copyable() {
        return Err(Error::new(
            ErrorImpl::CannotTakeOwnership {
                ty: element.describe(),
            },
            value.span.clone(),
        ));
    }

    let size_value = check_expr(checker, size, Some(&Type::i64().into()), scope)?;
    let known = size_value.constant.as_ref().and_then(ConstValue::as_int);
    let invalid_size = || Error::new(ErrorImpl::InvalidArraySize, size.span.clone());
    if known.map_or(false, |known| known < 0) {
        return Err(invalid_size());
    }
    let value = check_expr(checker, value, Some(&element), scope)?;

    let ty = match (heap, known) {
        (true, _) => owner_of(
            Type::Array {
                of: Box::new(element.clone()),
                constant: false,
                size: None,
            }
            .into(),
        ),
        (false, Some(known)) => Type::Array {
            of: Box::new(element.clone()),
            constant: false,
            size: Some(known as u64),
        }
        .into(),
        (false, None) => return Err(invalid_size()),
    };
    Ok(TypedExpr::new(
        TypedExprKind::ArrayFill {
            of: element,
            size: Box::new(size_value),
            value: Box::new(value),
            heap,
        },
        ty,
        span.clone(),
    ))
}
