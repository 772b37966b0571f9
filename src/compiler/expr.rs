use crate::{
    ast::expressions::{BinaryOp, UnaryOp},
    errors::errors::{Error, ErrorImpl},
    type_checker::typed_ast::{CastKind, Storage, StorageKind, TypedExpr, TypedExprKind},
    types::types::{AliasedType, ConstValue, Type},
};

use super::{
    builder::{global_ref, Value},
    compiler::Compiler,
    stdlib::macro_handler,
};

/// Generates IR for an expression and returns its value.
///
/// Folded constants are emitted as literals without evaluating the tree
/// they were folded from.
///
/// # Arguments
///
/// * `compiler` - The compiler instance
/// * `expr` - The typed expression
///
/// # Returns
///
/// The resulting value; `void` for calls without a result.
pub fn gen_expr(compiler: &mut Compiler, expr: &TypedExpr) -> Result<Value, Error> {
    match (&expr.constant, &expr.ty.ty) {
        (Some(value @ (ConstValue::Int(_) | ConstValue::Bool(_))), Type::Int(_) | Type::Bool) => {
            return Ok(compiler.constant(value, &expr.ty.ty));
        }
        _ => {}
    }

    match &expr.kind {
        TypedExprKind::Int(value) => Ok(Value::new(
            compiler.ir_type(&expr.ty.ty),
            value.to_string(),
        )),
        TypedExprKind::Bool(value) => Ok(Value::new("i1", value.to_string())),
        TypedExprKind::Str(text) => Ok(compiler.builder.string(text)),
        TypedExprKind::Load(storage) => {
            let address = gen_address(compiler, storage)?;
            let ty = compiler.ir_type(&storage.ty.ty);
            Ok(compiler.builder.load(&ty, &address))
        }
        TypedExprKind::Function(id) => Ok(Value::new("ptr", global_ref(compiler.global_name(*id)))),
        TypedExprKind::Call { callee, args } => gen_call(compiler, callee, args),
        TypedExprKind::MacroCall { id, args } => {
            let def = &compiler.checker.macros[id.0];
            let handler = macro_handler(&def.full_name).ok_or_else(|| {
                Error::new(
                    ErrorImpl::MacroWithoutBody {
                        name: def.full_name.clone(),
                    },
                    expr.span.clone(),
                )
            })?;
            Ok(handler(compiler, &expr.span, args)?.unwrap_or_else(Value::void))
        }
        TypedExprKind::Binary { op, left, right } => gen_binary(compiler, *op, left, right, &expr.ty),
        TypedExprKind::Unary { op, operand } => {
            let value = gen_expr(compiler, operand)?;
            let ty = value.ty.clone();
            Ok(match op {
                UnaryOp::Neg => compiler
                    .builder
                    .instr(&ty, format!("sub {} 0, {}", ty, value.repr)),
                UnaryOp::Not => compiler
                    .builder
                    .instr(&ty, format!("xor {}, true", value)),
            })
        }
        TypedExprKind::AddressOf(storage) => gen_address(compiler, storage),
        TypedExprKind::Cast { value, kind } => {
            let value = gen_expr(compiler, value)?;
            Ok(match kind {
                CastKind::Pointer => value,
                CastKind::Int { from, to } if to > from => compiler
                    .builder
                    .instr(&format!("i{}", to), format!("sext {} to i{}", value, to)),
                CastKind::Int { from, to } if to < from => compiler
                    .builder
                    .instr(&format!("i{}", to), format!("trunc {} to i{}", value, to)),
                CastKind::Int { .. } => value,
            })
        }
        TypedExprKind::ExtractField { base, index } => {
            let base = gen_expr(compiler, base)?;
            let ty = compiler.ir_type(&expr.ty.ty);
            Ok(compiler
                .builder
                .instr(&ty, format!("extractvalue {}, {}", base, index)))
        }
        TypedExprKind::StructInit { id, values, heap } => {
            let ty = compiler.struct_ir_type(*id);
            let aggregate = gen_aggregate(compiler, &ty, values)?;
            if *heap {
                let size = compiler.size_of(&compiler.checker.struct_type(*id).ty);
                Ok(gen_heap_copy(compiler, &aggregate, size))
            } else {
                Ok(aggregate)
            }
        }
        TypedExprKind::ArrayInit { of, values, heap } => {
            let ty = format!("[{} x {}]", values.len(), compiler.ir_type(&of.ty));
            let aggregate = gen_aggregate(compiler, &ty, values)?;
            if *heap {
                let size = compiler.size_of(&of.ty) * values.len() as u64;
                Ok(gen_heap_copy(compiler, &aggregate, size))
            } else {
                Ok(aggregate)
            }
        }
        TypedExprKind::ArrayFill {
            of,
            size,
            value,
            heap,
        } => gen_array_fill(compiler, of, size, value, *heap, &expr.ty),
        TypedExprKind::New { value } => {
            let size = compiler.size_of(&value.ty.ty);
            let value = gen_expr(compiler, value)?;
            Ok(gen_heap_copy(compiler, &value, size))
        }
    }
}

/// Generates the address of a storage location.
///
/// # Arguments
///
/// * `compiler` - The compiler instance
/// * `storage` - The storage to address
///
/// # Returns
///
/// A `ptr` value pointing at the storage.
pub fn gen_address(compiler: &mut Compiler, storage: &Storage) -> Result<Value, Error> {
    match &storage.kind {
        StorageKind::Local(id) => Ok(compiler.local(*id)?.0.clone()),
        StorageKind::Global(id) => Ok(Value::new("ptr", global_ref(compiler.global_name(*id)))),
        StorageKind::Deref(pointer) => gen_expr(compiler, pointer),
        StorageKind::Field { base, id, index } => {
            let base = gen_expr(compiler, base)?;
            let ty = compiler.struct_ir_type(*id);
            Ok(compiler.builder.instr(
                "ptr",
                format!("getelementptr inbounds {}, {}, i32 0, i32 {}", ty, base, index),
            ))
        }
        StorageKind::Element { data, index } => {
            let data = gen_expr(compiler, data)?;
            let index = gen_expr(compiler, index)?;
            let ty = compiler.ir_type(&storage.ty.ty);
            Ok(compiler.builder.instr(
                "ptr",
                format!("getelementptr inbounds {}, {}, {}", ty, data, index),
            ))
        }
    }
}

fn gen_call(compiler: &mut Compiler, callee: &TypedExpr, args: &[TypedExpr]) -> Result<Value, Error> {
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

    let target = gen_expr(compiler, callee)?;
    let mut values = vec![];
    for (index, arg) in args.iter().enumerate() {
        let value = gen_expr(compiler, arg)?;
        // Default argument promotion for the variadic tail.
        let value = match (&arg.ty.ty, index >= func.params.len()) {
            (Type::Int(bits), true) if *bits < 32 => compiler
                .builder
                .instr("i32", format!("sext {} to i32", value)),
            (Type::Bool, true) => compiler
                .builder
                .instr("i32", format!("zext {} to i32", value)),
            _ => value,
        };
        values.push(value);
    }

    let returns = compiler.ir_type(&func.returns.ty);
    let signature = func.vararg.then(|| compiler.signature(&func));
    Ok(compiler
        .builder
        .call(&returns, &target.repr, &values, signature.as_deref()))
}

fn gen_binary(
    compiler: &mut Compiler,
    op: BinaryOp,
    left: &TypedExpr,
    right: &TypedExpr,
    ty: &AliasedType,
) -> Result<Value, Error> {
    let instruction = match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "sdiv",
        BinaryOp::Rem => "srem",
        BinaryOp::Eq => "icmp eq",
        BinaryOp::Ne => "icmp ne",
        BinaryOp::Lt => "icmp slt",
        BinaryOp::Le => "icmp sle",
        BinaryOp::Gt => "icmp sgt",
        BinaryOp::Ge => "icmp sge",
        BinaryOp::And | BinaryOp::Or => return gen_logical(compiler, op, left, right),
    };
    let left = gen_expr(compiler, left)?;
    let right = gen_expr(compiler, right)?;
    let result_ty = compiler.ir_type(&ty.ty);
    Ok(compiler.builder.instr(
        &result_ty,
        format!("{} {}, {}", instruction, left, right.repr),
    ))
}

/// `&&` and `||` evaluate their right operand only when needed.
fn gen_logical(
    compiler: &mut Compiler,
    op: BinaryOp,
    left: &TypedExpr,
    right: &TypedExpr,
) -> Result<Value, Error> {
    let left = gen_expr(compiler, left)?;
    let from_left = compiler.builder.current_label();
    let rhs = compiler.builder.new_label();
    let end = compiler.builder.new_label();

    let short_circuit = if op == BinaryOp::And {
        compiler.builder.cond_br(&left, &rhs, &end);
        "false"
    } else {
        compiler.builder.cond_br(&left, &end, &rhs);
        "true"
    };

    compiler.builder.place_label(&rhs);
    let right = gen_expr(compiler, right)?;
    let from_right = compiler.builder.current_label();
    compiler.builder.place_label(&end);

    Ok(compiler.builder.instr(
        "i1",
        format!(
            "phi i1 [ {}, %{} ], [ {}, %{} ]",
            short_circuit, from_left, right.repr, from_right
        ),
    ))
}

/// Builds a first-class aggregate from its element values.
fn gen_aggregate(compiler: &mut Compiler, ty: &str, values: &[TypedExpr]) -> Result<Value, Error> {
    let mut aggregate = Value::new(ty, "zeroinitializer");
    for (index, value) in values.iter().enumerate() {
        let value = gen_expr(compiler, value)?;
        aggregate = compiler.builder.instr(
            ty,
            format!("insertvalue {}, {}, {}", aggregate, value, index),
        );
    }
    Ok(aggregate)
}

/// Allocates `size` bytes and stores `value` there.
fn gen_heap_copy(compiler: &mut Compiler, value: &Value, size: u64) -> Value {
    let pointer = compiler.malloc(Value::new("i64", size.to_string()));
    compiler.builder.store(value, &pointer);
    pointer
}

/// `[n]T{v}`: fills a stack array or a fresh heap buffer in a loop.
fn gen_array_fill(
    compiler: &mut Compiler,
    of: &AliasedType,
    size: &TypedExpr,
    value: &TypedExpr,
    heap: bool,
    ty: &AliasedType,
) -> Result<Value, Error> {
    let count = gen_expr(compiler, size)?;
    let value = gen_expr(compiler, value)?;
    let element_ty = compiler.ir_type(&of.ty);

    let data = if heap {
        let element_size = compiler.size_of(&of.ty);
        let bytes = compiler
            .builder
            .instr("i64", format!("mul {}, {}", count, element_size));
        compiler.malloc(bytes)
    } else {
        let array_ty = compiler.ir_type(&ty.ty);
        compiler.builder.alloca(&array_ty)
    };

    let counter = compiler.builder.alloca("i64");
    compiler.builder.store(&Value::new("i64", "0"), &counter);
    let condition = compiler.builder.new_label();
    let body = compiler.builder.new_label();
    let end = compiler.builder.new_label();

    compiler.builder.place_label(&condition);
    let index = compiler.builder.load("i64", &counter);
    let more = compiler
        .builder
        .instr("i1", format!("icmp slt {}, {}", index, count.repr));
    compiler.builder.cond_br(&more, &body, &end);

    compiler.builder.place_label(&body);
    let slot = compiler.builder.instr(
        "ptr",
        format!("getelementptr inbounds {}, {}, {}", element_ty, data, index),
    );
    compiler.builder.store(&value, &slot);
    let next = compiler
        .builder
        .instr("i64", format!("add {}, 1", index));
    compiler.builder.store(&next, &counter);
    compiler.builder.br(&condition);

    compiler.builder.place_label(&end);
    if heap {
        Ok(data)
    } else {
        let array_ty = compiler.ir_type(&ty.ty);
        Ok(compiler.builder.load(&array_ty, &data))
    }
}
