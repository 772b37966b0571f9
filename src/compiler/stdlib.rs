//! Bundled standard library.
//!
//! The `std` package is plain source text parsed ahead of the user's files.
//! It declares the runtime externs and the `print`/`println` macros, whose
//! bodies are the handlers registered here.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::{
    errors::errors::{Error, ErrorImpl},
    type_checker::typed_ast::TypedExpr,
    types::types::{ConstValue, Type},
    Span,
};

use super::{
    builder::{global_ref, Value},
    compiler::Compiler,
    expr::gen_expr,
};

pub const STD_PRELUDE: &str = r#"package std;

macro print(#const i8[], ...);
macro println(#const i8[], ...);

fn malloc(size: i64): *i8;
fn free(ptr: *i8);
fn printf(format: const i8[], ...): i32;
fn atoi(text: const i8[]): i32;
fn rand(): i32;
fn srand(seed: i32);
"#;

/// Lowers a macro call from its source location and typed arguments.
pub type MacroHandler = fn(&mut Compiler, &Span, &[TypedExpr]) -> Result<Option<Value>, Error>;

lazy_static! {
    static ref MACRO_HANDLERS: HashMap<&'static str, MacroHandler> = {
        let mut handlers: HashMap<&'static str, MacroHandler> = HashMap::new();
        handlers.insert("std::print", print);
        handlers.insert("std::println", println);
        handlers
    };
}

pub fn has_macro_handler(name: &str) -> bool {
    MACRO_HANDLERS.contains_key(name)
}

pub fn macro_handler(name: &str) -> Option<MacroHandler> {
    MACRO_HANDLERS.get(name).copied()
}

fn print(compiler: &mut Compiler, span: &Span, args: &[TypedExpr]) -> Result<Option<Value>, Error> {
    gen_print(compiler, span, args, false)
}

fn println(compiler: &mut Compiler, span: &Span, args: &[TypedExpr]) -> Result<Option<Value>, Error> {
    gen_print(compiler, span, args, true)
}

/// A `printf` call under construction.
#[derive(Default)]
struct Printf {
    format: String,
    args: Vec<Value>,
}

impl Printf {
    fn text(&mut self, text: &str) {
        self.format.push_str(&text.replace('%', "%%"));
    }

    fn arg(&mut self, spec: &str, value: Value) {
        self.format.push_str(spec);
        self.args.push(value);
    }
}

/// Substitutes every `%` of the constant format string with the next
/// argument and prints the result through `printf`. The arguments are
/// owned by the macro and released afterwards.
fn gen_print(
    compiler: &mut Compiler,
    span: &Span,
    args: &[TypedExpr],
    newline: bool,
) -> Result<Option<Value>, Error> {
    let Some((format, values)) = args.split_first() else {
        return Err(Error::new(
            ErrorImpl::UnexpectedArguments {
                expected: 1,
                received: 0,
            },
            span.clone(),
        ));
    };
    let Some(ConstValue::Str(text)) = &format.constant else {
        return Err(Error::new(ErrorImpl::ExpectedConstant, format.span.clone()));
    };

    let pieces: Vec<&str> = text.split('%').collect();
    if pieces.len() - 1 != values.len() {
        return Err(Error::new(
            ErrorImpl::FormatArguments {
                expected: pieces.len() - 1,
                received: values.len(),
            },
            span.clone(),
        ));
    }

    let mut printf = Printf::default();
    let mut owned = vec![];
    for (piece, value) in pieces.iter().zip(values.iter().map(Some).chain([None])) {
        printf.text(piece);
        if let Some(value) = value {
            let generated = gen_expr(compiler, value)?;
            format_value(compiler, &mut printf, generated.clone(), &value.ty.ty, &value.span)?;
            if !value.ty.ty.is_copyable() {
                owned.push((generated, value.ty.ty.clone()));
            }
        }
    }
    if newline {
        printf.format.push('\n');
    }

    let format = compiler.builder.string(&printf.format);
    let mut call_args = vec![format];
    call_args.extend(printf.args);
    compiler
        .builder
        .call("i32", &global_ref("printf"), &call_args, Some("i32 (ptr, ...)"));

    for (value, ty) in owned {
        compiler.release(&value, &ty);
    }
    Ok(None)
}

/// Appends the conversion for one value, recursing into arrays and
/// structs.
fn format_value(
    compiler: &mut Compiler,
    printf: &mut Printf,
    value: Value,
    ty: &Type,
    span: &Span,
) -> Result<(), Error> {
    match ty {
        Type::Int(64) => printf.arg("%lld", value),
        Type::Int(32) => printf.arg("%d", value),
        Type::Int(_) => {
            let widened = compiler
                .builder
                .instr("i32", format!("sext {} to i32", value));
            printf.arg("%d", widened);
        }
        Type::Bool => {
            let yes = compiler.builder.string("true");
            let no = compiler.builder.string("false");
            let text = compiler
                .builder
                .instr("ptr", format!("select {}, {}, {}", value, yes, no));
            printf.arg("%s", text);
        }
        ty if ty.is_string() => printf.arg("%s", value),
        Type::Array {
            of,
            size: Some(size),
            ..
        } => {
            let element_ty = compiler.ir_type(&of.ty);
            printf.text("[");
            for index in 0..*size {
                if index > 0 {
                    printf.text(", ");
                }
                let element = compiler
                    .builder
                    .instr(&element_ty, format!("extractvalue {}, {}", value, index));
                format_value(compiler, printf, element, &of.ty, span)?;
            }
            printf.text("]");
        }
        Type::Struct(reference) => {
            let def = &compiler.checker.structs[reference.id.0];
            let fields: Vec<(String, Type)> = def
                .fields
                .iter()
                .map(|field| (field.name.name.clone(), field.ty.ty.clone()))
                .collect();
            printf.text(&format!("{}{{", def.name.name));
            for (index, (name, field_ty)) in fields.iter().enumerate() {
                if index > 0 {
                    printf.text(", ");
                }
                printf.text(&format!("{}: ", name));
                let ir_ty = compiler.ir_type(field_ty);
                let field = compiler
                    .builder
                    .instr(&ir_ty, format!("extractvalue {}, {}", value, index));
                format_value(compiler, printf, field, field_ty, span)?;
            }
            printf.text("}");
        }
        _ => {
            let text = gen_to_string(compiler, value, ty).ok_or_else(|| {
                Error::new(ErrorImpl::UnprintableType { ty: ty.to_string() }, span.clone())
            })?;
            printf.arg("%s", text);
        }
    }
    Ok(())
}

/// Calls `_string` on a pointer to a struct that declares a string
/// conversion method.
fn gen_to_string(compiler: &mut Compiler, pointer: Value, ty: &Type) -> Option<Value> {
    let (pointee, _) = ty.pointee()?;
    let reference = pointee.ty.struct_ref()?;
    let method = *compiler.checker.structs[reference.id.0]
        .members
        .get("_string")?;

    let func = compiler.func_type(method)?;
    if !func.returns.ty.is_string() || func.params.len() != 1 {
        return None;
    }
    let name = global_ref(compiler.global_name(method));
    Some(compiler.builder.call("ptr", &name, &[pointer], None))
}
