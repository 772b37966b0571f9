use std::collections::HashMap;

use tracing::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    symbols::{
        scope::{LocalId, LoopId},
        symbols::{GlobalId, GlobalKind, ResolveState},
    },
    type_checker::{type_checker::TypeChecker, typed_ast::TypedFunction},
    types::types::{AliasedType, ConstValue, FuncType, StructId, Type},
    Span,
};

use super::{
    builder::{global_ref, type_ref, IrBuilder, Value},
    stmt::gen_block,
};

/// Jump targets of an enclosing loop.
#[derive(Debug, Clone)]
pub struct LoopLabels {
    pub continue_to: String,
    pub break_to: String,
}

/// The IR generator.
///
/// Walks the typed trees produced by the type checker and writes them
/// through an [`IrBuilder`]. Holds the per-function state (local slots
/// and loop labels) while a function body is being emitted.
pub struct Compiler<'a> {
    /// The finished compilation context
    pub checker: &'a TypeChecker,
    /// Output module
    pub builder: IrBuilder,
    /// Stack slots of the current function's locals, with their types
    locals: Vec<(Value, AliasedType)>,
    /// Labels of the loops in the current function
    loops: HashMap<LoopId, LoopLabels>,
}

impl<'a> Compiler<'a> {
    /// Creates a new Compiler over a checked compilation context.
    ///
    /// # Arguments
    ///
    /// * `checker` - Type checker that finished all three passes
    pub fn new(checker: &'a TypeChecker) -> Self {
        Compiler {
            checker,
            builder: IrBuilder::new(),
            locals: vec![],
            loops: HashMap::new(),
        }
    }

    /// Converts a semantic type to its IR type.
    ///
    /// Pointers, unsized arrays and functions are all opaque `ptr`s; an
    /// unsized array is represented by a pointer to its first element.
    pub fn ir_type(&self, ty: &Type) -> String {
        match ty {
            Type::Int(bits) => format!("i{}", bits),
            Type::Bool => String::from("i1"),
            Type::Void => String::from("void"),
            Type::Func(_)
            | Type::OwnerPointer { .. }
            | Type::SharedPointer { .. }
            | Type::Array { size: None, .. } => String::from("ptr"),
            Type::Array {
                of,
                size: Some(size),
                ..
            } => format!("[{} x {}]", size, self.ir_type(&of.ty)),
            Type::Struct(reference) => type_ref(&self.checker.structs[reference.id.0].ir_name),
        }
    }

    pub fn size_of(&self, ty: &Type) -> u64 {
        self.checker.size_of(ty)
    }

    pub fn struct_ir_type(&self, id: StructId) -> String {
        type_ref(&self.checker.structs[id.0].ir_name)
    }

    /// Zero value of a type, used for locals declared without initializer.
    pub fn zero(&self, ty: &Type) -> Value {
        let repr = match ty {
            Type::Int(_) => "0",
            Type::Bool => "false",
            Type::Func(_)
            | Type::OwnerPointer { .. }
            | Type::SharedPointer { .. }
            | Type::Array { size: None, .. } => "null",
            _ => "zeroinitializer",
        };
        Value::new(self.ir_type(ty), repr)
    }

    /// Literal operand for a folded constant.
    pub fn constant(&mut self, value: &ConstValue, ty: &Type) -> Value {
        match value {
            ConstValue::Int(value) => Value::new(self.ir_type(ty), value.to_string()),
            ConstValue::Bool(value) => Value::new("i1", value.to_string()),
            ConstValue::Str(text) => self.builder.string(text),
        }
    }

    pub fn global_name(&self, id: GlobalId) -> &str {
        &self.checker.globals[id.0].ir_name
    }

    /// Function signature of a global, if it is a resolved function.
    pub fn func_type(&self, id: GlobalId) -> Option<&FuncType> {
        match self.checker.globals[id.0].ty.as_ref().map(|ty| &ty.ty) {
            Some(Type::Func(func)) => Some(func),
            _ => None,
        }
    }

    /// IR function type used at call sites of vararg callees.
    pub fn signature(&self, func: &FuncType) -> String {
        let mut params: Vec<String> = func.params.iter().map(|p| self.ir_type(&p.ty)).collect();
        if func.vararg {
            params.push(String::from("..."));
        }
        format!("{} ({})", self.ir_type(&func.returns.ty), params.join(", "))
    }

    pub fn local(&self, id: LocalId) -> Result<&(Value, AliasedType), Error> {
        self.locals
            .get(id.0)
            .ok_or_else(|| Error::new(ErrorImpl::ExpectedVariable, Span::null()))
    }

    pub fn loop_labels(&self, id: LoopId) -> Result<LoopLabels, Error> {
        self.loops.get(&id).cloned().ok_or_else(|| {
            Error::new(
                ErrorImpl::NotInLoop {
                    statement: String::from("break"),
                },
                Span::null(),
            )
        })
    }

    pub fn enter_loop(&mut self, id: LoopId, labels: LoopLabels) {
        self.loops.insert(id, labels);
    }

    /// Heap allocation of `size` bytes.
    pub fn malloc(&mut self, size: Value) -> Value {
        self.builder
            .call("ptr", &global_ref("malloc"), &[size], None)
    }

    /// Releases a unique value that goes out of scope.
    ///
    /// Owner pointers are freed; sized arrays release each element. Other
    /// types own nothing.
    ///
    /// # Arguments
    ///
    /// * `value` - The value being released
    /// * `ty` - Its semantic type
    pub fn release(&mut self, value: &Value, ty: &Type) {
        match ty {
            Type::OwnerPointer { .. } => {
                self.builder
                    .call("void", &global_ref("free"), &[value.clone()], None);
            }
            Type::Array {
                of,
                size: Some(size),
                ..
            } if !of.ty.is_copyable() => {
                let element_ty = self.ir_type(&of.ty);
                for index in 0..*size {
                    let element = self
                        .builder
                        .instr(&element_ty, format!("extractvalue {}, {}", value, index));
                    self.release(&element, &of.ty);
                }
            }
            _ => {}
        }
    }

    /// Loads and releases the given locals, innermost first.
    pub fn drop_locals(&mut self, locals: &[LocalId]) -> Result<(), Error> {
        for id in locals {
            let (slot, ty) = self.local(*id)?.clone();
            let ir_ty = self.ir_type(&ty.ty);
            let value = self.builder.load(&ir_ty, &slot);
            self.release(&value, &ty.ty);
        }
        Ok(())
    }

    /// Declares the runtime functions every module may call.
    fn declare_runtime(&mut self) {
        self.builder
            .declare_function("malloc", "ptr", &[String::from("i64")], false);
        self.builder
            .declare_function("free", "void", &[String::from("ptr")], false);
        self.builder
            .declare_function("printf", "i32", &[String::from("ptr")], true);
    }

    /// Emits the named type of every completed struct.
    fn gen_structs(&mut self) {
        let checker = self.checker;
        for def in &checker.structs {
            if def.state != ResolveState::Complete {
                continue;
            }
            let fields: Vec<String> = def
                .fields
                .iter()
                .map(|field| self.ir_type(&field.ty.ty))
                .collect();
            self.builder.define_struct(&def.ir_name, &fields);
        }
    }

    /// Emits global variables and declares external functions.
    fn gen_globals(&mut self) {
        let checker = self.checker;
        for global in &checker.globals {
            let Some(ty) = &global.ty else {
                continue;
            };
            match &global.kind {
                GlobalKind::Variable { .. } => {
                    let value = match &global.value {
                        Some(value) => self.constant(value, &ty.ty),
                        None => self.zero(&ty.ty),
                    };
                    self.builder
                        .define_global(&global.ir_name, global.constant, &value);
                }
                GlobalKind::Function { .. } if global.is_external() => {
                    if let Type::Func(func) = &ty.ty {
                        let params: Vec<String> =
                            func.params.iter().map(|p| self.ir_type(&p.ty)).collect();
                        let returns = self.ir_type(&func.returns.ty);
                        self.builder
                            .declare_function(&global.ir_name, &returns, &params, func.vararg);
                    }
                }
                GlobalKind::Function { .. } => {}
            }
        }
    }

    /// Emits one function definition.
    ///
    /// Every local gets an entry-block slot; parameters are spilled into
    /// theirs before the body runs.
    ///
    /// # Arguments
    ///
    /// * `function` - The lowered function body
    fn gen_function(&mut self, function: &TypedFunction) -> Result<(), Error> {
        let global = &self.checker.globals[function.global.0];
        let name = global.ir_name.clone();
        debug!(function = %global.display, "emitting");

        let params: Vec<String> = function
            .params
            .iter()
            .map(|id| self.ir_type(&function.locals[id.0].ty.ty))
            .collect();
        let returns = self.ir_type(&function.returns.ty);
        let values = self.builder.begin_function(&name, &returns, &params);

        self.loops.clear();
        self.locals.clear();
        for local in &function.locals {
            let ir_ty = self.ir_type(&local.ty.ty);
            let slot = self.builder.alloca(&ir_ty);
            self.locals.push((slot, local.ty.clone()));
        }

        for (id, value) in function.params.iter().zip(values) {
            let slot = self.local(*id)?.0.clone();
            self.builder.store(&value, &slot);
        }

        gen_block(self, &function.body)?;
        self.builder.end_function();
        Ok(())
    }

    /// Emits `@main`, calling the entry point and returning its status.
    fn gen_entry_wrapper(&mut self, entry: GlobalId) {
        let name = global_ref(self.global_name(entry));
        let returns = self
            .func_type(entry)
            .map(|func| self.ir_type(&func.returns.ty))
            .unwrap_or_else(|| String::from("void"));

        self.builder.begin_function("main", "i32", &[]);
        let status = self.builder.call(&returns, &name, &[], None);
        if status.is_void() {
            self.builder.ret(Some(&Value::new("i32", "0")));
        } else {
            self.builder.ret(Some(&status));
        }
        self.builder.end_function();
    }
}

/// Emits the IR module for a fully checked compilation context.
///
/// This is the entry point of code generation. It:
/// 1. Declares the runtime functions
/// 2. Emits struct types and global variables
/// 3. Emits every lowered function body
/// 4. Emits the `main` wrapper around the entry point, if there is one
///
/// # Arguments
///
/// * `checker` - Type checker that finished all three passes
///
/// # Returns
///
/// The textual IR module, or the first error raised by a macro handler.
pub fn emit_module(checker: &TypeChecker) -> Result<String, Error> {
    let mut compiler = Compiler::new(checker);

    compiler.declare_runtime();
    compiler.gen_structs();
    compiler.gen_globals();

    for function in &checker.functions {
        compiler.gen_function(function)?;
    }

    if let Some(entry) = checker.entry {
        compiler.gen_entry_wrapper(entry);
    }

    Ok(compiler.builder.finish())
}
