//! Textual LLVM IR builder.
//!
//! The builder collects the module in sections (struct types, globals,
//! declarations, definitions) and renders them with [`IrBuilder::finish`].
//! While a function is open, instructions are appended to its current
//! block. Allocas are hoisted into the entry block.

use std::{
    collections::{HashMap, HashSet},
    fmt::{Display, Write},
};

/// A typed IR operand, e.g. `i32 %t4` or `ptr @"main::x"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub ty: String,
    pub repr: String,
}

impl Value {
    pub fn new(ty: impl Into<String>, repr: impl Into<String>) -> Self {
        Value {
            ty: ty.into(),
            repr: repr.into(),
        }
    }

    pub fn void() -> Self {
        Value::new("void", "")
    }

    pub fn is_void(&self) -> bool {
        self.ty == "void"
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.repr)
    }
}

/// Quoted global symbol reference.
pub fn global_ref(name: &str) -> String {
    format!("@\"{}\"", name)
}

/// Quoted named type reference.
pub fn type_ref(name: &str) -> String {
    format!("%\"{}\"", name)
}

#[derive(Debug)]
struct FunctionState {
    header: String,
    allocas: Vec<String>,
    body: Vec<String>,
    temps: usize,
    label: String,
    terminated: bool,
}

#[derive(Debug, Default)]
pub struct IrBuilder {
    types: Vec<String>,
    globals: Vec<String>,
    declarations: Vec<String>,
    definitions: Vec<String>,
    declared: HashSet<String>,
    strings: HashMap<String, String>,
    labels: usize,
    function: Option<FunctionState>,
}

impl IrBuilder {
    pub fn new() -> Self {
        IrBuilder::default()
    }

    /// `%"name" = type <{ ... }>`. Structs are packed so that field offsets
    /// follow the size model used for allocations.
    pub fn define_struct(&mut self, name: &str, fields: &[String]) {
        self.types
            .push(format!("{} = type <{{ {} }}>", type_ref(name), fields.join(", ")));
    }

    pub fn define_global(&mut self, name: &str, constant: bool, value: &Value) {
        let kind = if constant { "constant" } else { "global" };
        self.globals
            .push(format!("{} = {} {}", global_ref(name), kind, value));
    }

    /// Interns a NUL-terminated string constant and returns a pointer to it.
    pub fn string(&mut self, text: &str) -> Value {
        if let Some(name) = self.strings.get(text) {
            return Value::new("ptr", name.clone());
        }

        let name = format!("@.str.{}", self.strings.len());
        let mut encoded = String::new();
        for byte in text.bytes() {
            match byte {
                0x20..=0x7e if byte != b'"' && byte != b'\\' => encoded.push(byte as char),
                _ => {
                    let _ = write!(encoded, "\\{:02X}", byte);
                }
            }
        }
        self.globals.push(format!(
            "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
            name,
            text.len() + 1,
            encoded
        ));
        self.strings.insert(text.to_string(), name.clone());
        Value::new("ptr", name)
    }

    /// Declares an external function. Later declarations of the same
    /// symbol are ignored.
    pub fn declare_function(&mut self, name: &str, returns: &str, params: &[String], vararg: bool) {
        if !self.declared.insert(name.to_string()) {
            return;
        }
        let mut params = params.to_vec();
        if vararg {
            params.push(String::from("..."));
        }
        self.declarations.push(format!(
            "declare {} {}({})",
            returns,
            global_ref(name),
            params.join(", ")
        ));
    }

    /// Opens a function definition and returns its parameter values.
    pub fn begin_function(&mut self, name: &str, returns: &str, params: &[String]) -> Vec<Value> {
        self.declared.insert(name.to_string());
        let values: Vec<Value> = params
            .iter()
            .enumerate()
            .map(|(index, ty)| Value::new(ty.clone(), format!("%p{}", index)))
            .collect();
        let header = format!(
            "define {} {}({}) {{",
            returns,
            global_ref(name),
            values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<String>>()
                .join(", ")
        );
        self.function = Some(FunctionState {
            header,
            allocas: vec![],
            body: vec![],
            temps: 0,
            label: String::from("entry"),
            terminated: false,
        });
        values
    }

    /// Closes the open function. A block left without a terminator can
    /// only be reached by falling off an infinite loop.
    pub fn end_function(&mut self) {
        if !self.is_terminated() {
            self.terminate("unreachable");
        }
        if let Some(function) = self.function.take() {
            let mut text = function.header;
            text.push_str("\nentry:\n");
            for line in function.allocas.iter().chain(function.body.iter()) {
                if line.ends_with(':') {
                    text.push_str(line);
                } else {
                    text.push_str("  ");
                    text.push_str(line);
                }
                text.push('\n');
            }
            text.push('}');
            self.definitions.push(text);
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.function.as_ref().map_or(true, |function| function.terminated)
    }

    pub fn current_label(&self) -> String {
        self.function
            .as_ref()
            .map_or_else(String::new, |function| function.label.clone())
    }

    pub fn new_label(&mut self) -> String {
        self.labels += 1;
        format!("L{}", self.labels)
    }

    /// Starts block `label`, falling through from the current block if it
    /// is still open.
    pub fn place_label(&mut self, label: &str) {
        if !self.is_terminated() {
            self.br(label);
        }
        if let Some(function) = &mut self.function {
            function.body.push(format!("{}:", label));
            function.label = label.to_string();
            function.terminated = false;
        }
    }

    fn push(&mut self, line: String) {
        if self.is_terminated() {
            let label = self.new_label();
            self.place_label(&label);
        }
        if let Some(function) = &mut self.function {
            function.body.push(line);
        }
    }

    fn temp(&mut self) -> String {
        match &mut self.function {
            Some(function) => {
                function.temps += 1;
                format!("%t{}", function.temps)
            }
            None => String::from("undef"),
        }
    }

    /// Emits an instruction without a result.
    pub fn emit(&mut self, instruction: String) {
        self.push(instruction);
    }

    /// Emits `%tN = instruction` and returns `%tN` typed as `ty`.
    pub fn instr(&mut self, ty: &str, instruction: String) -> Value {
        let temp = self.temp();
        self.push(format!("{} = {}", temp, instruction));
        Value::new(ty, temp)
    }

    pub fn terminate(&mut self, instruction: &str) {
        self.push(instruction.to_string());
        if let Some(function) = &mut self.function {
            function.terminated = true;
        }
    }

    /// Entry-block stack slot for a value of type `ty`.
    pub fn alloca(&mut self, ty: &str) -> Value {
        let temp = self.temp();
        if let Some(function) = &mut self.function {
            function.allocas.push(format!("{} = alloca {}", temp, ty));
        }
        Value::new("ptr", temp)
    }

    pub fn load(&mut self, ty: &str, address: &Value) -> Value {
        self.instr(ty, format!("load {}, {}", ty, address))
    }

    pub fn store(&mut self, value: &Value, address: &Value) {
        self.emit(format!("store {}, {}", value, address));
    }

    pub fn br(&mut self, label: &str) {
        self.terminate(&format!("br label %{}", label));
    }

    pub fn cond_br(&mut self, condition: &Value, then: &str, otherwise: &str) {
        self.terminate(&format!(
            "br {}, label %{}, label %{}",
            condition, then, otherwise
        ));
    }

    pub fn ret(&mut self, value: Option<&Value>) {
        match value {
            Some(value) if !value.is_void() => self.terminate(&format!("ret {}", value)),
            _ => self.terminate("ret void"),
        }
    }

    /// Direct or indirect call. `signature` is the explicit function type
    /// required for vararg callees.
    pub fn call(
        &mut self,
        returns: &str,
        callee: &str,
        args: &[Value],
        signature: Option<&str>,
    ) -> Value {
        let args = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<String>>()
            .join(", ");
        let ty = signature.unwrap_or(returns);
        if returns == "void" {
            self.emit(format!("call {} {}({})", ty, callee, args));
            Value::void()
        } else {
            self.instr(returns, format!("call {} {}({})", ty, callee, args))
        }
    }

    /// Renders the module.
    pub fn finish(self) -> String {
        let mut sections: Vec<String> = [self.types, self.globals, self.declarations]
            .into_iter()
            .filter(|section| !section.is_empty())
            .map(|section| section.join("\n"))
            .collect();
        sections.extend(self.definitions);

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }
}
