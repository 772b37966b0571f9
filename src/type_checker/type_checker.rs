use std::{collections::VecDeque, rc::Rc};

use tracing::{debug, trace};

use crate::{
    ast::{
        ast::Ident,
        statements::{FnDecl, FnKind, Item, ItemKind, SourceModule},
    },
    config::CompileOptions,
    errors::errors::{Error, ErrorImpl, Warning, WarningKind},
    symbols::{
        scope::{FunctionFrame, LocalId, LoopId},
        symbols::{
            AliasDef, AliasId, Global, GlobalId, GlobalKind, MacroDef, MacroId, ModuleScope,
            Package, PackageId, PackageMember, ResolveState, StructDef, TemplateDef, TemplateId,
        },
    },
    types::types::{AliasedType, StructId, Type},
    Span,
};

use super::{control_flow::check_function, typed_ast::TypedFunction};

/// Compilation context. Owns every arena, the pending work queues and the
/// collected warnings, and drives the three lowering passes:
///
/// 1. declare every top-level entity as a placeholder
/// 2. resolve signatures, struct layouts, aliases and global initializers
/// 3. lower function bodies into typed trees
#[derive(Debug)]
pub struct TypeChecker {
    pub options: CompileOptions,
    pub packages: Vec<Package>,
    pub globals: Vec<Global>,
    pub structs: Vec<StructDef>,
    pub aliases: Vec<AliasDef>,
    pub macros: Vec<MacroDef>,
    pub templates: Vec<TemplateDef>,
    /// Lowered bodies, in lowering order.
    pub functions: Vec<TypedFunction>,
    pub warnings: Vec<Warning>,
    pub entry: Option<GlobalId>,
    pub(crate) frames: Vec<FunctionFrame>,
    pub(crate) pending_bodies: VecDeque<GlobalId>,
    /// Template instances whose signature is being resolved.
    pub(crate) in_progress: Vec<(TemplateId, Vec<AliasedType>)>,
    pub(crate) instance_counter: usize,
    /// Nesting depth of the body being lowered.
    pub(crate) body_depth: usize,
    loop_counter: usize,
}

/// Naming of an entity created from a template.
pub(crate) struct InstanceNames {
    pub ir_suffix: usize,
    pub display: String,
}

impl TypeChecker {
    pub fn new(options: CompileOptions) -> Self {
        TypeChecker {
            options,
            packages: vec![],
            globals: vec![],
            structs: vec![],
            aliases: vec![],
            macros: vec![],
            templates: vec![],
            functions: vec![],
            warnings: vec![],
            entry: None,
            frames: vec![],
            pending_bodies: VecDeque::new(),
            in_progress: vec![],
            instance_counter: 0,
            body_depth: 0,
            loop_counter: 0,
        }
    }

    /// Runs all passes over the parsed modules.
    pub fn check_modules(&mut self, modules: Vec<SourceModule>) -> Result<(), Error> {
        debug!(modules = modules.len(), "declaring");
        for module in modules {
            self.declare_module(module)?;
        }

        debug!(packages = self.packages.len(), "resolving declarations");
        self.check_duplicates()?;
        self.resolve_declarations()?;

        debug!(pending = self.pending_bodies.len(), "lowering bodies");
        while let Some(global) = self.pending_bodies.pop_front() {
            self.body_depth = self.globals[global.0].depth;
            let function = check_function(self, global)?;
            self.functions.push(function);
        }

        self.check_entry_point()
    }

    pub fn find_package(&self, name: &str) -> Option<PackageId> {
        self.packages
            .iter()
            .position(|package| package.name == name)
            .map(PackageId)
    }

    /// Packages spring into existence on first reference.
    pub fn package_id(&mut self, name: &str) -> PackageId {
        match self.find_package(name) {
            Some(id) => id,
            None => {
                self.packages.push(Package::new(name));
                PackageId(self.packages.len() - 1)
            }
        }
    }

    pub fn warn(&mut self, kind: WarningKind, span: Span) {
        debug!(?kind, "warning");
        self.warnings.push(Warning::new(kind, span));
    }

    /// Template nesting at this point: the depth of the body being lowered
    /// plus the instances whose signatures are being resolved.
    pub(crate) fn instantiation_depth(&self) -> usize {
        self.body_depth + self.in_progress.len()
    }

    pub(crate) fn next_loop_id(&mut self) -> LoopId {
        self.loop_counter += 1;
        LoopId(self.loop_counter)
    }

    pub(crate) fn frame(&self) -> &FunctionFrame {
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn frame_mut(&mut self) -> &mut FunctionFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Runs `work` with no function open, so nested resolution never sees
    /// the locals of the body currently being lowered.
    pub(crate) fn detached<T>(
        &mut self,
        work: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let saved = std::mem::take(&mut self.frames);
        let result = work(self);
        self.frames = saved;
        result
    }

    pub fn struct_type(&self, id: StructId) -> AliasedType {
        AliasedType::new(Type::Struct(crate::types::types::StructRef {
            id,
            name: Rc::clone(&self.structs[id.0].display),
        }))
    }

    pub fn local_name(&self, id: LocalId) -> &str {
        &self.frame().local(id).name.name
    }

    fn declare_module(&mut self, module: SourceModule) -> Result<(), Error> {
        let package = self.package_id(&module.package.name);
        let mut imports = vec![];
        if let Some(std) = self.find_package("std") {
            if std != package {
                imports.push(std);
            }
        }
        for import in &module.imports {
            let id = self.package_id(&import.name);
            if !imports.contains(&id) && id != package {
                imports.push(id);
            }
        }

        let scope = Rc::new(ModuleScope {
            package,
            imports,
            bindings: Default::default(),
        });
        trace!(file = %module.file, package = %module.package, "declaring module");

        for item in module.items {
            let item = Rc::new(item);
            if item.template.is_empty() {
                self.declare_item(&item, &scope, None)?;
            } else {
                self.declare_template(item, &scope);
            }
        }
        Ok(())
    }

    fn declare_template(&mut self, item: Rc<Item>, scope: &Rc<ModuleScope>) {
        let name = item.name().clone();
        self.templates.push(TemplateDef {
            package: scope.package,
            name: name.clone(),
            params: item.template.clone(),
            item,
            scope: Rc::clone(scope),
            instances: vec![],
        });
        let id = TemplateId(self.templates.len() - 1);
        self.packages[scope.package.0].add(&name, PackageMember::Template(id));
    }

    /// Pass 1 for one item: registers a placeholder. Template instances are
    /// not added to the package namespace.
    pub(crate) fn declare_item(
        &mut self,
        item: &Item,
        scope: &Rc<ModuleScope>,
        instance: Option<InstanceNames>,
    ) -> Result<Option<PackageMember>, Error> {
        let package_name = self.packages[scope.package.0].name.clone();
        let name = item.name().clone();
        let (ir_name, display) = match &instance {
            Some(names) => (
                format!("{}::{}.{}", package_name, name, names.ir_suffix),
                names.display.clone(),
            ),
            None => (
                format!("{}::{}", package_name, name),
                format!("{}::{}", package_name, name),
            ),
        };
        let is_instance = instance.is_some();
        let depth = if is_instance { self.instantiation_depth() } else { 0 };

        let member = match &item.kind {
            ItemKind::Function(decl) => {
                let ir_name = if decl.body.is_none() {
                    decl.name.name.clone()
                } else {
                    ir_name
                };
                let id = self.declare_function(decl.clone(), scope, None, ir_name, display, is_instance);
                Some(PackageMember::Global(id))
            }
            ItemKind::Struct(decl) => {
                let display = Rc::new(display);
                self.structs.push(StructDef {
                    package: scope.package,
                    name: name.clone(),
                    display: Rc::clone(&display),
                    ir_name: ir_name.clone(),
                    decl: Rc::new(decl.clone()),
                    scope: Rc::clone(scope),
                    fields: vec![],
                    members: Default::default(),
                    member_order: vec![],
                    state: ResolveState::Declared,
                    instance: is_instance,
                });
                let id = StructId(self.structs.len() - 1);
                for method in &decl.methods {
                    let global = self.declare_function(
                        method.clone(),
                        scope,
                        Some(id),
                        format!("{}.{}", ir_name, method.name),
                        format!("{}::{}", display, method.name),
                        is_instance,
                    );
                    let def = &mut self.structs[id.0];
                    def.member_order.push(global);
                    def.members.entry(method.name.name.clone()).or_insert(global);
                }
                Some(PackageMember::Struct(id))
            }
            ItemKind::Global(decl) => {
                self.globals.push(Global {
                    package: scope.package,
                    name: name.clone(),
                    display,
                    ir_name,
                    constant: decl.constant,
                    kind: GlobalKind::Variable {
                        decl: Rc::new(decl.clone()),
                    },
                    scope: Rc::clone(scope),
                    ty: None,
                    state: ResolveState::Declared,
                    value: None,
                    instance: is_instance,
                    depth,
                });
                Some(PackageMember::Global(GlobalId(self.globals.len() - 1)))
            }
            ItemKind::Alias { name, target } => {
                self.aliases.push(AliasDef {
                    package: scope.package,
                    name: name.clone(),
                    display: Rc::new(display),
                    target: target.clone(),
                    scope: Rc::clone(scope),
                    resolved: None,
                    state: ResolveState::Declared,
                });
                Some(PackageMember::Alias(AliasId(self.aliases.len() - 1)))
            }
            ItemKind::Macro(decl) => {
                self.declare_macro(decl.clone(), scope, display)?;
                None
            }
        };

        if let (Some(member), false) = (member, is_instance) {
            self.packages[scope.package.0].add(&name, member);
        }
        Ok(member)
    }

    fn declare_function(
        &mut self,
        decl: FnDecl,
        scope: &Rc<ModuleScope>,
        owner: Option<StructId>,
        ir_name: String,
        display: String,
        instance: bool,
    ) -> GlobalId {
        let has_body = decl.body.is_some();
        let depth = if instance { self.instantiation_depth() } else { 0 };
        self.globals.push(Global {
            package: scope.package,
            name: decl.name.clone(),
            display,
            ir_name,
            constant: true,
            kind: GlobalKind::Function {
                decl: Rc::new(decl),
                owner,
            },
            scope: Rc::clone(scope),
            ty: None,
            state: ResolveState::Declared,
            value: None,
            instance,
            depth,
        });
        let id = GlobalId(self.globals.len() - 1);
        if has_body {
            self.pending_bodies.push_back(id);
        }
        id
    }

    fn declare_macro(
        &mut self,
        decl: crate::ast::statements::MacroDecl,
        scope: &Rc<ModuleScope>,
        full_name: String,
    ) -> Result<(), Error> {
        let name = decl.name.clone();
        if let Some(existing) = self.packages[scope.package.0].macros.get(&name.name) {
            return Err(Error::new(
                ErrorImpl::AlreadyExists {
                    kind: String::from("Macro"),
                    name: name.name.clone(),
                },
                name.span.clone(),
            )
            .with_related("Already declared here", self.macros[existing.0].name.span.clone()));
        }

        self.macros.push(MacroDef {
            package: scope.package,
            name: name.clone(),
            full_name,
            decl: Rc::new(decl),
            scope: Rc::clone(scope),
            params: vec![],
            returns: AliasedType::void(),
            state: ResolveState::Declared,
        });
        let id = MacroId(self.macros.len() - 1);
        self.packages[scope.package.0].macros.insert(name.name, id);
        Ok(())
    }

    fn check_duplicates(&self) -> Result<(), Error> {
        for package in &self.packages {
            let mut seen: Vec<&Ident> = vec![];
            for (name, _) in &package.members {
                if let Some(previous) = seen.iter().find(|seen| seen.name == name.name) {
                    return Err(Error::new(
                        ErrorImpl::AlreadyExists {
                            kind: String::from("Global"),
                            name: name.name.clone(),
                        },
                        name.span.clone(),
                    )
                    .with_related("Already declared here", previous.span.clone()));
                }
                seen.push(name);
            }
        }
        Ok(())
    }

    /// Pass 2. Resolution is on demand, so the order here only decides
    /// which error is reported first.
    fn resolve_declarations(&mut self) -> Result<(), Error> {
        for id in 0..self.aliases.len() {
            let span = self.aliases[id].name.span.clone();
            self.resolve_alias(AliasId(id), &span)?;
        }

        let members: Vec<(Ident, PackageMember)> = self
            .packages
            .iter()
            .flat_map(|package| package.members.iter().cloned())
            .collect();
        for (name, member) in members {
            match member {
                PackageMember::Struct(id) => {
                    self.complete_struct(id, &name.span)?;
                    let methods = self.structs[id.0].member_order.clone();
                    for method in methods {
                        self.global_type(method, &name.span)?;
                    }
                }
                PackageMember::Global(id) => {
                    self.global_type(id, &name.span)?;
                }
                PackageMember::Alias(_) | PackageMember::Template(_) => {}
            }
        }

        for id in 0..self.macros.len() {
            self.resolve_macro_signature(MacroId(id))?;
        }
        Ok(())
    }

    /// Type of a global, resolving its signature or initializer on first use.
    pub fn global_type(&mut self, id: GlobalId, used_at: &Span) -> Result<AliasedType, Error> {
        let global = &self.globals[id.0];
        match global.state {
            ResolveState::Complete => {
                if let Some(ty) = &global.ty {
                    return Ok(ty.clone());
                }
            }
            ResolveState::Resolving => {
                let name = global.display.clone();
                let error = if global.instance {
                    ErrorImpl::CyclicTemplate { name }
                } else {
                    ErrorImpl::CyclicDefinition { name }
                };
                return Err(Error::new(error, used_at.clone()));
            }
            ResolveState::Declared => {}
        }

        self.globals[id.0].state = ResolveState::Resolving;
        let scope = Rc::clone(&self.globals[id.0].scope);
        let (ty, value) = match self.globals[id.0].kind.clone() {
            GlobalKind::Function { decl, owner } => {
                let ty = self.detached(|checker| checker.resolve_signature(&decl, owner, &scope))?;
                (ty, None)
            }
            GlobalKind::Variable { decl } => {
                self.detached(|checker| checker.resolve_global_variable(&decl, &scope))?
            }
        };

        trace!(global = %self.globals[id.0].display, ty = %ty, "resolved global");
        let global = &mut self.globals[id.0];
        global.ty = Some(ty.clone());
        global.value = value;
        global.state = ResolveState::Complete;
        Ok(ty)
    }

    fn resolve_signature(
        &mut self,
        decl: &FnDecl,
        owner: Option<StructId>,
        scope: &Rc<ModuleScope>,
    ) -> Result<AliasedType, Error> {
        let mut params = vec![];
        if let Some(owner) = owner {
            if matches!(decl.kind, FnKind::Method | FnKind::ConstMethod) {
                params.push(AliasedType::new(Type::SharedPointer {
                    to: Box::new(self.struct_type(owner)),
                    constant: decl.kind == FnKind::ConstMethod,
                }));
            }
        }
        for param in &decl.params {
            let ty = self.resolve_type(&param.ty, scope)?;
            self.check_value_type(&ty, &param.ty.span)?;
            params.push(ty);
        }
        let returns = match &decl.returns {
            Some(returns) => self.resolve_type(returns, scope)?,
            None => AliasedType::void(),
        };

        Ok(AliasedType::new(Type::Func(crate::types::types::FuncType {
            params,
            vararg: decl.vararg,
            returns: Box::new(returns),
        })))
    }

    fn check_entry_point(&mut self) -> Result<(), Error> {
        let name = format!(
            "{}::{}",
            self.options.entry_package, self.options.entry_function
        );
        let member = self
            .find_package(&self.options.entry_package)
            .and_then(|package| {
                self.packages[package.0]
                    .names
                    .get(&self.options.entry_function)
                    .copied()
            });

        let id = match member {
            Some(PackageMember::Global(id)) if self.globals[id.0].is_function() => id,
            Some(_) => {
                return Err(Error::new(ErrorImpl::InvalidEntryPoint { name }, Span::null()));
            }
            None if self.options.require_entry => {
                return Err(Error::new(ErrorImpl::MissingEntryPoint { name }, Span::null()));
            }
            None => return Ok(()),
        };

        let span = self.globals[id.0].name.span.clone();
        let ty = self.global_type(id, &span)?;
        let valid = match &ty.ty {
            Type::Func(func) => {
                func.params.is_empty()
                    && !func.vararg
                    && matches!(func.returns.ty, Type::Void | Type::Int(32))
                    && !self.globals[id.0].is_external()
            }
            _ => false,
        };
        if !valid {
            return Err(Error::new(ErrorImpl::InvalidEntryPoint { name }, span));
        }

        debug!(entry = %name, "entry point");
        self.entry = Some(id);
        Ok(())
    }
}
