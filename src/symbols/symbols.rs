use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::{
        ast::Ident,
        statements::{FnDecl, FnKind, Item, MacroDecl, StructDecl, VarDecl},
        types::TypeExpr,
    },
    type_checker::typed_ast::TypedExpr,
    types::types::{AliasedType, ConstValue, StructId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliasId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacroId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(pub usize);

/// Progress of an entity through signature resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Declared,
    Resolving,
    Complete,
}

/// Anything a package-level name can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageMember {
    Global(GlobalId),
    Struct(StructId),
    Alias(AliasId),
    Template(TemplateId),
}

/// A named namespace, created on first reference to its name.
#[derive(Debug)]
pub struct Package {
    pub name: String,
    /// Declaration order, used for duplicate detection.
    pub members: Vec<(Ident, PackageMember)>,
    pub names: HashMap<String, PackageMember>,
    pub macros: HashMap<String, MacroId>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Package {
            name: name.to_string(),
            members: vec![],
            names: HashMap::new(),
            macros: HashMap::new(),
        }
    }

    /// Registers a member. The first declaration of a name wins lookups;
    /// later ones are reported as duplicates in pass 2.
    pub fn add(&mut self, name: &Ident, member: PackageMember) {
        self.members.push((name.clone(), member));
        self.names.entry(name.name.clone()).or_insert(member);
    }
}

/// Lookup context of one source file (or one template instance): its
/// package, its imports and the template parameter bindings in effect.
#[derive(Debug)]
pub struct ModuleScope {
    pub package: PackageId,
    pub imports: Vec<PackageId>,
    pub bindings: HashMap<String, AliasedType>,
}

#[derive(Debug, Clone)]
pub enum GlobalKind {
    Function {
        decl: Rc<FnDecl>,
        owner: Option<StructId>,
    },
    Variable {
        decl: Rc<VarDecl>,
    },
}

/// A package-level function, method, static member or variable.
#[derive(Debug)]
pub struct Global {
    pub package: PackageId,
    pub name: Ident,
    /// Name shown in diagnostics.
    pub display: String,
    /// Symbol name in the emitted module.
    pub ir_name: String,
    pub constant: bool,
    pub kind: GlobalKind,
    pub scope: Rc<ModuleScope>,
    pub ty: Option<AliasedType>,
    pub state: ResolveState,
    /// Folded initializer of a global variable.
    pub value: Option<ConstValue>,
    pub instance: bool,
    /// Template nesting its body is lowered at; 0 outside templates.
    pub depth: usize,
}

impl Global {
    pub fn fn_decl(&self) -> Option<&Rc<FnDecl>> {
        match &self.kind {
            GlobalKind::Function { decl, .. } => Some(decl),
            GlobalKind::Variable { .. } => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, GlobalKind::Function { .. })
    }

    /// Function without a body, bound to a symbol of the same name.
    pub fn is_external(&self) -> bool {
        match &self.kind {
            GlobalKind::Function { decl, .. } => decl.body.is_none(),
            GlobalKind::Variable { .. } => false,
        }
    }

    pub fn fn_kind(&self) -> Option<FnKind> {
        self.fn_decl().map(|decl| decl.kind)
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Ident,
    pub constant: bool,
    pub ty: AliasedType,
    pub default: Option<TypedExpr>,
}

#[derive(Debug)]
pub struct StructDef {
    pub package: PackageId,
    pub name: Ident,
    /// `pkg::Name` or `pkg::Name<args>` for template instances.
    pub display: Rc<String>,
    pub ir_name: String,
    pub decl: Rc<StructDecl>,
    pub scope: Rc<ModuleScope>,
    pub fields: Vec<FieldDef>,
    /// Methods and statics, by name.
    pub members: HashMap<String, GlobalId>,
    pub member_order: Vec<GlobalId>,
    pub state: ResolveState,
    pub instance: bool,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name.name == name)
    }
}

#[derive(Debug)]
pub struct AliasDef {
    pub package: PackageId,
    pub name: Ident,
    pub display: Rc<String>,
    pub target: TypeExpr,
    pub scope: Rc<ModuleScope>,
    pub resolved: Option<AliasedType>,
    pub state: ResolveState,
}

#[derive(Debug, Clone)]
pub struct MacroParamDef {
    pub constant: bool,
    pub ty: AliasedType,
}

/// A callable whose lowering is delegated to a registered handler.
#[derive(Debug)]
pub struct MacroDef {
    pub package: PackageId,
    pub name: Ident,
    /// `pkg::name`, the key into the handler registry.
    pub full_name: String,
    pub decl: Rc<MacroDecl>,
    pub scope: Rc<ModuleScope>,
    pub params: Vec<MacroParamDef>,
    pub returns: AliasedType,
    pub state: ResolveState,
}

/// Instantiated entity of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateEntity {
    Struct(StructId),
    Global(GlobalId),
}

#[derive(Debug)]
pub struct TemplateInstance {
    pub args: Vec<AliasedType>,
    pub entity: TemplateEntity,
}

#[derive(Debug)]
pub struct TemplateDef {
    pub package: PackageId,
    pub name: Ident,
    pub params: Vec<Ident>,
    pub item: Rc<Item>,
    pub scope: Rc<ModuleScope>,
    pub instances: Vec<TemplateInstance>,
}

impl TemplateDef {
    /// Instance cache lookup by structural equality of the arguments.
    pub fn find_instance(&self, args: &[AliasedType]) -> Option<TemplateEntity> {
        self.instances
            .iter()
            .find(|instance| instance.args == args)
            .map(|instance| instance.entity)
    }
}
