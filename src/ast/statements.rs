use std::rc::Rc;

use crate::Span;

use super::{
    ast::Ident,
    expressions::{BinaryOp, Expr},
    types::TypeExpr,
};

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    VarDecl(VarDecl),
    /// `target = value` or, with `op`, `target op= value`
    Assign {
        target: Expr,
        op: Option<BinaryOp>,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While {
        label: Option<Ident>,
        condition: Expr,
        body: Block,
    },
    For {
        label: Option<Ident>,
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Block,
    },
    Block(Block),
}

/// `var`/`const` declaration, used for locals, globals and struct fields.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Ident,
    pub constant: bool,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnKind {
    /// Package-level function
    Plain,
    /// Instance method taking `*Self`
    Method,
    /// Instance method taking `const *Self`
    ConstMethod,
    /// Struct member without a receiver
    Static,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: Ident,
    pub kind: FnKind,
    pub params: Vec<Param>,
    pub vararg: bool,
    pub returns: Option<TypeExpr>,
    /// `None` declares an external function.
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Ident,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<FnDecl>,
}

#[derive(Debug, Clone)]
pub struct MacroParam {
    /// `#` marks a parameter that must be a compile-time constant.
    pub constant: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct MacroDecl {
    pub name: Ident,
    pub params: Vec<MacroParam>,
    pub vararg: bool,
    pub returns: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Function(FnDecl),
    Struct(StructDecl),
    Global(VarDecl),
    Alias { name: Ident, target: TypeExpr },
    Macro(MacroDecl),
}

/// A top-level declaration. Non-empty `template` turns it into a template
/// over the listed parameter names.
#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub template: Vec<Ident>,
    pub span: Span,
}

impl Item {
    pub fn name(&self) -> &Ident {
        match &self.kind {
            ItemKind::Function(decl) => &decl.name,
            ItemKind::Struct(decl) => &decl.name,
            ItemKind::Global(decl) => &decl.name,
            ItemKind::Alias { name, .. } => name,
            ItemKind::Macro(decl) => &decl.name,
        }
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceModule {
    pub file: Rc<String>,
    pub package: Ident,
    pub imports: Vec<Ident>,
    pub items: Vec<Item>,
}
