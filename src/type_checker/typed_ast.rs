use crate::{
    ast::expressions::{BinaryOp, UnaryOp},
    symbols::{
        scope::{Local, LocalId, LoopId},
        symbols::{GlobalId, MacroId},
    },
    types::types::{AliasedType, ConstValue, StructId},
    Span,
};

/// A lowered function body together with its locals.
#[derive(Debug, Clone)]
pub struct TypedFunction {
    pub global: GlobalId,
    pub params: Vec<LocalId>,
    pub locals: Vec<Local>,
    pub body: TypedBlock,
    pub returns: AliasedType,
}

#[derive(Debug, Clone, Default)]
pub struct TypedBlock {
    pub stmts: Vec<TypedStmt>,
    /// Owning locals released when control falls off the end.
    pub drops: Vec<LocalId>,
}

#[derive(Debug, Clone)]
pub struct TypedStmt {
    pub kind: TypedStmtKind,
    pub span: Span,
    /// Statically unreachable; checked but never emitted.
    pub unreachable: bool,
}

#[derive(Debug, Clone)]
pub enum TypedStmtKind {
    Declare {
        local: LocalId,
        value: Option<TypedExpr>,
    },
    Assign {
        target: Storage,
        value: TypedExpr,
        /// The target local owned a value that has to be freed first.
        release_prior: bool,
    },
    Expr {
        value: TypedExpr,
        /// Discarded unique result.
        release: bool,
    },
    Return {
        value: Option<TypedExpr>,
        drops: Vec<LocalId>,
    },
    Break {
        target: LoopId,
        drops: Vec<LocalId>,
    },
    Continue {
        target: LoopId,
        drops: Vec<LocalId>,
    },
    If {
        branches: Vec<(TypedExpr, TypedBlock)>,
        else_block: Option<TypedBlock>,
    },
    /// `while` and `for`. A missing condition loops forever.
    Loop {
        id: LoopId,
        init: Option<Box<TypedStmt>>,
        condition: Option<TypedExpr>,
        step: Option<Box<TypedStmt>>,
        body: TypedBlock,
        /// Owning locals of the `for` header, freed after the loop.
        exit_drops: Vec<LocalId>,
    },
    Scope(TypedBlock),
}

/// A value-producing expression.
#[derive(Debug, Clone)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: AliasedType,
    /// Folded value, when known at compile time.
    pub constant: Option<ConstValue>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypedExprKind {
    Int(i128),
    Bool(bool),
    Str(String),
    /// Read of a storage location.
    Load(Box<Storage>),
    Function(GlobalId),
    Call {
        callee: Box<TypedExpr>,
        args: Vec<TypedExpr>,
    },
    MacroCall {
        id: MacroId,
        args: Vec<TypedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<TypedExpr>,
    },
    /// Address of a storage location.
    AddressOf(Box<Storage>),
    Cast {
        value: Box<TypedExpr>,
        kind: CastKind,
    },
    /// Field of a struct value that is not stored anywhere.
    ExtractField {
        base: Box<TypedExpr>,
        index: usize,
    },
    StructInit {
        id: StructId,
        values: Vec<TypedExpr>,
        heap: bool,
    },
    ArrayInit {
        of: AliasedType,
        values: Vec<TypedExpr>,
        heap: bool,
    },
    ArrayFill {
        of: AliasedType,
        size: Box<TypedExpr>,
        value: Box<TypedExpr>,
        heap: bool,
    },
    /// `new T(v)`
    New {
        value: Box<TypedExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Reinterpretation between pointer types of the same address.
    Pointer,
    /// Sign extension or truncation between integer widths.
    Int { from: u32, to: u32 },
}

/// An addressable location.
#[derive(Debug, Clone)]
pub struct Storage {
    pub kind: StorageKind,
    pub ty: AliasedType,
    pub constant: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StorageKind {
    Local(LocalId),
    Global(GlobalId),
    /// Pointee of a pointer value.
    Deref(Box<TypedExpr>),
    /// Field `index` of the struct `base` points at.
    Field {
        base: Box<TypedExpr>,
        id: StructId,
        index: usize,
    },
    /// Element of the array whose first element `data` points at.
    Element {
        data: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, ty: AliasedType, span: Span) -> Self {
        TypedExpr {
            kind,
            ty,
            constant: None,
            span,
        }
    }

    pub fn with_constant(mut self, constant: Option<ConstValue>) -> Self {
        self.constant = constant;
        self
    }

    pub fn load(storage: Storage) -> Self {
        let ty = storage.ty.clone();
        let span = storage.span.clone();
        TypedExpr::new(TypedExprKind::Load(Box::new(storage)), ty, span)
    }

    /// The storage this expression reads, if it is a plain read.
    pub fn as_storage(&self) -> Option<&Storage> {
        match &self.kind {
            TypedExprKind::Load(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn into_storage(self) -> Result<Storage, TypedExpr> {
        match self.kind {
            TypedExprKind::Load(storage) => Ok(*storage),
            _ => Err(self),
        }
    }

    /// Reads a local directly.
    pub fn reads_local(&self) -> Option<LocalId> {
        match self.as_storage().map(|storage| &storage.kind) {
            Some(StorageKind::Local(id)) => Some(*id),
            _ => None,
        }
    }
}

impl TypedStmt {
    pub fn new(kind: TypedStmtKind, span: Span) -> Self {
        TypedStmt {
            kind,
            span,
            unreachable: false,
        }
    }
}
