use crate::Span;

use super::{ast::Ident, expressions::Expr};

/// A type as written in the source. Resolved into a semantic type by the
/// type checker.
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// Builtin, struct, alias or template parameter, optionally qualified
    /// and optionally with template arguments.
    Named { path: Vec<Ident>, args: Vec<TypeExpr> },
    /// `&T`
    Owner { to: Box<TypeExpr>, constant: bool },
    /// `*T`
    Shared { to: Box<TypeExpr>, constant: bool },
    /// `T[]` or `T[N]`
    Array {
        of: Box<TypeExpr>,
        constant: bool,
        size: Option<Box<Expr>>,
    },
    /// `(A, B, ...): R`
    Func {
        params: Vec<TypeExpr>,
        vararg: bool,
        returns: Box<TypeExpr>,
    },
}
