use std::fmt::Display;

use crate::Span;

use super::{ast::Ident, types::TypeExpr};

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(u64),
    Bool(bool),
    Str(String),
    /// Variable, global or static member, possibly qualified. Non-empty
    /// `args` reference a template instance.
    Path { path: Vec<Ident>, args: Vec<TypeExpr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    MacroCall { path: Vec<Ident>, args: Vec<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `&x` / `&const x`
    Ref { target: Box<Expr>, constant: bool },
    /// `*p`
    Deref(Box<Expr>),
    /// `#p`
    Share(Box<Expr>),
    Index { base: Box<Expr>, index: Box<Expr> },
    Member { base: Box<Expr>, member: Ident },
    /// `new T(v)`
    New { ty: TypeExpr, value: Box<Expr> },
    StructInit {
        ty: TypeExpr,
        fields: Vec<(Ident, Expr)>,
        heap: bool,
    },
    /// `[]T{a, b}`
    ArrayInit {
        of: TypeExpr,
        values: Vec<Expr>,
        heap: bool,
    },
    /// `[N]T{v}`
    ArrayFill {
        of: TypeExpr,
        size: Box<Expr>,
        value: Box<Expr>,
        heap: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}
