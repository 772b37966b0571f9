//! Unit tests for the parser module.
//!
//! Covers module headers, declarations, statements, expression precedence,
//! type syntax and the speculative template-argument parse.

use std::rc::Rc;

use crate::ast::{
    expressions::{BinaryOp, ExprKind, UnaryOp},
    statements::{FnKind, ItemKind, SourceModule, StmtKind},
    types::TypeExprKind,
};
use crate::lexer::lexer::tokenize;

use super::parser::parse;

fn parse_source(source: &str) -> Result<SourceModule, crate::errors::errors::Error> {
    let tokens = tokenize(source.to_string(), Some("test.own".to_string()))?;
    parse(tokens, Rc::new("test.own".to_string()))
}

fn body_of(source: &str) -> Vec<StmtKind> {
    let module = parse_source(source).unwrap();
    match &module.items[0].kind {
        ItemKind::Function(decl) => decl
            .body
            .as_ref()
            .unwrap()
            .stmts
            .iter()
            .map(|stmt| stmt.kind.clone())
            .collect(),
        _ => panic!("expected function"),
    }
}

#[test]
fn test_parse_module_header() {
    let module = parse_source("package geometry;\nimport std;\nimport util;\n").unwrap();

    assert_eq!(module.package.name, "geometry");
    assert_eq!(module.imports.len(), 2);
    assert_eq!(module.imports[1].name, "util");
    assert!(module.items.is_empty());
}

#[test]
fn test_default_package_is_main() {
    let module = parse_source("fn main(): i32 { return 0; }").unwrap();
    assert_eq!(module.package.name, "main");
}

#[test]
fn test_parse_function_declaration() {
    let module = parse_source("fn add(a: i32, b: i32): i32 { return a + b; }").unwrap();

    match &module.items[0].kind {
        ItemKind::Function(decl) => {
            assert_eq!(decl.name.name, "add");
            assert_eq!(decl.kind, FnKind::Plain);
            assert_eq!(decl.params.len(), 2);
            assert!(decl.returns.is_some());
            assert_eq!(decl.body.as_ref().unwrap().stmts.len(), 1);
        }
        _ => panic!("expected function"),
    }
}

#[test]
fn test_parse_external_vararg_declaration() {
    let module = parse_source("fn printf(fmt: const i8[], ...): i32;").unwrap();

    match &module.items[0].kind {
        ItemKind::Function(decl) => {
            assert!(decl.vararg);
            assert!(decl.body.is_none());
            match &decl.params[0].ty.kind {
                TypeExprKind::Array { constant, size, .. } => {
                    assert!(*constant);
                    assert!(size.is_none());
                }
                other => panic!("unexpected type {:?}", other),
            }
        }
        _ => panic!("expected function"),
    }
}

#[test]
fn test_parse_struct_members() {
    let source = "struct Point {
        var x: i32 = 0;
        const y: i32;
        fn move(dx: i32) { x += dx; }
        const fn len(): i32 { return x; }
        static fn origin(): Point { return Point{x: 0, y: 0}; }
    }";
    let module = parse_source(source).unwrap();

    match &module.items[0].kind {
        ItemKind::Struct(decl) => {
            assert_eq!(decl.fields.len(), 2);
            assert!(decl.fields[1].constant);
            assert!(decl.fields[0].value.is_some());
            let kinds: Vec<FnKind> = decl.methods.iter().map(|m| m.kind).collect();
            assert_eq!(kinds, vec![FnKind::Method, FnKind::ConstMethod, FnKind::Static]);
        }
        _ => panic!("expected struct"),
    }
}

#[test]
fn test_parse_template_item() {
    let module = parse_source("template <T, U> struct Pair { var a: T; var b: U; }").unwrap();

    let names: Vec<&str> = module.items[0].template.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["T", "U"]);
}

#[test]
fn test_parse_macro_declaration() {
    let module = parse_source("macro print(#const i8[], ...);").unwrap();

    match &module.items[0].kind {
        ItemKind::Macro(decl) => {
            assert!(decl.vararg);
            assert!(decl.params[0].constant);
        }
        _ => panic!("expected macro"),
    }
}

#[test]
fn test_parse_pointer_types() {
    let module = parse_source("typealias Buf = const *i32[4];").unwrap();

    match &module.items[0].kind {
        ItemKind::Alias { target, .. } => match &target.kind {
            TypeExprKind::Shared { to, constant } => {
                assert!(*constant);
                assert!(matches!(to.kind, TypeExprKind::Array { .. }));
            }
            other => panic!("unexpected type {:?}", other),
        },
        _ => panic!("expected alias"),
    }
}

#[test]
fn test_parse_function_type() {
    let module = parse_source("typealias Op = (i32, i32): i32;").unwrap();

    match &module.items[0].kind {
        ItemKind::Alias { target, .. } => match &target.kind {
            TypeExprKind::Func { params, vararg, .. } => {
                assert_eq!(params.len(), 2);
                assert!(!vararg);
            }
            other => panic!("unexpected type {:?}", other),
        },
        _ => panic!("expected alias"),
    }
}

#[test]
fn test_operator_precedence() {
    let body = body_of("fn f() { var x = 1 + 2 * 3 < 4 && true; }");

    match &body[0] {
        StmtKind::VarDecl(decl) => match &decl.value.as_ref().unwrap().kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::And);
                match &left.kind {
                    ExprKind::Binary { op, left, .. } => {
                        assert_eq!(*op, BinaryOp::Lt);
                        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_comparison_is_not_template() {
    let body = body_of("fn f(i: i32, n: i32) { if (i < n) { return; } }");

    match &body[0] {
        StmtKind::If { branches, .. } => {
            assert!(matches!(branches[0].0.kind, ExprKind::Binary { op: BinaryOp::Lt, .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_template_reference_in_expression() {
    let body = body_of("fn f() { var b = Box<i32>{value: 1}; id<i32>(2); }");

    match &body[0] {
        StmtKind::VarDecl(decl) => match &decl.value.as_ref().unwrap().kind {
            ExprKind::StructInit { ty, fields, heap } => {
                assert!(!heap);
                assert_eq!(fields.len(), 1);
                match &ty.kind {
                    TypeExprKind::Named { args, .. } => assert_eq!(args.len(), 1),
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
    match &body[1] {
        StmtKind::Expr(expr) => match &expr.kind {
            ExprKind::Call { callee, .. } => {
                assert!(matches!(&callee.kind, ExprKind::Path { args, .. } if args.len() == 1));
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_parse_pointer_expressions() {
    let body = body_of("fn f() { var p = new i32(5); var s = #p; var r = &const x; *s = -1; }");

    assert!(matches!(&body[0], StmtKind::VarDecl(decl) if matches!(decl.value.as_ref().unwrap().kind, ExprKind::New { .. })));
    assert!(matches!(&body[1], StmtKind::VarDecl(decl) if matches!(decl.value.as_ref().unwrap().kind, ExprKind::Share(_))));
    assert!(matches!(&body[2], StmtKind::VarDecl(decl) if matches!(decl.value.as_ref().unwrap().kind, ExprKind::Ref { constant: true, .. })));
    match &body[3] {
        StmtKind::Assign { target, op, value } => {
            assert!(op.is_none());
            assert!(matches!(target.kind, ExprKind::Deref(_)));
            assert!(matches!(value.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_parse_array_initializers() {
    let body = body_of("fn f() { var a = []i32{1, 2, 3}; var b = [4]i8{0}; var c = new [n]i32{0}; }");

    assert!(matches!(&body[0], StmtKind::VarDecl(decl) if matches!(&decl.value.as_ref().unwrap().kind, ExprKind::ArrayInit { values, heap: false, .. } if values.len() == 3)));
    assert!(matches!(&body[1], StmtKind::VarDecl(decl) if matches!(decl.value.as_ref().unwrap().kind, ExprKind::ArrayFill { heap: false, .. })));
    assert!(matches!(&body[2], StmtKind::VarDecl(decl) if matches!(decl.value.as_ref().unwrap().kind, ExprKind::ArrayFill { heap: true, .. })));
}

#[test]
fn test_parse_control_flow() {
    let body = body_of(
        "fn f() {
            while @outer (true) {
                for (var i = 0; i < 10; i += 1) {
                    if (i == 5) { break @outer; } else if (i == 6) { continue; } else { }
                }
            }
        }",
    );

    match &body[0] {
        StmtKind::While { label, body, .. } => {
            assert_eq!(label.as_ref().unwrap().name, "outer");
            match &body.stmts[0].kind {
                StmtKind::For { init, condition, step, body, .. } => {
                    assert!(init.is_some() && condition.is_some() && step.is_some());
                    match &body.stmts[0].kind {
                        StmtKind::If { branches, else_block } => {
                            assert_eq!(branches.len(), 2);
                            assert!(else_block.is_some());
                            assert!(matches!(&branches[0].1.stmts[0].kind, StmtKind::Break(Some(l)) if l.name == "outer"));
                        }
                        other => panic!("unexpected {:?}", other),
                    }
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_parse_macro_call_and_methods() {
    let body = body_of("fn f() { std::println!(\"% %\", a.b, p.len()); }");

    match &body[0] {
        StmtKind::Expr(expr) => match &expr.kind {
            ExprKind::MacroCall { path, args } => {
                assert_eq!(path.len(), 2);
                assert_eq!(args.len(), 3);
                assert!(matches!(args[1].kind, ExprKind::Member { .. }));
                assert!(matches!(args[2].kind, ExprKind::Call { .. }));
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_semicolon() {
    let error = parse_source("fn f() { var x = 1 }").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_const_without_value() {
    let error = parse_source("fn f() { const x: i32; }").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_number_too_large() {
    let error = parse_source("var x = 99999999999999999999999;").unwrap_err();
    assert_eq!(error.get_error_name(), "NumberParseError");
}
