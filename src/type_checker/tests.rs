//! Unit tests for the type checker.
//!
//! Sources are run through the real lexer and parser together with the
//! bundled `std` prelude, then through all three lowering passes.

use pretty_assertions::assert_eq;

use crate::{
    compiler::stdlib::STD_PRELUDE,
    config::CompileOptions,
    errors::errors::Error,
    parse_source,
    symbols::symbols::TemplateEntity,
    SourceFile,
};

use super::{type_checker::TypeChecker, typed_ast::TypedStmtKind};

fn check_with(source: &str, options: CompileOptions) -> Result<TypeChecker, Error> {
    let std = parse_source(&SourceFile::new("std.own", STD_PRELUDE))?;
    let module = parse_source(&SourceFile::new("test.own", source))?;
    let mut checker = TypeChecker::new(options);
    checker.check_modules(vec![std, module])?;
    Ok(checker)
}

fn check(source: &str) -> Result<TypeChecker, Error> {
    check_with(source, CompileOptions::library())
}

fn error_of(source: &str) -> Error {
    match check(source) {
        Ok(_) => panic!("expected an error for:\n{}", source),
        Err(error) => error,
    }
}

#[test]
fn test_use_after_move() {
    let error = error_of(
        "fn take(p: &i32) {}
        fn f() {
            var p = new i32(1);
            take(p);
            take(p);
        }",
    );

    assert_eq!(error.get_error_name(), "MovedValue");
    assert_eq!(error.message(), "Cannot use moved value 'p'");
    assert_eq!(error.get_related().unwrap().label, "Moved here");
}

#[test]
fn test_share_does_not_move() {
    check(
        "fn look(p: *i32): i32 { return *p; }
        fn f(): i32 {
            var p = new i32(1);
            var a = look(#p);
            return look(#p) + a;
        }",
    )
    .unwrap();
}

#[test]
fn test_reassign_moved_local() {
    let checker = check(
        "fn take(p: &i32) {}
        fn f() {
            var p = new i32(1);
            take(p);
            p = new i32(2);
            take(p);
        }",
    )
    .unwrap();

    let f = checker.functions.iter().find(|f| checker.globals[f.global.0].display == "main::f").unwrap();
    match &f.body.stmts[2].kind {
        TypedStmtKind::Assign { release_prior, .. } => assert!(!release_prior),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_owned_local_released_at_return() {
    let checker = check("fn f() { var p = new i32(1); }").unwrap();

    let f = &checker.functions[0];
    match &f.body.stmts.last().unwrap().kind {
        TypedStmtKind::Return { value, drops } => {
            assert!(value.is_none());
            assert_eq!(drops.len(), 1);
            assert_eq!(f.locals[drops[0].0].name.name, "p");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_move_inside_loop() {
    let take = "fn take(p: &i32) {}\nfn eat(p: &i32): i32 { return 0; }\n";

    let error = error_of(&format!(
        "{}fn f(c: bool) {{ var p = new i32(1); while (c) {{ take(p); }} }}",
        take
    ));
    assert_eq!(error.get_error_name(), "MovedValue");
    assert_eq!(error.get_related().unwrap().label, "Moved here on the previous iteration");

    for body in [
        "while (c) { take(p); continue; }",
        "while (c) { while (c) { take(p); break; } }",
        "while (eat(p) == 0) {}",
        "for (var i = 0; i < 3; i += 1) { if (c) { take(p); } }",
    ] {
        let error = error_of(&format!("{}fn f(c: bool) {{ var p = new i32(1); {} }}", take, body));
        assert_eq!(error.get_error_name(), "MovedValue", "{}", body);
    }
}

#[test]
fn test_move_leaving_loop() {
    let take = "fn take(p: &i32) {}\n";

    for body in [
        "while (c) { take(p); break; }",
        "while (c) { if (c) { take(p); return; } }",
        "while (c) { take(p); p = new i32(2); }",
        "while @outer (c) { while (c) { take(p); break @outer; } }",
        "while (c) { var q = new i32(2); take(q); }",
    ] {
        let result = check(&format!("{}fn f(c: bool) {{ var p = new i32(1); {} }}", take, body));
        assert!(result.is_ok(), "{}: {:?}", body, result.err());
    }
}

#[test]
fn test_unique_value_cannot_leave_pointer() {
    let error = error_of("fn f(p: *&i32) { var q = *p; }");
    assert_eq!(error.get_error_name(), "UniqueDereference");
}

#[test]
fn test_template_instances_are_cached() {
    let checker = check(
        "template <T> struct Box { var value: T; }
        fn f() {
            var a = Box<i32>{value: 1};
            var b = Box<i32>{value: 2};
            var c = Box<bool>{value: true};
        }",
    )
    .unwrap();

    let template = &checker.templates[0];
    assert_eq!(template.instances.len(), 2);
    let names: Vec<&str> = template
        .instances
        .iter()
        .map(|instance| match instance.entity {
            TemplateEntity::Struct(id) => checker.structs[id.0].display.as_str(),
            TemplateEntity::Global(_) => panic!("expected struct instance"),
        })
        .collect();
    assert_eq!(names, vec!["main::Box<i32>", "main::Box<bool>"]);
}

#[test]
fn test_recursive_template_function() {
    check(
        "template <T> fn count(n: T): T {
            if (n == 0) { return 0; }
            return count<T>(n - 1) + 1;
        }
        fn f(): i64 { return count<i64>(10); }",
    )
    .unwrap();
}

#[test]
fn test_cyclic_template_by_value() {
    let error = error_of(
        "template <T> struct Node { var next: Node<T>; }
        fn f() { var n: Node<i32>; }",
    );
    assert_eq!(error.get_error_name(), "CyclicTemplate");
}

#[test]
fn test_self_referential_template_through_pointer() {
    check(
        "template <T> struct List { var value: T; var next: *List<T>; }
        fn f(l: *List<i32>): i32 { return l.next.value; }",
    )
    .unwrap();
}

#[test]
fn test_recursive_struct() {
    let error = error_of("struct A { var a: A; }");
    assert_eq!(error.get_error_name(), "RecursiveStruct");
}

#[test]
fn test_instantiation_depth() {
    let options = CompileOptions {
        max_instantiation_depth: 8,
        ..CompileOptions::library()
    };
    let error = check_with(
        "template <T> struct Deep { var inner: *Deep<Deep<T>>; }
        fn f(d: *Deep<i32>) {}",
        options,
    )
    .unwrap_err();

    assert_eq!(error.get_error_name(), "InstantiationDepth");
}

#[test]
fn test_instantiation_depth_through_function_bodies() {
    let options = CompileOptions {
        max_instantiation_depth: 8,
        ..CompileOptions::library()
    };
    let error = check_with(
        "template <T> fn f(x: T) { f<*T>(&x); }
        fn g() { f<i32>(1); }",
        options,
    )
    .unwrap_err();

    assert_eq!(error.get_error_name(), "InstantiationDepth");
}

#[test]
fn test_template_arity() {
    let error = error_of(
        "template <K, V> struct Pair { var k: K; var v: V; }
        fn f(p: *Pair<i32>) {}",
    );
    assert_eq!(error.get_error_name(), "TemplateArity");
}

#[test]
fn test_missing_return() {
    let error = error_of("fn f(b: bool): i32 { if (b) { return 1; } }");
    assert_eq!(error.get_error_name(), "MissingReturn");
}

#[test]
fn test_all_branches_return() {
    check(
        "fn f(b: bool): i32 {
            if (b) { return 1; } else if (!b) { return 2; } else { return 3; }
        }
        fn g(): i32 { while (true) { } }",
    )
    .unwrap();
}

#[test]
fn test_unreachable_code_warns_once() {
    let checker = check("fn f(): i32 { return 1; var x = 2; x = 3; }").unwrap();

    assert_eq!(checker.warnings.len(), 1);
    let body = &checker.functions[0].body;
    let flags: Vec<bool> = body.stmts.iter().map(|stmt| stmt.unreachable).collect();
    assert_eq!(flags, vec![false, true, true]);
}

#[test]
fn test_constant_false_branch_is_unreachable() {
    let checker = check("fn f() { if (false) { var x = 1; } }").unwrap();
    assert_eq!(checker.warnings.len(), 1);
}

#[test]
fn test_break_outside_loop() {
    let error = error_of("fn f() { break; }");
    assert_eq!(error.get_error_name(), "NotInLoop");

    let error = error_of("fn f() { while (true) { break @outer; } }");
    assert_eq!(error.message(), "'break @outer' is not in a loop");
}

#[test]
fn test_labelled_break_leaves_outer_loop() {
    check(
        "fn f(): i32 {
            var n = 0;
            while @outer (true) {
                for (var i = 0; i < 10; i += 1) {
                    if (i == 5) { break @outer; }
                    n += i;
                }
            }
            return n;
        }",
    )
    .unwrap();
}

#[test]
fn test_duplicate_property() {
    let error = error_of("struct P { var x: i32; var x: i32; }");

    assert_eq!(error.get_error_name(), "AlreadyExists");
    assert_eq!(error.message(), "Property 'x' already exists");
    assert_eq!(error.get_related().unwrap().label, "Already declared here");
}

#[test]
fn test_duplicate_local() {
    let error = error_of("fn f() { var a = 1; var a = 2; }");
    assert_eq!(error.message(), "Variable 'a' already exists");
}

#[test]
fn test_integer_range() {
    let error = error_of("fn f() { var x: i8 = 300; }");
    assert_eq!(error.message(), "300 cannot be stored in i8");

    check("fn f() { var x: i32 = 300; var y: i8 = -128; }").unwrap();
}

#[test]
fn test_folding_through_constant_global() {
    let error = error_of(
        "const N = 2 + 3;
        fn f() { var a: i8 = N * 100; }",
    );
    assert_eq!(error.message(), "500 cannot be stored in i8");
}

#[test]
fn test_global_initializer_must_be_constant() {
    let error = error_of(
        "fn one(): i32 { return 1; }
        var x = one();",
    );
    assert_eq!(error.get_error_name(), "ExpectedConstant");
}

#[test]
fn test_const_receiver() {
    let counter = "struct C {
            var n: i32;
            fn bump() { n += 1; }
            const fn get(): i32 { return n; }
        }";

    let error = error_of(&format!("{}\nfn f(): i32 {{ const c = C{{n: 1}}; c.bump(); return c.get(); }}", counter));
    assert_eq!(error.get_error_name(), "ConstReceiver");

    let error = error_of(&format!("{}\nfn f(c: const *C): i32 {{ c.bump(); return c.get(); }}", counter));
    assert_eq!(error.get_error_name(), "ConstReceiver");

    check(&format!(
        "{}\nfn f(p: *C): i32 {{ const c = C{{n: 1}}; var v = C{{n: 2}}; v.bump(); p.bump(); return c.get() + v.get(); }}",
        counter
    ))
    .unwrap();
}

#[test]
fn test_const_method_cannot_modify() {
    let error = error_of(
        "struct C {
            var n: i32;
            const fn reset() { n = 0; }
        }",
    );
    assert_eq!(error.get_error_name(), "ModifyConstant");
}

#[test]
fn test_methods_and_statics() {
    check(
        "struct Point {
            var x: i32 = 0;
            var y: i32 = 0;
            fn shift(d: i32) { x += d; y += d; }
            const fn sum(): i32 { return x + y; }
            static fn origin(): Point { return Point{}; }
        }
        fn f(): i32 {
            var p = Point::origin();
            p.shift(2);
            var h = new Point{x: 1};
            h.shift(1);
            return p.sum() + h.sum();
        }",
    )
    .unwrap();
}

#[test]
fn test_unique_field() {
    let error = error_of("struct S { var p: &i32; }");
    assert_eq!(error.get_error_name(), "UniqueField");
}

#[test]
fn test_missing_property() {
    let error = error_of(
        "struct S { var a: i32; var b: i32 = 1; }
        fn f() { var s = S{b: 2}; }",
    );
    assert_eq!(error.message(), "Property 'a' has to be initialized");
}

#[test]
fn test_alias_in_diagnostics() {
    let error = error_of(
        "typealias Num = i32;
        fn f() { var x: Num = true; }",
    );

    assert_eq!(error.get_error_name(), "TypeMatchError");
    assert!(error.message().contains("(aka i32)"), "{}", error.message());
}

#[test]
fn test_alias_does_not_change_type_identity() {
    check(
        "typealias Num = i32;
        fn id(n: i32): Num { return n; }
        fn f(): i32 { var a: Num = 1; return id(a); }",
    )
    .unwrap();
}

#[test]
fn test_macro_without_handler() {
    let error = error_of(
        "macro shout(#const i8[]);
        fn f() { shout!(\"hey\"); }",
    );
    assert_eq!(error.get_error_name(), "MacroWithoutBody");
}

#[test]
fn test_macro_constant_parameter() {
    let error = error_of("fn f(s: const i8[]) { print!(s); }");
    assert_eq!(error.get_error_name(), "ExpectedConstant");

    check("fn f(n: i32) { println!(\"n = %\", n); }").unwrap();
}

#[test]
fn test_entry_point_checks() {
    let error = check_with("fn helper() {}", CompileOptions::default()).unwrap_err();
    assert_eq!(error.get_error_name(), "MissingEntryPoint");

    let error = check_with("fn main(argc: i32) {}", CompileOptions::default()).unwrap_err();
    assert_eq!(error.get_error_name(), "InvalidEntryPoint");

    let checker = check_with("fn main(): i32 { return 0; }", CompileOptions::default()).unwrap();
    assert!(checker.entry.is_some());
}

#[test]
fn test_cross_package_reference() {
    let std = parse_source(&SourceFile::new("std.own", STD_PRELUDE)).unwrap();
    let math = parse_source(&SourceFile::new(
        "math.own",
        "package math;\nfn square(x: i32): i32 { return x * x; }",
    ))
    .unwrap();
    let main = parse_source(&SourceFile::new(
        "main.own",
        "import math;\nfn main(): i32 { return square(3) - math::square(3); }",
    ))
    .unwrap();

    let mut checker = TypeChecker::new(CompileOptions::default());
    checker.check_modules(vec![std, main, math]).unwrap();
    assert_eq!(checker.functions.len(), 2);
}
