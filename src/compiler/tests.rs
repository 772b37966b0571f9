use pretty_assertions::assert_eq;

use crate::{
    compile, config::CompileOptions, errors::errors::Error, SourceFile,
};

use super::{
    builder::{IrBuilder, Value},
    stdlib::{has_macro_handler, macro_handler},
};

fn emit_with(source: &str, options: CompileOptions) -> Result<String, Error> {
    compile(&[SourceFile::new("test.own", source)], &options).map(|compilation| compilation.ir)
}

fn emit(source: &str) -> String {
    emit_with(source, CompileOptions::default()).unwrap()
}

fn emit_library(source: &str) -> String {
    emit_with(source, CompileOptions::library()).unwrap()
}

const RUNTIME: &str = "declare ptr @\"malloc\"(i64)
declare void @\"free\"(ptr)
declare i32 @\"printf\"(ptr, ...)
declare i32 @\"atoi\"(ptr)
declare i32 @\"rand\"()
declare void @\"srand\"(i32)";

#[test]
fn test_empty_main() {
    let ir = emit("fn main() {}");

    let expected = format!(
        "{}

define void @\"main::main\"() {{
entry:
  ret void
}}

define i32 @\"main\"() {{
entry:
  call void @\"main::main\"()
  ret i32 0
}}
",
        RUNTIME
    );
    assert_eq!(ir, expected);
}

#[test]
fn test_call_with_parameters() {
    let ir = emit(
        "fn add(a: i32, b: i32): i32 { return a + b; }
        fn main(): i32 { return add(1, 2); }",
    );

    assert!(ir.contains(
        "define i32 @\"main::add\"(i32 %p0, i32 %p1) {
entry:
  %t1 = alloca i32
  %t2 = alloca i32
  store i32 %p0, ptr %t1
  store i32 %p1, ptr %t2
  %t3 = load i32, ptr %t1
  %t4 = load i32, ptr %t2
  %t5 = add i32 %t3, %t4
  ret i32 %t5
}"
    ));
    assert!(ir.contains(
        "define i32 @\"main\"() {
entry:
  %t1 = call i32 @\"main::main\"()
  ret i32 %t1
}"
    ));
    assert!(ir.contains("%t1 = call i32 @\"main::add\"(i32 1, i32 2)"));
}

#[test]
fn test_while_loop_blocks() {
    let ir = emit_library(
        "fn f(): i32 {
            var n = 0;
            while (n < 10) { n += 1; }
            return n;
        }",
    );

    assert!(ir.contains(
        "define i32 @\"main::f\"() {
entry:
  %t1 = alloca i32
  store i32 0, ptr %t1
  br label %L1
L1:
  %t2 = load i32, ptr %t1
  %t3 = icmp slt i32 %t2, 10
  br i1 %t3, label %L2, label %L4
L2:
  %t4 = load i32, ptr %t1
  %t5 = add i32 %t4, 1
  store i32 %t5, ptr %t1
  br label %L3
L3:
  br label %L1
L4:
  %t6 = load i32, ptr %t1
  ret i32 %t6
}"
    ));
}

#[test]
fn test_owned_local_is_freed() {
    let ir = emit_library("fn f() { var p = new i32(7); }");

    assert!(ir.contains(
        "define void @\"main::f\"() {
entry:
  %t1 = alloca ptr
  %t2 = call ptr @\"malloc\"(i64 4)
  store i32 7, ptr %t2
  store ptr %t2, ptr %t1
  %t3 = load ptr, ptr %t1
  call void @\"free\"(ptr %t3)
  ret void
}"
    ));
}

#[test]
fn test_moved_local_is_not_freed_twice() {
    let ir = emit_library(
        "fn take(p: &i32) {}
        fn f() { var p = new i32(1); take(p); }",
    );

    // Only `take` releases it.
    assert_eq!(ir.matches("call void @\"free\"").count(), 1);
}

#[test]
fn test_short_circuit_and() {
    let ir = emit_library("fn f(a: bool, b: bool): bool { return a && b; }");

    assert!(ir.contains("br i1 %t3, label %L1, label %L2"));
    assert!(ir.contains("%t5 = phi i1 [ false, %entry ], [ %t4, %L1 ]"));
}

#[test]
fn test_constant_condition_is_folded() {
    let ir = emit_library(
        "const DEBUG = false;
        fn f(): i32 {
            if (DEBUG) { return 1; }
            return 2;
        }",
    );

    assert!(ir.contains("@\"main::DEBUG\" = constant i1 false"));
    assert!(!ir.contains("ret i32 1"));
    assert!(ir.contains("ret i32 2"));
}

#[test]
fn test_unreachable_statements_are_not_emitted() {
    let ir = emit_library("fn f(): i32 { return 1; var x = 2; }");

    assert!(ir.contains("ret i32 1"));
    assert!(!ir.contains("store i32 2"));
}

#[test]
fn test_globals() {
    let ir = emit_library(
        "var counter: i32 = 3;
        const LIMIT = 10;
        var flag: bool;",
    );

    assert!(ir.contains("@\"main::counter\" = global i32 3"));
    assert!(ir.contains("@\"main::LIMIT\" = constant i32 10"));
    assert!(ir.contains("@\"main::flag\" = global i1 false"));
}

#[test]
fn test_struct_layout_and_methods() {
    let ir = emit_library(
        "struct P {
            var x: i32;
            var y: i64 = 0;
            const fn get(): i32 { return x; }
        }
        fn f(p: *P): i32 { return p.get(); }",
    );

    assert!(ir.contains("%\"main::P\" = type <{ i32, i64 }>"));
    assert!(ir.contains("define i32 @\"main::P.get\"(ptr %p0)"));
    assert!(ir.contains("getelementptr inbounds %\"main::P\", ptr %t2, i32 0, i32 0"));
    assert!(ir.contains("call i32 @\"main::P.get\"(ptr %t2)"));
}

#[test]
fn test_template_instance_type() {
    let ir = emit(
        "template <T> struct Box { var value: T; }
        fn main() { var b = Box<i32>{value: 1}; }",
    );

    assert!(ir.contains("%\"main::Box.1\" = type <{ i32 }>"));
    assert!(ir.contains("insertvalue %\"main::Box.1\" zeroinitializer, i32 1, 0"));
}

#[test]
fn test_heap_struct() {
    let ir = emit_library(
        "struct P { var x: i32; var y: i32; }
        fn f(): i32 { var p = new P{x: 1, y: 2}; return p.y; }",
    );

    assert!(ir.contains("call ptr @\"malloc\"(i64 8)"));
    assert!(ir.contains("getelementptr inbounds %\"main::P\", ptr"));
    assert!(ir.contains("call void @\"free\""));
}

#[test]
fn test_vararg_promotion() {
    let ir = emit_library("fn f(b: i8) { printf(\"%d\", b); }");

    assert!(ir.contains("%t3 = sext i8 %t2 to i32"));
    assert!(ir.contains("%t4 = call i32 (ptr, ...) @\"printf\"(ptr @.str.0, i32 %t3)"));
}

#[test]
fn test_println_integer() {
    let ir = emit_library("fn f() { println!(\"x = %\", 5); }");

    assert!(ir.contains("@.str.0 = private unnamed_addr constant [8 x i8] c\"x = %d\\0A\\00\""));
    assert!(ir.contains("call i32 (ptr, ...) @\"printf\"(ptr @.str.0, i32 5)"));
}

#[test]
fn test_print_bool() {
    let ir = emit_library("fn f(b: bool) { print!(\"flag: %\", b); }");

    assert!(ir.contains("%t3 = select i1 %t2, ptr @.str.0, ptr @.str.1"));
    assert!(ir.contains("@.str.2 = private unnamed_addr constant [9 x i8] c\"flag: %s\\00\""));
}

#[test]
fn test_print_sized_array() {
    let ir = emit_library("fn f() { var a = []i64{3, 4}; print!(\"%\", a); }");

    assert!(ir.contains("c\"[%lld, %lld]\\00\""));
}

#[test]
fn test_print_struct_with_to_string() {
    let ir = emit_library(
        "struct Name {
            var text: const i8[];
            const fn _string(): const i8[] { return text; }
        }
        fn f(n: *Name) { print!(\"%\", n); }",
    );

    assert!(ir.contains("call ptr @\"main::Name._string\"(ptr"));
}

#[test]
fn test_format_argument_count() {
    let error = emit_with("fn f() { println!(\"% %\", 1); }", CompileOptions::library()).unwrap_err();

    assert_eq!(error.get_error_name(), "FormatArguments");
    assert_eq!(error.message(), "Format string expects 2 argument(s) but found 1");
}

#[test]
fn test_unprintable_type() {
    let error = emit_with("fn f(p: *i32) { print!(\"%\", p); }", CompileOptions::library()).unwrap_err();

    assert_eq!(error.get_error_name(), "UnprintableType");
}

#[test]
fn test_macro_registry() {
    assert!(has_macro_handler("std::print"));
    assert!(has_macro_handler("std::println"));
    assert!(!has_macro_handler("main::print"));
    assert!(macro_handler("std::shout").is_none());
}

#[test]
fn test_builder_opens_block_after_terminator() {
    let mut builder = IrBuilder::new();
    builder.begin_function("f", "void", &[]);
    builder.ret(None);
    builder.emit(String::from("call void @g()"));
    builder.end_function();

    assert_eq!(
        builder.finish(),
        "define void @\"f\"() {
entry:
  ret void
L1:
  call void @g()
  unreachable
}
"
    );
}

#[test]
fn test_builder_interns_strings() {
    let mut builder = IrBuilder::new();
    let first = builder.string("say \"hi\"");
    let second = builder.string("say \"hi\"");
    let other = builder.string("bye");

    assert_eq!(first, Value::new("ptr", "@.str.0"));
    assert_eq!(first, second);
    assert_eq!(other.repr, "@.str.1");
    assert_eq!(
        builder.finish(),
        "@.str.0 = private unnamed_addr constant [9 x i8] c\"say \\22hi\\22\\00\"
@.str.1 = private unnamed_addr constant [4 x i8] c\"bye\\00\"
"
    );
}
