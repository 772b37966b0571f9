//! Integration tests for end-to-end compilation.
//!
//! These tests drive the public pipeline from source text through
//! tokenization, parsing, the lowering passes and IR emission.

use ownc::{
    compile,
    compiler::stdlib::STD_PRELUDE,
    config::CompileOptions,
    errors::{
        errors::Error,
        report::{render_error, render_warning, SourceMap},
    },
    Compilation, SourceFile,
};
use pretty_assertions::assert_eq;

fn compile_files(files: &[(&str, &str)], options: &CompileOptions) -> Result<Compilation, Error> {
    let files: Vec<SourceFile> = files
        .iter()
        .map(|(name, text)| SourceFile::new(*name, *text))
        .collect();
    compile(&files, options)
}

fn compile_main(source: &str) -> Compilation {
    compile_files(&[("main.own", source)], &CompileOptions::default()).unwrap()
}

fn sources(files: &[(&str, &str)]) -> SourceMap {
    let mut map = SourceMap::new();
    map.add("std.own", STD_PRELUDE);
    for (name, text) in files {
        map.add(*name, *text);
    }
    map
}

#[test]
fn test_compile_hello_world() {
    let compilation = compile_main("fn main() { println!(\"Hello, %!\", \"world\"); }");

    assert!(compilation.warnings.is_empty());
    assert!(compilation.ir.contains("c\"Hello, %s!\\0A\\00\""));
    assert!(compilation.ir.contains("define i32 @\"main\"()"));
}

#[test]
fn test_compile_multiple_packages() {
    let files = [
        (
            "geometry.own",
            "package geometry;
            struct Point {
                var x: i32 = 0;
                var y: i32 = 0;
                const fn manhattan(): i32 { return x + y; }
            }
            fn origin(): Point { return Point{}; }",
        ),
        (
            "main.own",
            "import geometry;
            fn main(): i32 {
                var p = geometry::Point{x: 3, y: 4};
                var o = origin();
                return p.manhattan() - o.manhattan();
            }",
        ),
    ];
    let compilation = compile_files(&files, &CompileOptions::default()).unwrap();

    assert!(compilation.ir.contains("%\"geometry::Point\" = type <{ i32, i32 }>"));
    assert!(compilation.ir.contains("define i32 @\"geometry::Point.manhattan\"(ptr %p0)"));
    assert!(compilation.ir.contains("call i32 @\"main::main\"()"));
}

#[test]
fn test_compile_template_function() {
    let compilation = compile_main(
        "template <T> fn max(a: T, b: T): T {
            if (a > b) { return a; }
            return b;
        }
        fn main(): i32 {
            var big: i64 = max<i64>(1, 2);
            return max<i32>(3, 4) + max<i32>(5, 6);
        }",
    );

    let definitions: Vec<&str> = compilation
        .ir
        .lines()
        .filter(|line| line.starts_with("define"))
        .collect();
    assert_eq!(
        definitions,
        vec![
            "define i32 @\"main::main\"() {",
            "define i64 @\"main::max.1\"(i64 %p0, i64 %p1) {",
            "define i32 @\"main::max.2\"(i32 %p0, i32 %p1) {",
            "define i32 @\"main\"() {",
        ]
    );
}

#[test]
fn test_compile_owned_array() {
    let compilation = compile_main(
        "fn sum(values: *i32[], count: i32): i32 {
            var total = 0;
            for (var i = 0; i < count; i += 1) {
                total += values[i];
            }
            return total;
        }
        fn main(): i32 {
            var values = new [4]i32{1};
            return sum(#values, 4);
        }",
    );

    assert!(compilation.ir.contains("getelementptr inbounds i32, ptr"));
    assert_eq!(compilation.ir.matches("call void @\"free\"").count(), 1);
}

#[test]
fn test_compile_labelled_loops() {
    let compilation = compile_main(
        "fn main(): i32 {
            var found = 0;
            for @rows (var r = 0; r < 10; r += 1) {
                for (var c = 0; c < 10; c += 1) {
                    if (r * c == 12) {
                        found = r;
                        break @rows;
                    }
                    if (c > r) { continue @rows; }
                }
            }
            return found;
        }",
    );

    assert!(compilation.warnings.is_empty());
    assert!(compilation.ir.contains("icmp eq i32"));
}

#[test]
fn test_unreachable_code_warning() {
    let source = "fn main(): i32 {\n    return 0;\n    var x = 1;\n}\n";
    let compilation = compile_main(source);

    assert_eq!(compilation.warnings.len(), 1);
    let rendered = render_warning(&compilation.warnings[0], &sources(&[("main.own", source)]));
    assert_eq!(
        rendered,
        "Warning: Unreachable code
-> main.own:3:5
  |
3 |     var x = 1;
  |     ^^^^^^^^^
"
    );
}

#[test]
fn test_warnings_as_errors() {
    let options = CompileOptions {
        warnings_as_errors: true,
        ..CompileOptions::default()
    };
    let error = compile_files(&[("main.own", "fn main() { return; main(); }")], &options).unwrap_err();

    assert_eq!(error.get_error_name(), "UnreachableCode");
}

#[test]
fn test_moved_value_report() {
    let source = "fn take(p: &i32) {}\nfn main() {\n    var p = new i32(1);\n    take(p);\n    take(p);\n}\n";
    let error = compile_files(&[("main.own", source)], &CompileOptions::default()).unwrap_err();

    assert_eq!(
        render_error(&error, &sources(&[("main.own", source)])),
        "Error: Cannot use moved value 'p' (share `p` with `#p` instead of moving it)
-> main.own:5:10
  |
5 |     take(p);
  |          ^
Moved here:
-> main.own:4:10
  |
4 |     take(p);
  |          ^
"
    );
}

#[test]
fn test_duplicate_global_report() {
    let error = compile_files(
        &[
            ("a.own", "package shapes;\nfn area(): i32 { return 1; }"),
            ("b.own", "package shapes;\nfn area(): i32 { return 2; }"),
        ],
        &CompileOptions::library(),
    )
    .unwrap_err();

    assert_eq!(error.message(), "Global 'area' already exists");
    let related = error.get_related().unwrap();
    assert_eq!(related.label, "Already declared here");
    assert_eq!(related.span.start.1.as_str(), "a.own");
}

#[test]
fn test_custom_entry_point() {
    let options = CompileOptions {
        entry_function: String::from("start"),
        ..CompileOptions::default()
    };
    let compilation = compile_files(&[("main.own", "fn start(): i32 { return 7; }")], &options).unwrap();

    assert!(compilation.ir.contains("%t1 = call i32 @\"main::start\"()"));
}

#[test]
fn test_without_std() {
    let options = CompileOptions {
        include_std: false,
        ..CompileOptions::default()
    };
    let error = compile_files(&[("main.own", "fn main() { print!(\"hi\"); }")], &options).unwrap_err();
    assert_eq!(error.get_error_name(), "UndefinedMacro");

    let compilation = compile_files(&[("main.own", "fn main() {}")], &options).unwrap();
    assert!(!compilation.ir.contains("@\"atoi\""));
}

#[test]
fn test_lex_error_invalid_token() {
    let error = compile_files(&[("main.own", "fn main() { $ }")], &CompileOptions::default()).unwrap_err();
    assert_eq!(error.get_error_name(), "UnrecognisedToken");
}

#[test]
fn test_parse_error_missing_semicolon() {
    let error = compile_files(&[("main.own", "fn main() { var x = 1 }")], &CompileOptions::default()).unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_compile_comments() {
    let compilation = compile_main(
        "// entry point
        fn main(): i32 {
            // nothing to see
            return 0; // done
        }",
    );
    assert!(compilation.ir.contains("ret i32 0"));
}
