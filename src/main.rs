use std::{
    ffi::OsStr,
    fs::{self, read_to_string},
    path::{Path, PathBuf},
    process::{exit, Command},
    time::Instant,
};

use clap::Parser;
use ownc::{
    compile,
    compiler::stdlib::STD_PRELUDE,
    config::CompileOptions,
    errors::report::{render_error, render_warning, SourceMap},
    SourceFile,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const SOURCE_EXTENSION: &str = "own";

/// Compiles `.own` sources to LLVM IR and links them into an executable.
#[derive(Parser, Debug)]
#[command(name = "ownc", version, about, long_about = None)]
struct Cli {
    /// Source files, or directories to search for `.own` files
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Output base name; the IR goes to `<path>.ll`
    #[arg(short, long, value_name = "PATH", default_value = "out")]
    output: PathBuf,

    /// Stop after writing the IR
    #[arg(long)]
    emit_ir: bool,

    /// Do not inject the bundled `std` package
    #[arg(long)]
    no_std: bool,

    #[arg(long, value_name = "N", default_value_t = CompileOptions::default().max_instantiation_depth)]
    max_template_depth: usize,

    /// `-W error` treats warnings as errors
    #[arg(short = 'W', value_name = "KIND", value_parser = ["error"])]
    warnings: Option<String>,
}

impl Cli {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            include_std: !self.no_std,
            max_instantiation_depth: self.max_template_depth,
            warnings_as_errors: self.warnings.is_some(),
            ..CompileOptions::default()
        }
    }
}

/// Collects source files, walking directories for `.own` files.
fn collect_sources(path: &Path, files: &mut Vec<SourceFile>) -> std::io::Result<()> {
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<_, _>>()?;
        entries.sort();
        for entry in entries {
            let is_source = entry
                .extension()
                .map_or(false, |extension| extension == SOURCE_EXTENSION);
            if entry.is_dir() || is_source {
                collect_sources(&entry, files)?;
            }
        }
        return Ok(());
    }

    let text = read_to_string(path)?;
    files.push(SourceFile::new(path.to_string_lossy(), text));
    Ok(())
}

#[cfg(feature = "llvm")]
fn link(ir_path: &Path, output: &Path) -> Result<(), String> {
    let ir = read_to_string(ir_path).map_err(|e| e.to_string())?;
    let object = output.with_extension("o");
    ownc::compiler::native::write_object(&ir, &object).map_err(|e| e.to_string())?;
    run("clang", &[object.as_os_str(), OsStr::new("-o"), output.as_os_str()])
}

#[cfg(not(feature = "llvm"))]
fn link(ir_path: &Path, output: &Path) -> Result<(), String> {
    run("clang", &[ir_path.as_os_str(), OsStr::new("-o"), output.as_os_str()])
}

fn run(program: &str, args: &[&OsStr]) -> Result<(), String> {
    let result = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("failed to run {}: {}", program, e))?;
    if !result.status.success() {
        return Err(format!(
            "{} failed:\n{}",
            program,
            String::from_utf8_lossy(&result.stderr)
        ));
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.options();
    let start = Instant::now();

    let mut files = vec![];
    for input in &cli.inputs {
        if let Err(e) = collect_sources(input, &mut files) {
            eprintln!("Error: cannot read {}: {}", input.display(), e);
            exit(1);
        }
    }
    debug!(files = files.len(), "collected sources");

    let mut sources = SourceMap::new();
    sources.add("std.own", STD_PRELUDE);
    for file in &files {
        sources.add(file.name.clone(), file.text.clone());
    }

    let compilation = match compile(&files, &options) {
        Ok(compilation) => compilation,
        Err(error) => {
            eprint!("{}", render_error(&error, &sources));
            exit(1);
        }
    };
    for warning in &compilation.warnings {
        eprint!("{}", render_warning(warning, &sources));
    }
    info!(elapsed = ?start.elapsed(), "generated IR");

    let ir_path = cli.output.with_extension("ll");
    if let Err(e) = fs::write(&ir_path, &compilation.ir) {
        eprintln!("Error: cannot write {}: {}", ir_path.display(), e);
        exit(1);
    }
    if cli.emit_ir {
        return;
    }

    if let Err(e) = link(&ir_path, &cli.output) {
        eprintln!("Error: {}", e);
        exit(1);
    }
    info!(elapsed = ?start.elapsed(), "linked");
}
