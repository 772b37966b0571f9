//! Native object emission through LLVM.
//!
//! Parses the textual module back into LLVM, verifies it and writes an
//! object file for the host target.

use std::path::Path;

use inkwell::{
    context::Context,
    memory_buffer::MemoryBuffer,
    targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine},
    OptimizationLevel,
};
use tracing::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Span,
};

fn backend(message: impl ToString) -> Error {
    Error::new(
        ErrorImpl::Backend {
            message: message.to_string(),
        },
        Span::null(),
    )
}

/// Writes `ir` as a native object file.
///
/// # Arguments
///
/// * `ir` - Textual module produced by `emit_module`
/// * `output` - Path of the object file to write
pub fn write_object(ir: &str, output: &Path) -> Result<(), Error> {
    let context = Context::create();
    let buffer = MemoryBuffer::create_from_memory_range_copy(ir.as_bytes(), "module");
    let module = context.create_module_from_ir(buffer).map_err(backend)?;
    module.verify().map_err(backend)?;

    Target::initialize_native(&InitializationConfig::default()).map_err(backend)?;
    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple).map_err(backend)?;
    let machine = target
        .create_target_machine(
            &triple,
            "generic",
            "",
            OptimizationLevel::Default,
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| backend("no target machine for the host"))?;

    module.set_triple(&triple);
    module.set_data_layout(&machine.get_target_data().get_data_layout());

    debug!(output = %output.display(), "writing object file");
    machine
        .write_to_file(&module, FileType::Object, output)
        .map_err(backend)
}
