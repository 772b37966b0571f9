//! Compilation options shared by the library entry point and the driver.

/// Knobs controlling one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Package holding the entry point.
    pub entry_package: String,
    /// Name of the entry function inside `entry_package`.
    pub entry_function: String,
    /// Parse the bundled `std` prelude ahead of the user files.
    pub include_std: bool,
    /// Nesting bound for template instantiations triggered while
    /// instantiating another template.
    pub max_instantiation_depth: usize,
    /// Turn the first warning into a fatal error.
    pub warnings_as_errors: bool,
    /// Require the entry point to exist.
    pub require_entry: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            entry_package: String::from("main"),
            entry_function: String::from("main"),
            include_std: true,
            max_instantiation_depth: 64,
            warnings_as_errors: false,
            require_entry: true,
        }
    }
}

impl CompileOptions {
    /// Options for compiling a library fragment without an entry point.
    pub fn library() -> Self {
        CompileOptions {
            require_entry: false,
            ..Default::default()
        }
    }
}
