pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod emit;
pub mod hierarchy;
pub mod input;
pub mod instr;
pub mod lower;
pub mod mangle;
pub mod opcodes;
pub mod reduce;
pub mod unit;

use std::path::Path;

use config::LowerOptions;
use diagnostics::CompileError;
use emit::LoweredUnit;

/// Lower a JSON program held in memory (parse → build → reduce → lower).
/// No file I/O. Useful for tests that only need the generated text or errors.
pub fn lower_source(source: &str, options: &LowerOptions) -> Result<LoweredUnit, CompileError> {
    let program = input::parse_program(source)?;
    emit::lower_program(&program, options)
}

/// Read a JSON program from disk and lower it.
pub fn lower_file(path: &Path, options: &LowerOptions) -> Result<LoweredUnit, CompileError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| CompileError::io(format!("cannot read input: {e}"), path.to_path_buf()))?;
    lower_source(&source, options)
}
