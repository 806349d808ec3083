use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::CompileError;

/// Default configuration file looked up next to the input.
pub const CONFIG_FILE: &str = "bcnative.toml";

/// Options controlling one lowering run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LowerOptions {
    /// Run the expression reducer before emission.
    pub reduce: bool,
    /// Emit a `/* mnemonic */` comment before each instruction.
    pub annotate: bool,
    /// Skip methods that fail to lower instead of aborting the unit.
    pub keep_going: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self { reduce: true, annotate: false, keep_going: false }
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    lower: LowerOptions,
}

/// Parse configuration text. `path` is only used for error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<LowerOptions, CompileError> {
    let parsed: TomlConfig = toml::from_str(text)
        .map_err(|e| CompileError::config(e.message().to_string(), path.to_path_buf()))?;
    Ok(parsed.lower)
}

/// Load options from `path`.
pub fn load_config(path: &Path) -> Result<LowerOptions, CompileError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CompileError::config(format!("cannot read config: {e}"), path.to_path_buf()))?;
    parse_config(&text, path)
}

/// The `bcnative.toml` beside `input`, if one exists.
pub fn find_config(input: &Path) -> Option<PathBuf> {
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    let candidate = dir.join(CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}
