#![allow(dead_code)]

use std::process::Command;

use bcnative::config::LowerOptions;
use bcnative::diagnostics::CompileError;
use serde_json::{Value, json};

pub fn bcnative() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bcnative"))
}

/// A one-class program around a single method.
pub fn program_with(method: Value) -> String {
    json!({
        "classes": [{
            "name": "t/Main",
            "super_name": "java/lang/Object",
            "methods": [method],
        }]
    })
    .to_string()
}

/// A static method `t/Main.run` with the given descriptor and code.
pub fn method(descriptor: &str, code: Value) -> Value {
    json!({
        "name": "run",
        "descriptor": descriptor,
        "is_static": true,
        "max_stack": 8,
        "max_locals": 8,
        "code": code,
    })
}

/// Lower one method and return its C function text.
pub fn try_lower_method(method: Value, options: &LowerOptions) -> Result<String, CompileError> {
    let unit = bcnative::lower_source(&program_with(method), options)?;
    Ok(unit.methods.into_iter().map(|m| m.code).collect())
}

pub fn lower_method(method: Value) -> String {
    try_lower_method(method, &LowerOptions::default())
        .unwrap_or_else(|e| panic!("lowering failed: {e}"))
}

pub fn lower_method_unreduced(method: Value) -> String {
    let options = LowerOptions { reduce: false, ..LowerOptions::default() };
    try_lower_method(method, &options).unwrap_or_else(|e| panic!("lowering failed: {e}"))
}

/// Lower a static `()V` method with the given code.
pub fn lower_code(code: Value) -> String {
    lower_method(method("()V", code))
}

pub fn lower_code_unreduced(code: Value) -> String {
    lower_method_unreduced(method("()V", code))
}

/// Lower a static `()V` method that must fail; the error is still wrapped in
/// its method context.
pub fn lower_code_err(code: Value) -> CompileError {
    match try_lower_method(method("()V", code), &LowerOptions::default()) {
        Ok(text) => panic!("expected lowering to fail, got:\n{text}"),
        Err(err) => err,
    }
}

/// Trimmed, non-empty lines of generated code.
pub fn lines(text: &str) -> Vec<String> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

/// Assert that each needle appears, in this order, on successive matching lines.
pub fn assert_in_order(text: &str, needles: &[&str]) {
    let all = lines(text);
    let mut from = 0;
    for needle in needles {
        match all[from..].iter().position(|l| l.contains(needle)) {
            Some(offset) => from += offset + 1,
            None => panic!("'{needle}' not found in order in:\n{text}"),
        }
    }
}

pub fn count(text: &str, needle: &str) -> usize {
    text.matches(needle).count()
}
