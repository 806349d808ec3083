use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unsupported input: {msg}")]
    Unsupported { msg: String },

    #[error("Malformed reduction: {msg}")]
    MalformedReduction { msg: String },

    #[error("Unbalanced try region: {msg}")]
    UnbalancedTry { msg: String },

    #[error("Input error: {msg}")]
    Input { msg: String, line: usize, column: usize },

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },

    #[error("in {method}: {source}")]
    Method {
        method: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported { msg: msg.into() }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedReduction { msg: msg.into() }
    }

    pub fn unbalanced_try(msg: impl Into<String>) -> Self {
        Self::UnbalancedTry { msg: msg.into() }
    }

    pub fn input(msg: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Input { msg: msg.into(), line, column }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }

    /// Attach the symbol of the method being lowered. Already-wrapped errors are
    /// returned unchanged so the innermost method name wins.
    pub fn in_method(self, method: impl Into<String>) -> Self {
        match self {
            wrapped @ Self::Method { .. } => wrapped,
            other => Self::Method { method: method.into(), source: Box::new(other) },
        }
    }

    /// The error with any method wrapper removed.
    pub fn root(&self) -> &CompileError {
        match self {
            Self::Method { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(e: serde_json::Error) -> Self {
        CompileError::input(e.to_string(), e.line(), e.column())
    }
}

/// Byte offset of a 1-based line/column position, clamped to the source length.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            return (offset + column.saturating_sub(1)).min(source.len());
        }
        offset += text.len();
    }
    source.len()
}

/// Render a CompileError with ariadne for nice terminal output.
pub fn render_error(source: &str, filename: &str, err: &CompileError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err {
        CompileError::Input { msg, line, column } => {
            let start = offset_of(source, *line, *column);
            let end = (start + 1).min(source.len()).max(start);
            let printed = Report::build(ReportKind::Error, (), start)
                .with_message(format!("invalid input in {filename}"))
                .with_label(Label::new(start..end).with_message(msg))
                .finish()
                .eprint(Source::from(source));
            if printed.is_err() {
                eprintln!("error: {err}");
            }
        }
        CompileError::Config { msg, path } => {
            eprintln!("error[config]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        CompileError::Io { msg, path } => {
            eprintln!("error[io]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        CompileError::Method { method, source: inner } => {
            eprintln!("error: while lowering {method}");
            render_error(source, filename, inner);
        }
        CompileError::Unsupported { .. }
        | CompileError::MalformedReduction { .. }
        | CompileError::UnbalancedTry { .. } => {
            eprintln!("error: {err}");
        }
    }
}
