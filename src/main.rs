use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use bcnative::config::{self, LowerOptions};
use bcnative::diagnostics::{CompileError, render_error};

#[derive(Parser)]
#[command(name = "bcnative", version, about = "Lower JVM bytecode to C source")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower every method of a decoded program to a C translation unit
    Lower {
        /// Decoded program (JSON)
        input: PathBuf,
        /// Output C file. If omitted, prints to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the dependency and virtual-call lists as JSON
        #[arg(long)]
        deps: Option<PathBuf>,
        /// Skip the expression reducer
        #[arg(long)]
        no_reduce: bool,
        /// Emit a comment before each lowered instruction
        #[arg(long)]
        annotate: bool,
        /// Skip methods that fail to lower
        #[arg(long)]
        keep_going: bool,
        /// Configuration file (defaults to bcnative.toml next to the input)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the mangled C symbol of a method
    Mangle {
        /// Internal owner name, e.g. java/lang/String
        owner: String,
        /// Method name
        name: String,
        /// Method descriptor, e.g. (I)V
        descriptor: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn resolve_options(
    input: &Path,
    config_path: Option<&Path>,
    no_reduce: bool,
    annotate: bool,
    keep_going: bool,
) -> Result<LowerOptions, CompileError> {
    let mut options = match config_path.map(Path::to_path_buf).or_else(|| config::find_config(input)) {
        Some(path) => config::load_config(&path)?,
        None => LowerOptions::default(),
    };
    if no_reduce {
        options.reduce = false;
    }
    options.annotate |= annotate;
    options.keep_going |= keep_going;
    Ok(options)
}

fn write_file(path: &Path, contents: &str) -> Result<(), CompileError> {
    std::fs::write(path, contents)
        .map_err(|e| CompileError::io(format!("cannot write output: {e}"), path.to_path_buf()))
}

fn fail(source: &str, filename: &str, err: &CompileError) -> ! {
    render_error(source, filename, err);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Lower { input, output, deps, no_reduce, annotate, keep_going, config } => {
            let filename = input.to_string_lossy().to_string();
            let source = match std::fs::read_to_string(&input) {
                Ok(text) => text,
                Err(e) => fail(
                    "",
                    &filename,
                    &CompileError::io(format!("cannot read input: {e}"), input.clone()),
                ),
            };
            let options = match resolve_options(&input, config.as_deref(), no_reduce, annotate, keep_going) {
                Ok(options) => options,
                Err(err) => fail(&source, &filename, &err),
            };
            let unit = match bcnative::lower_source(&source, &options) {
                Ok(unit) => unit,
                Err(err) => fail(&source, &filename, &err),
            };

            let c_text = unit.to_c();
            let written = match &output {
                Some(path) => write_file(path, &c_text),
                None => {
                    print!("{c_text}");
                    Ok(())
                }
            };
            if let Err(err) = written {
                fail(&source, &filename, &err);
            }
            if let Some(path) = &deps {
                let json = match serde_json::to_string_pretty(&unit.manifest()) {
                    Ok(json) => json,
                    Err(e) => fail(&source, &filename, &CompileError::io(e.to_string(), path.clone())),
                };
                if let Err(err) = write_file(path, &json) {
                    fail(&source, &filename, &err);
                }
            }

            for skipped in &unit.skipped {
                eprintln!("warning: skipped {}: {}", skipped.method, skipped.error);
            }
            eprintln!(
                "lowered {} method(s), skipped {}",
                unit.methods.len(),
                unit.skipped.len()
            );
        }
        Commands::Mangle { owner, name, descriptor } => {
            match bcnative::mangle::method_symbol_from_descriptor(&owner, &name, &descriptor) {
                Ok(symbol) => println!("{symbol}"),
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            }
        }
    }
}
