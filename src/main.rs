//! `casmc`, the command-line driver for the casm compiler.
//!
//! ```text
//! casmc [--target=c|wat] [--output=PATH] <source>
//! ```
//!
//! The default target is `wat`; the default output path is `out.c` or
//! `out.wat` in the working directory. Every failure prints diagnostics to
//! stderr, one per line as `<file>:<line>:<col>: <message>`, and exits
//! with status 1. Success writes the output file and exits 0.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use casm_compile::{compile_file, Target};

#[derive(Parser, Debug)]
#[command(
    name = "casmc",
    version,
    about = "Ahead-of-time compiler for the casm language",
    disable_help_subcommand = true
)]
struct Cli {
    /// Emission target: `c` or `wat`.
    #[arg(long, default_value = "wat")]
    target: String,

    /// Output path; defaults to `out.c`/`out.wat` by target.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Entry-point source file.
    source: PathBuf,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version requests are not failures.
            if err.use_stderr() {
                eprint!("{}", err);
                return ExitCode::from(1);
            }
            print!("{}", err);
            return ExitCode::SUCCESS;
        }
    };

    let target: Target = match cli.target.parse() {
        Ok(target) => target,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(1);
        }
    };

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(target.default_output()));

    match compile_file(&cli.source, target) {
        Ok(text) => {
            if let Err(err) = std::fs::write(&output, text) {
                eprintln!("Cannot write output file '{}': {}", output.display(), err);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}
