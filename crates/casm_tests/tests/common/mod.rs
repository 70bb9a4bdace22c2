//! E2E test harness.
//!
//! Helpers for compiling casm source text (or multi-file trees) to both
//! targets and asserting on the emitted text.

// Each test binary compiles its own copy of this module and uses a subset
// of the helpers.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

pub use casm_compile::compile::{compile_file, compile_source, CompileError, Target};

/// Compiles a single module to C, panicking on any error.
pub fn compile_to_c(source: &str) -> String {
    compile_source(source, "test.csm", Target::C)
        .unwrap_or_else(|e| panic!("compilation failed:\n{}", e))
}

/// Compiles a single module to WAT, panicking on any error.
pub fn compile_to_wat(source: &str) -> String {
    compile_source(source, "test.csm", Target::Wat)
        .unwrap_or_else(|e| panic!("compilation failed:\n{}", e))
}

/// Compiles a single module, returning the rendered diagnostics of the
/// expected failure.
pub fn compile_expecting_errors(source: &str, target: Target) -> String {
    match compile_source(source, "test.csm", target) {
        Ok(_) => panic!("expected compilation to fail"),
        Err(err) => err.to_string(),
    }
}

/// A temporary source tree for multi-file tests.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    /// Writes a file into the tree and returns its path.
    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write source file");
        path
    }

    /// Compiles the given entry file.
    pub fn compile(&self, entry: &str, target: Target) -> Result<String, CompileError> {
        compile_file(&self.dir.path().join(entry), target)
    }
}
