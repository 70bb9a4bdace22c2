//! End-to-end compilation pipeline.
//!
//! [`compile_file`] drives the full chain for an on-disk entry point:
//!
//! ```text
//! load → merge → analyze → allocate names → emit
//! ```
//!
//! [`compile_source`] runs the same chain over in-memory source text (one
//! module, no imports), which is what the integration tests and examples
//! use.
//!
//! All phases share one arena bundle created at the top of the pipeline;
//! the merged program and every AST node borrow from it, and everything is
//! freed together when the pipeline returns.

use std::path::Path;

use casm_base::{Diagnostic, DiagnosticList};
use casm_language::{AstArenas, AstContext, Parser};

use crate::codegen_c::emit_c;
use crate::codegen_wat::emit_wat;
use crate::loader::{finalize_single_module, LoadError, ModuleLoader};
use crate::name_alloc::allocate_names;
use crate::semantics::analyze_program;

/// Emission target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    C,
    Wat,
}

impl Target {
    /// The default output file name for this target.
    pub fn default_output(self) -> &'static str {
        match self {
            Target::C => "out.c",
            Target::Wat => "out.wat",
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Target::C),
            "wat" => Ok(Target::Wat),
            other => Err(format!("Unknown target '{}' (expected 'c' or 'wat')", other)),
        }
    }
}

/// A failed compilation. Diagnostics keep their source locations so the
/// driver can print them in the `<file>:<line>:<col>: <message>` shape.
#[derive(Debug)]
pub enum CompileError {
    Io { message: String },
    Import { message: String },
    Parse { diagnostics: Vec<Diagnostic> },
    Semantic { diagnostics: Vec<Diagnostic> },
    Emit { message: String },
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Io { message }
            | CompileError::Import { message }
            | CompileError::Emit { message } => f.write_str(message),
            CompileError::Parse { diagnostics } | CompileError::Semantic { diagnostics } => {
                // One line per diagnostic, grouped by source file.
                let mut list = DiagnosticList::new();
                for diag in diagnostics {
                    list.push(diag.clone());
                }
                f.write_str(list.render().trim_end())
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LoadError> for CompileError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io { message } => CompileError::Io { message },
            LoadError::Import { message } => CompileError::Import { message },
            LoadError::Parse { diagnostics } => CompileError::Parse { diagnostics },
        }
    }
}

/// Compiles the program rooted at `entry` to target text.
pub fn compile_file(entry: &Path, target: Target) -> Result<String, CompileError> {
    let arenas = AstArenas::new();
    let ctx = AstContext::new(&arenas);

    let mut loader = ModuleLoader::new(ctx);
    let mut program = loader.load_program(entry)?;

    let mut diagnostics = DiagnosticList::new();
    if !analyze_program(&program, &mut diagnostics) {
        return Err(CompileError::Semantic {
            diagnostics: diagnostics.into_vec(),
        });
    }

    allocate_names(&mut program);

    match target {
        Target::C => Ok(emit_c(&program)),
        Target::Wat => emit_wat(&program).map_err(|e| CompileError::Emit {
            message: e.to_string(),
        }),
    }
}

/// Compiles a single in-memory module. `file` is the display path used in
/// diagnostics and debug output.
pub fn compile_source(source: &str, file: &str, target: Target) -> Result<String, CompileError> {
    let arenas = AstArenas::new();
    let ctx = AstContext::new(&arenas);
    let source = ctx.str(source);

    let mut parser = Parser::new(ctx, source);
    let mut program = parser.parse();
    let parse_errors = parser.into_errors();
    if !parse_errors.is_empty() {
        return Err(CompileError::Parse {
            diagnostics: parse_errors
                .into_iter()
                .map(|e| Diagnostic::new(file, e.message, e.location))
                .collect(),
        });
    }
    finalize_single_module(&mut program, file);

    let mut diagnostics = DiagnosticList::new();
    if !analyze_program(&program, &mut diagnostics) {
        return Err(CompileError::Semantic {
            diagnostics: diagnostics.into_vec(),
        });
    }

    allocate_names(&mut program);

    match target {
        Target::C => Ok(emit_c(&program)),
        Target::Wat => emit_wat(&program).map_err(|e| CompileError::Emit {
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn target_parsing() {
        assert_eq!("c".parse::<Target>().unwrap(), Target::C);
        assert_eq!("wat".parse::<Target>().unwrap(), Target::Wat);
        assert!("exe".parse::<Target>().is_err());
    }

    #[test]
    fn default_outputs_follow_the_target() {
        assert_eq!(Target::C.default_output(), "out.c");
        assert_eq!(Target::Wat.default_output(), "out.wat");
    }

    #[test]
    fn compile_source_produces_both_targets() {
        let source = "i32 main() { return 0; }";
        let c = compile_source(source, "demo.csm", Target::C).unwrap();
        assert!(c.contains("int32_t main(void)"));
        let wat = compile_source(source, "demo.csm", Target::Wat).unwrap();
        assert!(wat.contains("(func $main"));
    }

    #[test]
    fn parse_errors_become_diagnostics() {
        let err = compile_source("i32 main( { }", "demo.csm", Target::C).unwrap_err();
        match err {
            CompileError::Parse { diagnostics } => {
                assert!(!diagnostics.is_empty());
                assert!(diagnostics[0].to_string().starts_with("demo.csm:"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn semantic_errors_become_diagnostics() {
        let err = compile_source("i32 main() { return missing; }", "demo.csm", Target::C)
            .unwrap_err();
        match err {
            CompileError::Semantic { diagnostics } => {
                assert!(diagnostics
                    .iter()
                    .any(|d| d.message.contains("Undefined variable")));
            }
            other => panic!("expected semantic error, got {:?}", other),
        }
    }

    #[test]
    fn compile_file_follows_imports() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("math.csm"),
            "i32 add(i32 a, i32 b) { return a + b; }",
        )
        .unwrap();
        let main = dir.path().join("main.csm");
        fs::write(
            &main,
            "#import add from \"./math.csm\";\ni32 main() { return add(20, 22); }",
        )
        .unwrap();

        let c = compile_file(&main, Target::C).unwrap();
        assert!(c.contains("int32_t add(int32_t a, int32_t b)"));
        assert!(c.contains("return add(20, 22);"));
    }

    #[test]
    fn same_input_compiles_to_identical_bytes() {
        let source = "i32 fib(i32 n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }\n\
                      i32 main() { return fib(10); }";
        let first = compile_source(source, "fib.csm", Target::Wat).unwrap();
        let second = compile_source(source, "fib.csm", Target::Wat).unwrap();
        assert_eq!(first, second);
    }
}
