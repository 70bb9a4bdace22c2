//! Multi-file module loading and program merging.
//!
//! Given an entry path, the loader resolves imports depth-first, parses
//! each file exactly once, detects circular imports structurally, and
//! merges every loaded module into a single whole-program view.
//!
//! ## Algorithm
//!
//! 1. Resolve the import path: absolute paths are used verbatim, relative
//!    paths resolve against the importing file's directory, and `.`/`..`
//!    components are removed lexically.
//! 2. A path already on the in-flight chain is a circular import; fail.
//! 3. A path already in the cache is reused (diamond-shaped imports are a
//!    DAG, not a cycle).
//! 4. Otherwise read and parse the file, recurse into its imports, then
//!    append it to the cache. The cache therefore ends up in post-order,
//!    imports before importers.
//!
//! ## Merge
//!
//! The merged [`Program`] takes every cached module's functions in cache
//! order and the entry file's imports verbatim. Each merged function record
//! receives a symbol id (sequential from 1; 0 stays reserved), its original
//! name, and its owning module path. Function bodies are shared arena
//! references, so the merge copies top-level records only.

use std::path::{Component, Path, PathBuf};

use casm_base::Diagnostic;
use casm_language::{AstContext, Parser, Program};

/// Why loading failed. The loader stops at the first unrecoverable error;
/// later phases cannot run without a complete module graph.
#[derive(Debug)]
pub enum LoadError {
    /// A file could not be opened or read.
    Io { message: String },
    /// Import cycle or unresolvable import path.
    Import { message: String },
    /// A file failed to parse; carries every diagnostic from that file.
    Parse { diagnostics: Vec<Diagnostic> },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { message } | LoadError::Import { message } => f.write_str(message),
            LoadError::Parse { diagnostics } => {
                for (i, diag) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", diag)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// One parsed file held by the cache.
pub struct LoadedModule<'a> {
    /// Normalized absolute path; the cache key.
    pub resolved_path: PathBuf,
    /// Path used in diagnostics and debug output.
    pub display_path: String,
    /// Arena-allocated file contents; AST names borrow from this.
    pub source: &'a str,
    pub program: Program<'a>,
}

/// Loads an import graph and merges it into one program.
///
/// The loader owns the module cache; the merged program borrows statement
/// and expression nodes from the cached per-file ASTs through the shared
/// arenas, so the arenas (not the loader) must outlive it.
pub struct ModuleLoader<'a> {
    ctx: AstContext<'a>,
    modules: Vec<LoadedModule<'a>>,
    chain: Vec<PathBuf>,
}

impl<'a> ModuleLoader<'a> {
    pub fn new(ctx: AstContext<'a>) -> Self {
        Self {
            ctx,
            modules: Vec::new(),
            chain: Vec::new(),
        }
    }

    /// The cached modules, in load (post-) order.
    pub fn modules(&self) -> &[LoadedModule<'a>] {
        &self.modules
    }

    /// Loads `entry` and its transitive imports, returning the merged
    /// program.
    pub fn load_program(&mut self, entry: &Path) -> Result<Program<'a>, LoadError> {
        let entry_display = entry.to_string_lossy().into_owned();
        let resolved = absolutize(entry).map_err(|message| LoadError::Io { message })?;
        let base = parent_dir(&resolved);
        self.load_module(&base, &resolved, &entry_display)?;
        Ok(self.merge())
    }

    fn load_module(
        &mut self,
        base: &Path,
        path: &Path,
        display: &str,
    ) -> Result<usize, LoadError> {
        let resolved = resolve_import(base, path);

        if self.chain.contains(&resolved) {
            return Err(LoadError::Import {
                message: format!("Circular import detected: '{}'", resolved.display()),
            });
        }

        if let Some(index) = self
            .modules
            .iter()
            .position(|m| m.resolved_path == resolved)
        {
            return Ok(index);
        }

        let raw = std::fs::read_to_string(&resolved).map_err(|_| LoadError::Io {
            message: format!("Cannot open file '{}'", resolved.display()),
        })?;
        let source = self.ctx.str(&raw);

        let mut parser = Parser::new(self.ctx, source);
        let program = parser.parse();
        let errors = parser.into_errors();
        if !errors.is_empty() {
            return Err(LoadError::Parse {
                diagnostics: errors
                    .into_iter()
                    .map(|e| Diagnostic::new(display, e.message, e.location))
                    .collect(),
            });
        }

        self.chain.push(resolved.clone());
        let module_base = parent_dir(&resolved);
        let imports: Vec<String> = program.imports.iter().map(|i| i.path.to_string()).collect();
        let mut pending = Vec::new();
        for import_path in imports {
            let import_as_path = PathBuf::from(&import_path);
            let import_display = basename_of(&resolve_import(&module_base, &import_as_path));
            pending.push((import_as_path, import_display));
        }

        for (import_path, import_display) in pending {
            match self.load_module(&module_base, &import_path, &import_display) {
                Ok(_) => {}
                Err(err) => {
                    self.chain.pop();
                    return Err(err);
                }
            }
        }
        self.chain.pop();

        self.modules.push(LoadedModule {
            resolved_path: resolved,
            display_path: display.to_string(),
            source,
            program,
        });
        Ok(self.modules.len() - 1)
    }

    /// Concatenates every cached module's functions, in cache order, into
    /// one program carrying the entry file's imports.
    fn merge(&self) -> Program<'a> {
        let mut merged = Program::new();
        let mut next_id: u32 = 1;

        for module in &self.modules {
            let module_path = module.resolved_path.to_string_lossy().into_owned();
            for function in &module.program.functions {
                let mut record = function.clone();
                record.symbol_id = next_id;
                next_id += 1;
                record.original_name = function.name;
                record.module_path = module_path.clone();
                record.display_path = module.display_path.clone();
                record.allocated_name = None;
                merged.functions.push(record);
            }
        }

        // The entry file parses last, so it sits at the end of the cache.
        if let Some(entry) = self.modules.last() {
            merged.imports = entry.program.imports.clone();
        }

        merged
    }
}

/// Finalizes a single parsed file as a whole program, assigning symbol ids
/// and module paths the way the merge step does. Used when compiling source
/// text directly, without the loader.
pub fn finalize_single_module(program: &mut Program<'_>, path: &str) {
    let mut next_id: u32 = 1;
    for function in &mut program.functions {
        function.symbol_id = next_id;
        next_id += 1;
        function.original_name = function.name;
        function.module_path = path.to_string();
        function.display_path = path.to_string();
        function.allocated_name = None;
    }
}

/// Resolves an import path against the importing file's directory and
/// normalizes it lexically.
fn resolve_import(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    normalize(&joined)
}

/// Makes a path absolute against the current working directory, then
/// normalizes it.
fn absolutize(path: &Path) -> Result<PathBuf, String> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir()
            .map_err(|_| "Failed to get current working directory".to_string())?;
        cwd.join(path)
    };
    Ok(normalize(&joined))
}

/// Removes `.` and `..` components without touching the filesystem.
/// Symbolic links are not followed.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(Component::ParentDir);
                }
            }
            other => result.push(other),
        }
    }
    result
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn basename_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casm_language::AstArenas;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn normalize_removes_dot_components() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c/main.csm")),
            PathBuf::from("/a/c/main.csm")
        );
    }

    #[test]
    fn loads_single_file_program() {
        let dir = TempDir::new().unwrap();
        let main = write_file(&dir, "main.csm", "i32 main() { return 0; }");

        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let mut loader = ModuleLoader::new(ctx);
        let program = loader.load_program(&main).unwrap();

        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name, "main");
        assert_eq!(program.functions[0].symbol_id, 1);
    }

    #[test]
    fn imported_functions_precede_the_entry_file() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "math.csm", "i32 add(i32 a, i32 b) { return a + b; }");
        let main = write_file(
            &dir,
            "main.csm",
            "#import add from \"./math.csm\";\ni32 main() { return add(1, 2); }",
        );

        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let mut loader = ModuleLoader::new(ctx);
        let program = loader.load_program(&main).unwrap();

        let names: Vec<&str> = program.functions.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["add", "main"]);
        assert_eq!(program.imports.len(), 1);
        // Symbol ids are sequential from 1, in merge order.
        assert_eq!(program.functions[0].symbol_id, 1);
        assert_eq!(program.functions[1].symbol_id, 2);
    }

    #[test]
    fn diamond_imports_load_once() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "base.csm", "i32 base() { return 1; }");
        write_file(
            &dir,
            "left.csm",
            "#import base from \"./base.csm\";\ni32 left() { return base(); }",
        );
        write_file(
            &dir,
            "right.csm",
            "#import base from \"./base.csm\";\ni32 right() { return base(); }",
        );
        let main = write_file(
            &dir,
            "main.csm",
            "#import left from \"./left.csm\";\n#import right from \"./right.csm\";\ni32 main() { return left() + right(); }",
        );

        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let mut loader = ModuleLoader::new(ctx);
        let program = loader.load_program(&main).unwrap();

        let base_count = program.functions.iter().filter(|f| f.name == "base").count();
        assert_eq!(base_count, 1);
        assert_eq!(loader.modules().len(), 4);
    }

    #[test]
    fn three_file_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "a.csm",
            "#import b from \"./b.csm\";\ni32 a() { return 1; }",
        );
        write_file(
            &dir,
            "b.csm",
            "#import c from \"./c.csm\";\ni32 b() { return 2; }",
        );
        write_file(
            &dir,
            "c.csm",
            "#import a from \"./a.csm\";\ni32 c() { return 3; }",
        );
        let main = dir.path().join("a.csm");

        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let mut loader = ModuleLoader::new(ctx);
        let err = loader.load_program(&main).unwrap_err();
        match err {
            LoadError::Import { message } => {
                assert!(message.contains("Circular import detected"));
                assert!(message.contains("a.csm"));
            }
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn missing_import_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let main = write_file(
            &dir,
            "main.csm",
            "#import gone from \"./gone.csm\";\ni32 main() { return 0; }",
        );

        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let mut loader = ModuleLoader::new(ctx);
        let err = loader.load_program(&main).unwrap_err();
        match err {
            LoadError::Io { message } => assert!(message.contains("Cannot open file")),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn parse_errors_in_imports_carry_the_module_name() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "bad.csm", "i32 broken( { }");
        let main = write_file(
            &dir,
            "main.csm",
            "#import bad from \"./bad.csm\";\ni32 main() { return 0; }",
        );

        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let mut loader = ModuleLoader::new(ctx);
        let err = loader.load_program(&main).unwrap_err();
        match err {
            LoadError::Parse { diagnostics } => {
                assert!(!diagnostics.is_empty());
                assert_eq!(diagnostics[0].file, "bad.csm");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn finalize_single_module_assigns_ids_and_paths() {
        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let source = ctx.str("i32 one() { return 1; }\ni32 main() { return one(); }");
        let mut parser = Parser::new(ctx, source);
        let mut program = parser.parse();
        finalize_single_module(&mut program, "test.csm");

        assert_eq!(program.functions[0].symbol_id, 1);
        assert_eq!(program.functions[1].symbol_id, 2);
        assert_eq!(program.functions[0].module_path, "test.csm");
        assert_eq!(program.functions[1].display_path, "test.csm");
    }
}
