//! # casm-compile
//!
//! The compilation pipeline for the casm language: everything between a
//! parsed source file and emitted target text.
//!
//! ```text
//! entry path
//!     │
//!     ▼
//! ┌────────────────┐
//! │ Module loader  │ resolve imports, detect cycles, merge programs
//! └───────┬────────┘
//!         ▼
//! ┌────────────────┐
//! │ Semantics      │ two-pass analysis, resolved_type annotations
//! └───────┬────────┘
//!         ▼
//! ┌────────────────┐
//! │ Call graph     │ caller → callee edges, reachability from main
//! └───────┬────────┘
//!         ▼
//! ┌────────────────┐
//! │ Name allocator │ conflict-aware global names, call resolution
//! └───────┬────────┘
//!         ▼
//! ┌────────────────┐
//! │ Emitter        │ C source or WAT module
//! └────────────────┘
//! ```
//!
//! The top-level entry points are [`compile_file`] and [`compile_source`]
//! in the [`compile`] module.

pub mod call_graph;
pub mod codegen_c;
pub mod codegen_wat;
pub mod compile;
pub mod loader;
pub mod name_alloc;
pub mod semantics;
pub mod symtab;

pub use call_graph::CallGraph;
pub use codegen_c::emit_c;
pub use codegen_wat::{emit_wat, EmitError};
pub use compile::{compile_file, compile_source, CompileError, Target};
pub use loader::{LoadError, ModuleLoader};
pub use name_alloc::allocate_names;
pub use semantics::analyze_program;
pub use symtab::{FunctionTable, ScopeStack};
