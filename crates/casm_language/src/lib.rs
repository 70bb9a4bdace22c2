//! # casm-language
//!
//! Front end for the casm source language: token model, lexer, type system,
//! abstract syntax tree, and parser.
//!
//! ## Pipeline position
//!
//! ```text
//! source bytes
//!       │
//!       ▼
//! ┌───────────────┐
//! │  Lexer        │ byte buffer → tokens with source locations
//! └───────┬───────┘
//!         ▼
//! ┌───────────────┐
//! │  Parser       │ tokens → per-file AST (imports + functions)
//! └───────┬───────┘
//!         ▼
//!   Program<'a>  (arena-allocated, borrowing the source buffer)
//! ```
//!
//! The crate is purely syntactic: it knows nothing about files, modules, or
//! name resolution. Multi-file loading and all later phases live in
//! `casm-compile`.
//!
//! ## Zero-copy contract
//!
//! All AST nodes and name strings are allocated through an [`AstContext`],
//! whose arenas must outlive the produced [`Program`]. Token lexemes and
//! identifier names are slices of the source buffer; the lexer never copies
//! token text.

pub mod arena_ctx;
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;
pub mod types;

pub use arena_ctx::{AstArenas, AstContext};
pub use ast::{
    module_basename, BinaryOp, Block, DbgArg, ElseIf, Expr, ExprKind, Function, Import, Param,
    Program, Stmt, StmtKind, UnaryOp,
};
pub use lexer::Lexer;
pub use parser::{ParseDiagnostic, Parser};
pub use printer::print_program;
pub use token::{LexError, Token, TokenKind};
pub use types::{binary_result_type, unary_result_type, Type, TypeNode};
