//! # casm-base
//!
//! Pure structural atoms for the casm compiler.
//!
//! This crate provides the foundational types used throughout the compiler:
//!
//! - [`Arena`]/[`StrArena`] — Bump allocation for stable AST references and
//!   borrowed string data
//! - [`SourceLocation`] — Line/column/offset tracking for every token and node
//! - [`Diagnostic`]/[`DiagnosticList`] — Collected compile errors with
//!   per-file grouping
//!
//! # Design Principles
//!
//! This crate has **no knowledge of the source language or I/O**. It provides
//! only generic, reusable infrastructure that higher-level crates build upon.

pub mod arena;
pub mod diagnostic;
pub mod location;

pub use arena::{Arena, StrArena};
pub use diagnostic::{Diagnostic, DiagnosticList};
pub use location::SourceLocation;
