//! Integration test suite for the casm compiler.
//!
//! This crate exists only to run integration tests from the `tests/`
//! directory. All actual test code lives in `tests/*.rs` files.
//!
//! # Test Organization
//!
//! | File | Topic |
//! |------|-------|
//! | `e2e_codegen_c` | C back end scenarios |
//! | `e2e_codegen_wat` | WAT back end scenarios |
//! | `e2e_modules` | Multi-file loading, conflicts, dead code |
//! | `e2e_diagnostics` | Error reporting across all phases |
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p casm-tests
//! ```
