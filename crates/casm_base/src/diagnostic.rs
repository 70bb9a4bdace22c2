//! Compile diagnostics with source location tracking.
//!
//! All user-visible errors in the compiler are collected as [`Diagnostic`]
//! records rather than aborting at the first problem: the parser keeps going
//! after each error so one run reports as many problems as it can, and the
//! semantic analyzer does the same per function body.
//!
//! The rendered form is always one line per diagnostic:
//!
//! ```text
//! <file>:<line>:<column>: <message>
//! ```
//!
//! [`DiagnosticList::render`] groups diagnostics by source file, preserving
//! insertion order within each file.

use crate::location::SourceLocation;
use std::fmt;

/// A single compile error annotated with its source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Display path of the file the error occurred in.
    pub file: String,
    /// Human-readable error description.
    pub message: String,
    /// Location in source where the error occurred.
    pub location: SourceLocation,
}

impl Diagnostic {
    /// Creates a diagnostic for the given file, message, and location.
    pub fn new(file: impl Into<String>, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.location.line, self.location.column, self.message
        )
    }
}

/// An ordered collection of diagnostics.
///
/// Phases push into the list as they find problems; the driver renders the
/// whole list at the end of the run.
#[derive(Debug, Default)]
pub struct DiagnosticList {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn add(&mut self, file: impl Into<String>, message: impl Into<String>, location: SourceLocation) {
        self.diagnostics.push(Diagnostic::new(file, message, location));
    }

    /// Records an already-built diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Number of diagnostics recorded so far.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The recorded diagnostics, in insertion order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Moves all diagnostics out of the list.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Renders every diagnostic, grouped by source file.
    ///
    /// Files appear in the order they were first mentioned; within a file,
    /// diagnostics keep insertion order. One diagnostic per line.
    pub fn render(&self) -> String {
        let mut files: Vec<&str> = Vec::new();
        for diag in &self.diagnostics {
            if !files.contains(&diag.file.as_str()) {
                files.push(&diag.file);
            }
        }

        let mut out = String::new();
        for file in files {
            for diag in self.diagnostics.iter().filter(|d| d.file == file) {
                out.push_str(&diag.to_string());
                out.push('\n');
            }
        }
        out
    }
}
