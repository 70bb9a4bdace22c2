//! Source location tracking for error reporting.
//!
//! A [`SourceLocation`] identifies a single point in a source file by line,
//! column, and byte offset. Every token, statement, and expression in the
//! compiler carries a location, and every phase preserves it unchanged, so
//! diagnostics and debug output can always point back at the exact place in
//! the file the user wrote.
//!
//! # Coordinates
//!
//! - `line` is 1-based: the first line of a file is line 1.
//! - `column` is 0-based: the byte offset from the start of the current line.
//! - `offset` is the absolute byte offset into the source buffer.
//!
//! Offsets are byte positions, not character indices. This matches Rust's
//! string slicing semantics: `&source[loc.offset..]` is the text starting at
//! the location.

use std::fmt;

/// A point in a source file.
///
/// Locations are `Copy` and cheap to pass around. The default location is
/// line 1, column 0, offset 0: the start of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 0-based byte offset from the start of the current line.
    pub column: u32,
    /// Absolute byte offset into the source buffer.
    pub offset: usize,
}

impl SourceLocation {
    /// Creates a location from explicit coordinates.
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// The start of a file: line 1, column 0, offset 0.
    pub fn start() -> Self {
        Self { line: 1, column: 0, offset: 0 }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stores_coordinates() {
        let loc = SourceLocation::new(3, 7, 42);
        assert_eq!(loc.line, 3);
        assert_eq!(loc.column, 7);
        assert_eq!(loc.offset, 42);
    }

    #[test]
    fn default_is_file_start() {
        let loc = SourceLocation::default();
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 0);
        assert_eq!(loc.offset, 0);
    }

    #[test]
    fn display_is_line_colon_column() {
        let loc = SourceLocation::new(12, 4, 200);
        assert_eq!(loc.to_string(), "12:4");
    }
}
