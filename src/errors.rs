//! Diagnostic types shared by every stage of the pipeline
//!
//! All findings, whether lexical, syntactic or semantic, are reported as a
//! [`ParseError`]. The [`ErrorKind`] tells callers which stage produced it.
//!
//! Errors carry a context window: a short excerpt of the source around the
//! offending position followed by a caret line pointing at it.

use crate::parser::ast::SourceLocation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of characters shown either side of an error position.
pub const DEFAULT_CONTEXT_RADIUS: usize = 20;

/// Which stage of the pipeline produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unrecognised character in the source text
    Lex,
    /// Required token missing or unexpected token
    Syntax,
    /// Structurally incomplete AST node
    Semantic,
    /// Source nesting exceeded the configured limit
    NestingTooDeep,
    /// Source file could not be read
    Io,
    /// Unexpected failure caught by the declaration loop
    Internal,
}

/// A single diagnostic with its position and surrounding source excerpt.
///
/// Displays as `Error at L:C: message` followed by a `Context:` line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Error at {line}:{column}: {message}\nContext: {context}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

impl ParseError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
        context: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
            context: context.into(),
        }
    }

    pub fn at(
        kind: ErrorKind,
        message: impl Into<String>,
        location: SourceLocation,
        context: impl Into<String>,
    ) -> Self {
        Self::new(kind, message, location.line, location.column, context)
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// Build a context window around `offset`: up to `radius` characters either
/// side, then a newline and a caret under the offending character.
///
/// Line breaks and tabs inside the excerpt are flattened to spaces so the
/// caret stays aligned.
pub fn context_window(chars: &[char], offset: usize, radius: usize) -> String {
    let offset = offset.min(chars.len());
    let start = offset.saturating_sub(radius);
    let end = (offset + radius).min(chars.len());

    let excerpt: String = chars[start..end]
        .iter()
        .map(|&c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    format!("{}\n{}^", excerpt, " ".repeat(offset - start))
}

/// Source text indexed by line so that a token's line/column can be turned
/// back into a character offset for context windows.
#[derive(Debug, Clone, Default)]
pub struct SourceText {
    chars: Vec<char>,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut line_starts = vec![0];
        for (i, &c) in chars.iter().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { chars, line_starts }
    }

    /// Character offset of a 1-based line/column, clamped to the text.
    pub fn offset_of(&self, location: SourceLocation) -> usize {
        let line_index = location.line.saturating_sub(1);
        match self.line_starts.get(line_index) {
            Some(&start) => (start + location.column.saturating_sub(1)).min(self.chars.len()),
            None => self.chars.len(),
        }
    }

    pub fn context_at(&self, location: SourceLocation, radius: usize) -> String {
        context_window(&self.chars, self.offset_of(location), radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let err = ParseError::new(ErrorKind::Syntax, "Expected ';'", 3, 7, "x = 1\n     ^");
        assert_eq!(
            err.to_string(),
            "Error at 3:7: Expected ';'\nContext: x = 1\n     ^"
        );
    }

    #[test]
    fn test_context_window_caret() {
        let chars: Vec<char> = "twin A @ {}".chars().collect();
        let ctx = context_window(&chars, 7, 3);
        assert_eq!(ctx, " A @ {\n   ^");
    }

    #[test]
    fn test_context_window_flattens_newlines() {
        let chars: Vec<char> = "a\nb\tc".chars().collect();
        let ctx = context_window(&chars, 4, 20);
        assert_eq!(ctx, "a b c\n    ^");
    }

    #[test]
    fn test_source_text_offsets() {
        let text = SourceText::new("ab\ncd\nef");
        assert_eq!(text.offset_of(SourceLocation::new(1, 1)), 0);
        assert_eq!(text.offset_of(SourceLocation::new(2, 2)), 4);
        assert_eq!(text.offset_of(SourceLocation::new(3, 1)), 6);
        // Past the end clamps instead of panicking
        assert_eq!(text.offset_of(SourceLocation::new(9, 9)), 8);
    }
}
