//! Expression tree definitions for kgsym
//!
//! Source locations are kept for parser errors. Expressions themselves are
//! location-free so that structurally equal trees compare equal.

mod display;
mod eval;
mod expr;
mod number;

pub use expr::{Expr, Symbol};
pub use number::Number;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Line and column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Convert byte span to line/column positions
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(pos + 1);
            }
        }
        Self { line_starts }
    }

    #[must_use]
    pub fn position(&self, byte_offset: usize) -> Position {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(line) => Position::new(line + 1, 1),
            Err(line) => {
                let line_start = self.line_starts[line - 1];
                Position::new(line, byte_offset - line_start + 1)
            }
        }
    }
}

/// Errors raised while parsing, resolving or evaluating expressions
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KgError {
    #[error("kgsym:{filename}:{line}:{column}: ERR_SYNTAX: {message}")]
    Syntax {
        message: String,
        span: Span,
        filename: String,
        line: usize,
        column: usize,
    },

    #[error("ERR_UNRESOLVED_SYMBOL: {name} matches no candidate item")]
    UnresolvedSymbol { name: String },

    #[error("ERR_AMBIGUOUS_SYMBOL: {name} matches {} candidate items: {}", candidates.len(), candidates.join(", "))]
    AmbiguousSymbol {
        name: String,
        candidates: Vec<String>,
    },

    #[error("ERR_NOT_CALLABLE: {expr} is not callable")]
    NotCallable { expr: String },

    #[error("ERR_ARITY: {func} expects {expected} argument(s), got {actual}")]
    Arity {
        func: String,
        expected: usize,
        actual: usize,
    },

    #[error("ERR_UNBOUND: {name} has no value")]
    Unbound { name: String },

    #[error("ERR_EVAL: {message}")]
    Evaluation { message: String },
}

impl KgError {
    #[must_use]
    pub fn syntax(message: String, span: Span, source_map: &SourceMap, filename: &str) -> Self {
        let pos = source_map.position(span.start);
        Self::Syntax {
            message,
            span,
            filename: filename.to_string(),
            line: pos.line,
            column: pos.column,
        }
    }

    /// Location of syntax errors
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } => Some(*span),
            _ => None,
        }
    }
}
