//! Core types for the TOON library

/// A table read from TOON text: an optional header line followed by rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// The header line as written, if one was located
    pub header: Option<String>,
    /// Whether the header was matched by its column words or taken from line 0
    pub header_matched: bool,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One data row, with its fields already split and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number within the source text
    pub line_number: usize,
    pub fields: Vec<String>,
}

impl Row {
    /// Field at `index`, or `None` when the row is shorter.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// Result type alias for TOON operations
pub type ToonResult<T> = Result<T, ToonError>;

/// Errors that can occur during TOON encoding/decoding
#[derive(Debug, thiserror::Error)]
pub enum ToonError {
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("Column count mismatch: expected {expected}, got {actual}")]
    ColumnMismatch { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ToonError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        ToonError::SyntaxError {
            line,
            message: message.into(),
        }
    }
}
