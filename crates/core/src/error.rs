//! Error types for vellum PDF processing.

use thiserror::Error;

/// Primary error type for parsing, editing and writing PDF files.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Bytes do not match the PDF grammar.
    #[error("syntax error at position {pos}: {msg}")]
    Syntax { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Encryption, unknown filters or predictors, unsupported versions.
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// Well-formed syntax that violates a structural rule of the file.
    #[error("structural inconsistency: {0}")]
    Structure(String),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    pub fn syntax(pos: usize, msg: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            msg: msg.into(),
        }
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
