//! Byte-level parsing.
//!
//! - `cursor`: byte cursor and byte classes
//! - `lexer`: tokenizer with pushback
//! - `pdf_parser`: object parser

pub mod cursor;
pub mod lexer;
pub mod pdf_parser;

pub use cursor::{ByteCursor, ByteMask};
pub use lexer::{Lexer, Token};
pub use pdf_parser::PdfParser;
