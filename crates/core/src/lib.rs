//! vellum - parse, edit and rewrite PDF files at the object level.
//!
//! [`PdfFile`] loads a file's cross-reference sections and resolves objects
//! lazily; edits are made through `&mut` access and the whole file is written
//! back with [`PdfFile::save`]. Content streams are decoded into operators
//! with graphics-state snapshots by [`ContentStreamAnalyzer`].

pub mod codec;
pub mod content;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

pub use content::{ContentStreamAnalyzer, ContentStreamBuilder, OpCode, Operator};
pub use document::{IndirectObject, PdfFile, PdfVersion, SaveOptions, Trailer};
pub use error::{PdfError, Result};
pub use model::{Dictionary, ObjRef, PdfObject, Stream};
