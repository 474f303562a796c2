//! PDF file structure: cross-reference tables, trailers, indirect objects
//! and object streams.
//!
//! - `file` - load and lazily resolve a file (PdfFile)
//! - `writer` - serialize a PdfFile with or without object streams
//! - `xref` - merged cross-reference table and its entries
//! - `trailer` - typed trailer dictionary
//! - `indirect` - `N G obj ... endobj` parsing and writing
//! - `object_stream` - `/Type /ObjStm` unpacking and packing

pub mod file;
pub mod indirect;
pub mod object_stream;
pub mod trailer;
pub mod writer;
pub mod xref;

pub use file::{PdfFile, PdfVersion};
pub use indirect::IndirectObject;
pub use trailer::Trailer;
pub use writer::SaveOptions;
pub use xref::{Location, XrefEntry, XrefTable};
