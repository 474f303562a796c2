//! Content streams: operator decoding, state snapshots, safe deletion and
//! writing.

pub mod analyzer;
pub mod builder;
pub mod inline_image;
pub mod operator;

pub use analyzer::{ContentStreamAnalyzer, expand_range};
pub use builder::ContentStreamBuilder;
pub use inline_image::InlineImage;
pub use operator::{Arity, OpCode, Operands, Operator};
