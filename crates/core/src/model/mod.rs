//! PDF model types.
//!
//! - `objects` - the PDF value type and its serialized form
//! - `stream` - stream payloads
//! - `geometry` - points and transformation matrices
//! - `color` - colour values
//! - `state` - graphics and text state tracking

pub mod color;
pub mod geometry;
pub mod objects;
pub mod state;
pub mod stream;

pub use color::Color;
pub use geometry::{Point, TransformationMatrix};
pub use objects::{Dictionary, ObjRef, PdfObject};
pub use state::{GraphicsState, GraphicsStateTracker, TextState};
pub use stream::Stream;
