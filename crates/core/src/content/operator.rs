//! Content-stream operators.
//!
//! Mnemonics map to [`OpCode`] through a static dispatch table that also
//! records how many operands each operator takes.

use crate::error::{PdfError, Result};
use crate::model::objects::PdfObject;
use crate::model::state::GraphicsState;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

/// Operand list; most operators take six or fewer.
pub type Operands = SmallVec<[PdfObject; 6]>;

/// Content-stream operator codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // General graphics state
    LineWidth,
    LineCap,
    LineJoin,
    MiterLimit,
    Dash,
    RenderingIntent,
    Flatness,
    ExtGState,
    Save,
    Restore,
    Transform,
    // Path construction
    MoveTo,
    LineTo,
    CurveTo,
    CurveToV,
    CurveToY,
    ClosePath,
    Rectangle,
    // Path painting
    Stroke,
    CloseStroke,
    Fill,
    FillCompat,
    FillEvenOdd,
    FillStroke,
    FillStrokeEvenOdd,
    CloseFillStroke,
    CloseFillStrokeEvenOdd,
    EndPath,
    // Clipping
    Clip,
    ClipEvenOdd,
    // Text objects
    BeginText,
    EndText,
    // Text state
    CharSpacing,
    WordSpacing,
    HorizontalScaling,
    Leading,
    Font,
    RenderMode,
    Rise,
    // Text positioning
    TextMove,
    TextMoveLeading,
    TextMatrix,
    NextLine,
    // Text showing
    ShowText,
    ShowTextArray,
    NextLineShowText,
    NextLineSpacingShowText,
    // Type 3 fonts
    GlyphWidth,
    GlyphWidthBBox,
    // Colour
    StrokeColorSpace,
    FillColorSpace,
    StrokeColor,
    StrokeColorN,
    FillColor,
    FillColorN,
    StrokeGray,
    FillGray,
    StrokeRgb,
    FillRgb,
    StrokeCmyk,
    FillCmyk,
    // Shading, images, XObjects
    Shade,
    InlineImage,
    XObject,
    // Marked content
    MarkPoint,
    MarkPointProps,
    BeginMarked,
    BeginMarkedProps,
    EndMarked,
    // Compatibility
    BeginCompat,
    EndCompat,
    /// Mnemonic not in the table; the raw keyword is kept on the operator.
    Unknown,
}

/// Operand count an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Takes every pending operand.
    Variadic,
}

use Arity::{Fixed, Variadic};

/// Ordered like the `OpCode` variants.
const OPERATORS: &[(&str, OpCode, Arity)] = &[
    ("w", OpCode::LineWidth, Fixed(1)),
    ("J", OpCode::LineCap, Fixed(1)),
    ("j", OpCode::LineJoin, Fixed(1)),
    ("M", OpCode::MiterLimit, Fixed(1)),
    ("d", OpCode::Dash, Fixed(2)),
    ("ri", OpCode::RenderingIntent, Fixed(1)),
    ("i", OpCode::Flatness, Fixed(1)),
    ("gs", OpCode::ExtGState, Fixed(1)),
    ("q", OpCode::Save, Fixed(0)),
    ("Q", OpCode::Restore, Fixed(0)),
    ("cm", OpCode::Transform, Fixed(6)),
    ("m", OpCode::MoveTo, Fixed(2)),
    ("l", OpCode::LineTo, Fixed(2)),
    ("c", OpCode::CurveTo, Fixed(6)),
    ("v", OpCode::CurveToV, Fixed(4)),
    ("y", OpCode::CurveToY, Fixed(4)),
    ("h", OpCode::ClosePath, Fixed(0)),
    ("re", OpCode::Rectangle, Fixed(4)),
    ("S", OpCode::Stroke, Fixed(0)),
    ("s", OpCode::CloseStroke, Fixed(0)),
    ("f", OpCode::Fill, Fixed(0)),
    ("F", OpCode::FillCompat, Fixed(0)),
    ("f*", OpCode::FillEvenOdd, Fixed(0)),
    ("B", OpCode::FillStroke, Fixed(0)),
    ("B*", OpCode::FillStrokeEvenOdd, Fixed(0)),
    ("b", OpCode::CloseFillStroke, Fixed(0)),
    ("b*", OpCode::CloseFillStrokeEvenOdd, Fixed(0)),
    ("n", OpCode::EndPath, Fixed(0)),
    ("W", OpCode::Clip, Fixed(0)),
    ("W*", OpCode::ClipEvenOdd, Fixed(0)),
    ("BT", OpCode::BeginText, Fixed(0)),
    ("ET", OpCode::EndText, Fixed(0)),
    ("Tc", OpCode::CharSpacing, Fixed(1)),
    ("Tw", OpCode::WordSpacing, Fixed(1)),
    ("Tz", OpCode::HorizontalScaling, Fixed(1)),
    ("TL", OpCode::Leading, Fixed(1)),
    ("Tf", OpCode::Font, Fixed(2)),
    ("Tr", OpCode::RenderMode, Fixed(1)),
    ("Ts", OpCode::Rise, Fixed(1)),
    ("Td", OpCode::TextMove, Fixed(2)),
    ("TD", OpCode::TextMoveLeading, Fixed(2)),
    ("Tm", OpCode::TextMatrix, Fixed(6)),
    ("T*", OpCode::NextLine, Fixed(0)),
    ("Tj", OpCode::ShowText, Fixed(1)),
    ("TJ", OpCode::ShowTextArray, Fixed(1)),
    ("'", OpCode::NextLineShowText, Fixed(1)),
    ("\"", OpCode::NextLineSpacingShowText, Fixed(3)),
    ("d0", OpCode::GlyphWidth, Fixed(2)),
    ("d1", OpCode::GlyphWidthBBox, Fixed(6)),
    ("CS", OpCode::StrokeColorSpace, Fixed(1)),
    ("cs", OpCode::FillColorSpace, Fixed(1)),
    ("SC", OpCode::StrokeColor, Variadic),
    ("SCN", OpCode::StrokeColorN, Variadic),
    ("sc", OpCode::FillColor, Variadic),
    ("scn", OpCode::FillColorN, Variadic),
    ("G", OpCode::StrokeGray, Fixed(1)),
    ("g", OpCode::FillGray, Fixed(1)),
    ("RG", OpCode::StrokeRgb, Fixed(3)),
    ("rg", OpCode::FillRgb, Fixed(3)),
    ("K", OpCode::StrokeCmyk, Fixed(4)),
    ("k", OpCode::FillCmyk, Fixed(4)),
    ("sh", OpCode::Shade, Fixed(1)),
    ("BI", OpCode::InlineImage, Fixed(2)),
    ("Do", OpCode::XObject, Fixed(1)),
    ("MP", OpCode::MarkPoint, Fixed(1)),
    ("DP", OpCode::MarkPointProps, Fixed(2)),
    ("BMC", OpCode::BeginMarked, Fixed(1)),
    ("BDC", OpCode::BeginMarkedProps, Fixed(2)),
    ("EMC", OpCode::EndMarked, Fixed(0)),
    ("BX", OpCode::BeginCompat, Fixed(0)),
    ("EX", OpCode::EndCompat, Fixed(0)),
    ("", OpCode::Unknown, Variadic),
];

static DISPATCH: LazyLock<HashMap<&'static [u8], (OpCode, Arity)>> = LazyLock::new(|| {
    OPERATORS
        .iter()
        .filter(|(mnemonic, _, _)| !mnemonic.is_empty())
        .map(|&(mnemonic, op, arity)| (mnemonic.as_bytes(), (op, arity)))
        .collect()
});

impl OpCode {
    /// Look up a mnemonic; unrecognized keywords map to `Unknown`.
    pub fn lookup(keyword: &[u8]) -> (OpCode, Arity) {
        DISPATCH
            .get(keyword)
            .copied()
            .unwrap_or((OpCode::Unknown, Variadic))
    }

    /// Mnemonic as written in a content stream; empty for `Unknown`.
    pub fn mnemonic(self) -> &'static str {
        OPERATORS[self as usize].0
    }

    pub fn arity(self) -> Arity {
        OPERATORS[self as usize].2
    }

    pub fn is_push(self) -> bool {
        self == OpCode::Save
    }

    pub fn is_pop(self) -> bool {
        self == OpCode::Restore
    }

    pub fn is_path_paint(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            Stroke
                | CloseStroke
                | Fill
                | FillCompat
                | FillEvenOdd
                | FillStroke
                | FillStrokeEvenOdd
                | CloseFillStroke
                | CloseFillStrokeEvenOdd
        )
    }

    pub fn is_text(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            ShowText | ShowTextArray | NextLineShowText | NextLineSpacingShowText
        )
    }

    pub fn is_image(self) -> bool {
        matches!(self, OpCode::InlineImage | OpCode::XObject)
    }

    /// Puts marks on the page.
    pub fn is_paint(self) -> bool {
        self.is_path_paint() || self.is_text() || self.is_image() || self == OpCode::Shade
    }

    /// Changes the tracked graphics state.
    pub fn mutates_state(self) -> bool {
        use OpCode::*;
        match self {
            Shade | InlineImage | XObject | GlyphWidth | GlyphWidthBBox => false,
            MarkPoint | MarkPointProps | BeginMarked | BeginMarkedProps | EndMarked => false,
            BeginCompat | EndCompat | Unknown => false,
            ShowText | ShowTextArray => false,
            _ => true,
        }
    }
}

/// One decoded operator with its operands and position.
#[derive(Debug, Clone)]
pub struct Operator<S = GraphicsState> {
    pub op: OpCode,
    /// Keyword as it appeared in the stream.
    pub keyword: SmallVec<[u8; 4]>,
    pub operands: Operands,
    /// Logical identity, stable across deletions.
    pub index: usize,
    /// Byte offset of the first operand (or the keyword if none).
    pub offset: usize,
    /// Byte offset just past the keyword.
    pub end: usize,
    /// Graphics state in effect when the operator ran.
    pub state: Rc<S>,
}

impl<S> Operator<S> {
    pub fn mutates_state(&self) -> bool {
        self.op.mutates_state()
    }

    pub fn is_paint(&self) -> bool {
        self.op.is_paint()
    }

    pub fn keyword_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.keyword)
    }
}

/// Check an operand count against the operator's declared arity.
pub fn check_arity(op: OpCode, keyword: &[u8], count: usize, pos: usize) -> Result<()> {
    match op.arity() {
        Fixed(n) if n != count => Err(PdfError::Structure(format!(
            "operator '{}' at {pos} takes {n} operands, found {count}",
            String::from_utf8_lossy(keyword)
        ))),
        _ => Ok(()),
    }
}
