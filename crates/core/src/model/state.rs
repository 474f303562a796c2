//! Graphics and text state tracking for content streams.

use super::color::Color;
use super::geometry::{Point, TransformationMatrix};
use crate::content::operator::OpCode;
use crate::error::{PdfError, Result};
use crate::model::objects::PdfObject;

/// Graphics-state collaborator driven by the content-stream analyzer.
pub trait GraphicsStateTracker: Clone + Default + PartialEq + std::fmt::Debug {
    fn current_point(&self) -> Option<Point>;

    /// Apply the effect of one operator.
    fn react(&mut self, op: OpCode, operands: &[PdfObject]) -> Result<()>;
}

/// Text state parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub horizontal_scaling: f64,
    pub leading: f64,
    pub font: Option<String>,
    pub font_size: f64,
    pub render_mode: i64,
    pub rise: f64,
    pub matrix: TransformationMatrix,
    pub line_matrix: TransformationMatrix,
    pub in_text_object: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font: None,
            font_size: 0.0,
            render_mode: 0,
            rise: 0.0,
            matrix: TransformationMatrix::IDENTITY,
            line_matrix: TransformationMatrix::IDENTITY,
            in_text_object: false,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = self.line_matrix.pre_translate(tx, ty);
        self.matrix = self.line_matrix;
    }
}

/// Parameters saved by `q` and restored by `Q`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsParams {
    pub ctm: TransformationMatrix,
    pub line_width: f64,
    pub line_cap: i64,
    pub line_join: i64,
    pub miter_limit: f64,
    pub dash_array: Vec<f64>,
    pub dash_phase: f64,
    pub rendering_intent: String,
    pub flatness: f64,
    /// Name of the last `gs` resource applied.
    pub ext_gstate: Option<String>,
    pub stroke_color_space: String,
    pub fill_color_space: String,
    pub stroke_color: Color,
    pub fill_color: Color,
    pub text: TextState,
    pub current_point: Option<Point>,
    pub subpath_start: Option<Point>,
}

impl Default for GraphicsParams {
    fn default() -> Self {
        Self {
            ctm: TransformationMatrix::IDENTITY,
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash_array: Vec::new(),
            dash_phase: 0.0,
            rendering_intent: "RelativeColorimetric".to_string(),
            flatness: 1.0,
            ext_gstate: None,
            stroke_color_space: "DeviceGray".to_string(),
            fill_color_space: "DeviceGray".to_string(),
            stroke_color: Color::default(),
            fill_color: Color::default(),
            text: TextState::default(),
            current_point: None,
            subpath_start: None,
        }
    }
}

/// Default tracker: current parameters plus the `q`/`Q` stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsState {
    pub params: GraphicsParams,
    stack: Vec<GraphicsParams>,
}

fn num(operands: &[PdfObject], i: usize) -> Result<f64> {
    operands
        .get(i)
        .ok_or_else(|| PdfError::Structure(format!("missing operand {i}")))?
        .as_num()
}

fn int(operands: &[PdfObject], i: usize) -> Result<i64> {
    Ok(num(operands, i)? as i64)
}

fn name(operands: &[PdfObject], i: usize) -> Result<String> {
    operands
        .get(i)
        .ok_or_else(|| PdfError::Structure(format!("missing operand {i}")))?
        .as_name()
        .map(str::to_string)
}

fn point(operands: &[PdfObject], i: usize) -> Result<Point> {
    Ok(Point::new(num(operands, i)?, num(operands, i + 1)?))
}

fn matrix(operands: &[PdfObject]) -> Result<TransformationMatrix> {
    let mut values = [0.0; 6];
    for (i, v) in values.iter_mut().enumerate() {
        *v = num(operands, i)?;
    }
    Ok(TransformationMatrix::from_array(values))
}

fn numbers(operands: &[PdfObject]) -> Result<Vec<f64>> {
    operands.iter().map(PdfObject::as_num).collect()
}

/// Colour from `SC`/`SCN` style operands; a trailing name selects a pattern.
fn color_operands(operands: &[PdfObject]) -> Result<Color> {
    match operands.split_last() {
        Some((PdfObject::Name(pattern), tint)) => Ok(Color::Pattern(pattern.clone(), numbers(tint)?)),
        _ => Ok(Color::from_components(&numbers(operands)?)),
    }
}

impl GraphicsState {
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn ctm(&self) -> TransformationMatrix {
        self.params.ctm
    }

    fn end_path(&mut self) {
        self.params.current_point = None;
        self.params.subpath_start = None;
    }
}

impl GraphicsStateTracker for GraphicsState {
    fn current_point(&self) -> Option<Point> {
        self.params.current_point
    }

    fn react(&mut self, op: OpCode, operands: &[PdfObject]) -> Result<()> {
        use OpCode::*;
        let p = &mut self.params;
        match op {
            LineWidth => p.line_width = num(operands, 0)?,
            LineCap => p.line_cap = int(operands, 0)?,
            LineJoin => p.line_join = int(operands, 0)?,
            MiterLimit => p.miter_limit = num(operands, 0)?,
            Dash => {
                let array = operands
                    .first()
                    .ok_or_else(|| PdfError::Structure("missing dash array".into()))?;
                p.dash_array = numbers(array.as_array()?)?;
                p.dash_phase = num(operands, 1)?;
            }
            RenderingIntent => p.rendering_intent = name(operands, 0)?,
            Flatness => p.flatness = num(operands, 0)?,
            ExtGState => p.ext_gstate = Some(name(operands, 0)?),
            Save => self.stack.push(self.params.clone()),
            Restore => {
                self.params = self
                    .stack
                    .pop()
                    .ok_or_else(|| PdfError::Structure("'Q' without matching 'q'".into()))?;
            }
            Transform => p.ctm = matrix(operands)?.multiply(&p.ctm),
            MoveTo | Rectangle => {
                let pt = point(operands, 0)?;
                p.current_point = Some(pt);
                p.subpath_start = Some(pt);
            }
            LineTo => p.current_point = Some(point(operands, 0)?),
            CurveTo => p.current_point = Some(point(operands, 4)?),
            CurveToV | CurveToY => p.current_point = Some(point(operands, 2)?),
            ClosePath => p.current_point = p.subpath_start,
            Stroke | CloseStroke | Fill | FillCompat | FillEvenOdd | FillStroke
            | FillStrokeEvenOdd | CloseFillStroke | CloseFillStrokeEvenOdd | EndPath => {
                self.end_path()
            }
            Clip | ClipEvenOdd => {}
            BeginText => {
                p.text.in_text_object = true;
                p.text.matrix = TransformationMatrix::IDENTITY;
                p.text.line_matrix = TransformationMatrix::IDENTITY;
            }
            EndText => p.text.in_text_object = false,
            CharSpacing => p.text.char_spacing = num(operands, 0)?,
            WordSpacing => p.text.word_spacing = num(operands, 0)?,
            HorizontalScaling => p.text.horizontal_scaling = num(operands, 0)?,
            Leading => p.text.leading = num(operands, 0)?,
            Font => {
                p.text.font = Some(name(operands, 0)?);
                p.text.font_size = num(operands, 1)?;
            }
            RenderMode => p.text.render_mode = int(operands, 0)?,
            Rise => p.text.rise = num(operands, 0)?,
            TextMove => {
                let pt = point(operands, 0)?;
                p.text.move_line(pt.x, pt.y);
            }
            TextMoveLeading => {
                let pt = point(operands, 0)?;
                p.text.leading = -pt.y;
                p.text.move_line(pt.x, pt.y);
            }
            TextMatrix => {
                let m = matrix(operands)?;
                p.text.matrix = m;
                p.text.line_matrix = m;
            }
            NextLine | NextLineShowText => {
                let leading = p.text.leading;
                p.text.move_line(0.0, -leading);
            }
            NextLineSpacingShowText => {
                p.text.word_spacing = num(operands, 0)?;
                p.text.char_spacing = num(operands, 1)?;
                let leading = p.text.leading;
                p.text.move_line(0.0, -leading);
            }
            StrokeColorSpace => {
                let space = name(operands, 0)?;
                p.stroke_color = Color::initial(&space);
                p.stroke_color_space = space;
            }
            FillColorSpace => {
                let space = name(operands, 0)?;
                p.fill_color = Color::initial(&space);
                p.fill_color_space = space;
            }
            StrokeColor | StrokeColorN => p.stroke_color = color_operands(operands)?,
            FillColor | FillColorN => p.fill_color = color_operands(operands)?,
            StrokeGray | StrokeRgb | StrokeCmyk => {
                p.stroke_color_space = device_space(op).to_string();
                p.stroke_color = Color::from_components(&numbers(operands)?);
            }
            FillGray | FillRgb | FillCmyk => {
                p.fill_color_space = device_space(op).to_string();
                p.fill_color = Color::from_components(&numbers(operands)?);
            }
            ShowText | ShowTextArray | GlyphWidth | GlyphWidthBBox | Shade | InlineImage
            | XObject | MarkPoint | MarkPointProps | BeginMarked | BeginMarkedProps
            | EndMarked | BeginCompat | EndCompat | Unknown => {}
        }
        Ok(())
    }
}

fn device_space(op: OpCode) -> &'static str {
    match op {
        OpCode::StrokeGray | OpCode::FillGray => "DeviceGray",
        OpCode::StrokeRgb | OpCode::FillRgb => "DeviceRGB",
        _ => "DeviceCMYK",
    }
}
