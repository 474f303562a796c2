//! Content-stream writer.

use super::operator::{OpCode, check_arity};
use crate::error::{PdfError, Result};
use crate::model::geometry::TransformationMatrix;
use crate::model::objects::{Dictionary, PdfObject, write_number, write_sequence};
use crate::model::stream::Stream;

/// Appends operators to a content stream, one per line.
///
/// ```
/// use vellum_core::content::ContentStreamBuilder;
///
/// let mut builder = ContentStreamBuilder::new();
/// builder.save().rectangle(0.0, 0.0, 10.0, 10.0).fill().restore();
/// assert_eq!(builder.finish(), b"q\n0 0 10 10 re\nf\nQ\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    buffer: Vec<u8>,
}

impl ContentStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append any operator, checking its operand count.
    pub fn push(&mut self, op: OpCode, operands: &[PdfObject]) -> Result<&mut Self> {
        let mnemonic = op.mnemonic();
        if mnemonic.is_empty() {
            return Err(PdfError::Structure(
                "unknown operators cannot be written".into(),
            ));
        }
        check_arity(op, mnemonic.as_bytes(), operands.len(), self.buffer.len())?;
        if op == OpCode::InlineImage {
            self.write_inline_image(operands)?;
        } else {
            let keyword = PdfObject::Token(mnemonic.as_bytes().to_vec());
            write_sequence(operands.iter().chain([&keyword]), &mut self.buffer)?;
            self.buffer.push(b'\n');
        }
        Ok(self)
    }

    fn write_inline_image(&mut self, operands: &[PdfObject]) -> Result<()> {
        let (PdfObject::Dict(params), PdfObject::String(data)) = (&operands[0], &operands[1])
        else {
            return Err(PdfError::TypeError {
                expected: "dictionary and string",
                got: operands[0].type_name(),
            });
        };
        self.buffer.extend_from_slice(b"BI");
        for (key, value) in params.iter() {
            let key = PdfObject::Name(key.clone());
            self.buffer.push(b' ');
            write_sequence([&key, value], &mut self.buffer)?;
        }
        self.buffer.extend_from_slice(b" ID ");
        self.buffer.extend_from_slice(data);
        self.buffer.extend_from_slice(b"\nEI\n");
        Ok(())
    }

    /// Append an operator whose operands are all numbers.
    fn numbers(&mut self, op: OpCode, values: &[f64]) -> &mut Self {
        for &value in values {
            write_number(value, &mut self.buffer);
            self.buffer.push(b' ');
        }
        self.buffer.extend_from_slice(op.mnemonic().as_bytes());
        self.buffer.push(b'\n');
        self
    }

    pub fn save(&mut self) -> &mut Self {
        self.numbers(OpCode::Save, &[])
    }

    pub fn restore(&mut self) -> &mut Self {
        self.numbers(OpCode::Restore, &[])
    }

    pub fn transform(&mut self, m: &TransformationMatrix) -> &mut Self {
        self.numbers(OpCode::Transform, &m.to_array())
    }

    pub fn line_width(&mut self, width: f64) -> &mut Self {
        self.numbers(OpCode::LineWidth, &[width])
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.numbers(OpCode::MoveTo, &[x, y])
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.numbers(OpCode::LineTo, &[x, y])
    }

    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        self.numbers(OpCode::CurveTo, &[x1, y1, x2, y2, x3, y3])
    }

    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.numbers(OpCode::Rectangle, &[x, y, width, height])
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.numbers(OpCode::ClosePath, &[])
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.numbers(OpCode::Stroke, &[])
    }

    pub fn fill(&mut self) -> &mut Self {
        self.numbers(OpCode::Fill, &[])
    }

    pub fn end_path(&mut self) -> &mut Self {
        self.numbers(OpCode::EndPath, &[])
    }

    pub fn begin_text(&mut self) -> &mut Self {
        self.numbers(OpCode::BeginText, &[])
    }

    pub fn end_text(&mut self) -> &mut Self {
        self.numbers(OpCode::EndText, &[])
    }

    pub fn text_move(&mut self, tx: f64, ty: f64) -> &mut Self {
        self.numbers(OpCode::TextMove, &[tx, ty])
    }

    pub fn fill_rgb(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.numbers(OpCode::FillRgb, &[r, g, b])
    }

    pub fn stroke_rgb(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.numbers(OpCode::StrokeRgb, &[r, g, b])
    }

    pub fn fill_gray(&mut self, gray: f64) -> &mut Self {
        self.numbers(OpCode::FillGray, &[gray])
    }

    pub fn stroke_gray(&mut self, gray: f64) -> &mut Self {
        self.numbers(OpCode::StrokeGray, &[gray])
    }

    pub fn font(&mut self, name: &str, size: f64) -> Result<&mut Self> {
        self.push(OpCode::Font, &[PdfObject::name(name), PdfObject::number(size)])
    }

    pub fn show_text(&mut self, text: &[u8]) -> Result<&mut Self> {
        self.push(OpCode::ShowText, &[PdfObject::string(text)])
    }

    pub fn draw_xobject(&mut self, name: &str) -> Result<&mut Self> {
        self.push(OpCode::XObject, &[PdfObject::name(name)])
    }

    pub fn finish(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// Wrap the operators in a stream, FlateDecode-compressed if asked.
    pub fn into_stream(self, compress: bool) -> Stream {
        let mut dict = Dictionary::new();
        if compress {
            dict.set("Filter", PdfObject::name("FlateDecode"));
        }
        Stream::from_decoded(dict, self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentStreamAnalyzer;

    #[test]
    fn test_generic_push_checks_arity() {
        let mut builder = ContentStreamBuilder::new();
        assert!(builder.push(OpCode::MoveTo, &[PdfObject::Int(1)]).is_err());
        assert!(builder.push(OpCode::Unknown, &[]).is_err());
        builder
            .push(OpCode::MoveTo, &[PdfObject::Int(1), PdfObject::Real(2.5)])
            .unwrap();
        assert_eq!(builder.finish(), b"1 2.5 m\n");
    }

    #[test]
    fn test_numeric_operators() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .save()
            .line_width(0.5)
            .transform(&TransformationMatrix::translation(-3.0, 1.25))
            .restore();
        assert_eq!(builder.finish(), b"q\n0.5 w\n1 0 0 1 -3 1.25 cm\nQ\n");
    }

    #[test]
    fn test_text_and_names() {
        let mut builder = ContentStreamBuilder::new();
        builder.begin_text();
        builder.font("F1", 12.0).unwrap().text_move(72.0, 700.0);
        builder.show_text(b"Hi (there)").unwrap();
        builder.end_text();
        assert_eq!(
            builder.finish(),
            b"BT\n/F1 12 Tf\n72 700 Td\n(Hi \\(there\\))Tj\nET\n"
        );
    }

    #[test]
    fn test_output_reanalyzes() {
        let mut builder = ContentStreamBuilder::new();
        builder
            .save()
            .transform(&TransformationMatrix::translation(10.0, 20.0))
            .fill_rgb(1.0, 0.0, 0.0)
            .rectangle(0.0, 0.0, 5.0, 5.0)
            .fill()
            .restore();
        let mut params = Dictionary::new();
        params.set("W", 1i64);
        builder
            .push(
                OpCode::InlineImage,
                &[PdfObject::Dict(params), PdfObject::string(b"\x7f".to_vec())],
            )
            .unwrap();
        let analyzer = ContentStreamAnalyzer::new(builder.finish()).unwrap();
        assert_eq!(analyzer.len(), 7);
        assert_eq!(analyzer.operators()[4].state.ctm().e, 10.0);
        assert_eq!(analyzer.image_indices(), &[6]);
    }
}
