//! Indirect objects: `N G obj ... endobj`.

use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, ObjRef, PdfObject};
use crate::model::stream::Stream;
use crate::parser::PdfParser;
use crate::parser::cursor::{ByteCursor, WHITESPACE};
use bytes::Bytes;
use tracing::warn;

/// Looks up an indirect object while another object is being parsed.
pub type Lookup<'a> = dyn Fn(ObjRef) -> Result<Option<PdfObject>> + 'a;

#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub number: u32,
    pub generation: u16,
    pub value: PdfObject,
}

impl IndirectObject {
    pub fn new(number: u32, generation: u16, value: PdfObject) -> Self {
        Self {
            number,
            generation,
            value,
        }
    }

    pub fn reference(&self) -> ObjRef {
        ObjRef::new(self.number, self.generation)
    }

    /// Parse the indirect object at `offset` of the file buffer.
    ///
    /// An indirect `/Length` is resolved through `lookup`; when it cannot be
    /// used, the payload ends at the `endstream` keyword. Indirect `Filter`
    /// and `DecodeParms` values are inlined.
    pub fn parse(data: &Bytes, offset: usize, lookup: &Lookup<'_>) -> Result<Self> {
        if offset >= data.len() {
            return Err(PdfError::syntax(offset, "object offset past end of file"));
        }
        let mut parser = PdfParser::at(data, offset);
        let number = u32::try_from(parser.expect_unsigned()?)
            .map_err(|_| PdfError::syntax(offset, "object number out of range"))?;
        let generation = u16::try_from(parser.expect_unsigned()?)
            .map_err(|_| PdfError::syntax(offset, "generation number out of range"))?;
        parser.expect_keyword(b"obj")?;
        let value = parser.parse_object()?;

        let token = parser.next_token();
        let value = if token.is(b"stream") {
            let PdfObject::Dict(mut dict) = value else {
                return Err(PdfError::syntax(token.pos, "stream without dictionary"));
            };
            let start = parser.skip_stream_eol()?;
            let declared = declared_length(&dict, lookup)?;
            let (payload_end, resume) = locate_payload(data, start, declared, number)?;
            inline_filter_params(&mut dict, lookup)?;
            parser.seek(resume);
            expect_endobj(&mut parser, number);
            PdfObject::Stream(Box::new(Stream::from_file(
                dict,
                data.slice(start..payload_end),
            )))
        } else {
            if !token.is(b"endobj") {
                warn!(number, pos = token.pos, "missing endobj");
            }
            value
        };
        Ok(Self::new(number, generation, value))
    }

    /// Write `N G obj`, the value and `endobj`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(format!("{} {} obj\n", self.number, self.generation).as_bytes());
        self.value.write_to(out)?;
        out.extend_from_slice(b"\nendobj\n");
        Ok(())
    }
}

fn expect_endobj(parser: &mut PdfParser<'_>, number: u32) {
    let token = parser.next_token();
    if !token.is(b"endobj") {
        warn!(number, pos = token.pos, "missing endobj after stream");
    }
}

fn declared_length(dict: &Dictionary, lookup: &Lookup<'_>) -> Result<Option<usize>> {
    let length = match dict.get("Length") {
        Some(PdfObject::Int(n)) => Some(*n),
        Some(PdfObject::Ref(r)) => match lookup(*r)? {
            Some(PdfObject::Int(n)) => Some(n),
            _ => None,
        },
        _ => None,
    };
    Ok(length.and_then(|n| usize::try_from(n).ok()))
}

/// End of the payload and the position after `endstream`.
fn locate_payload(
    data: &[u8],
    start: usize,
    declared: Option<usize>,
    number: u32,
) -> Result<(usize, usize)> {
    if let Some(len) = declared
        && let Some(end) = start.checked_add(len)
        && end <= data.len()
    {
        let mut cursor = ByteCursor::at(data, end);
        cursor.skip_while(WHITESPACE, None);
        if cursor.remaining().starts_with(b"endstream") {
            return Ok((end, cursor.pos() + b"endstream".len()));
        }
    }
    warn!(number, ?declared, "stream /Length unusable, scanning for endstream");
    let cursor = ByteCursor::at(data, start);
    let keyword = cursor
        .find(b"endstream")
        .ok_or_else(|| PdfError::syntax(start, "unterminated stream"))?;
    let mut end = keyword;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    Ok((end, keyword + b"endstream".len()))
}

fn inline_filter_params(dict: &mut Dictionary, lookup: &Lookup<'_>) -> Result<()> {
    for key in ["Filter", "DecodeParms"] {
        let Some(value) = dict.get_mut(key) else {
            continue;
        };
        if let PdfObject::Ref(r) = value {
            *value = lookup(*r)?.unwrap_or(PdfObject::Null);
        }
        if let PdfObject::Array(items) = value {
            for item in items.iter_mut() {
                if let PdfObject::Ref(r) = item {
                    *item = lookup(*r)?.unwrap_or(PdfObject::Null);
                }
            }
        }
        if dict.get(key).is_some_and(PdfObject::is_null) {
            dict.remove(key);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_lookup(_: ObjRef) -> Result<Option<PdfObject>> {
        Ok(None)
    }

    #[test]
    fn test_parse_plain_object() {
        let data = Bytes::from_static(b"xx 4 0 obj\n<</Type/Catalog>>\nendobj\n");
        let obj = IndirectObject::parse(&data, 3, &no_lookup).unwrap();
        assert_eq!(obj.reference(), ObjRef::new(4, 0));
        assert!(obj.value.as_dict().unwrap().is_type("Catalog"));
    }

    #[test]
    fn test_stream_with_indirect_length() {
        let data = Bytes::from_static(b"1 0 obj<</Length 2 0 R>>stream\r\nabcde\nendstream endobj");
        let lookup = |r: ObjRef| -> Result<Option<PdfObject>> {
            assert_eq!(r, ObjRef::new(2, 0));
            Ok(Some(PdfObject::Int(5)))
        };
        let obj = IndirectObject::parse(&data, 0, &lookup).unwrap();
        let stream = obj.value.as_stream().unwrap();
        assert_eq!(stream.encoded_data().unwrap().as_ref(), b"abcde");
    }

    #[test]
    fn test_stream_length_fallback() {
        let data = Bytes::from_static(b"1 0 obj<</Length 99>>stream\nabc\r\nendstream\nendobj");
        let obj = IndirectObject::parse(&data, 0, &no_lookup).unwrap();
        let stream = obj.value.as_stream().unwrap();
        assert_eq!(stream.encoded_data().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn test_write_round_trip() {
        let obj = IndirectObject::new(3, 1, PdfObject::Array(vec![PdfObject::Int(1)]));
        let mut out = Vec::new();
        obj.write_to(&mut out).unwrap();
        assert_eq!(out, b"3 1 obj\n[1]\nendobj\n");
        let parsed = IndirectObject::parse(&Bytes::from(out), 0, &no_lookup).unwrap();
        assert_eq!(parsed, obj);
    }
}
