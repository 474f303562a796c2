//! Inline images: `BI <key/value pairs> ID <bytes> EI`.

use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, PdfObject};
use crate::parser::PdfParser;
use crate::parser::cursor::{TOKEN_END, WHITESPACE};

/// Parameters and raw data of one inline image.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub params: Dictionary,
    pub data: Vec<u8>,
    /// Offset just past `EI`.
    pub end: usize,
}

/// Read an inline image whose `BI` keyword has just been consumed.
pub fn read_inline_image(parser: &mut PdfParser<'_>) -> Result<InlineImage> {
    let mut params = Dictionary::new();
    loop {
        let pos = parser.tell();
        let key = match parser.next_object()? {
            Some((_, PdfObject::Token(t), _)) if t == b"ID" => break,
            Some((_, PdfObject::Name(key), _)) => key,
            Some((start, other, _)) => {
                return Err(PdfError::syntax(
                    start,
                    format!("inline image key is a {}", other.type_name()),
                ));
            }
            None => return Err(PdfError::syntax(pos, "inline image without ID")),
        };
        let value = parser.parse_object()?;
        params.set(key, value);
    }

    let data = parser.lexer().data();
    // One whitespace byte separates ID from the image data.
    let mut start = parser.lexer().last_end();
    if data.get(start).is_some_and(|&b| WHITESPACE.contains(b)) {
        start += 1;
    }

    let declared = params
        .get_int("L")
        .or_else(|| params.get_int("Length"))
        .and_then(|n| usize::try_from(n).ok());
    let (stop, ei) = match declared.and_then(|len| after_declared(data, start, len)) {
        Some(found) => found,
        None => scan_for_ei(data, start)?,
    };
    let end = ei + 2;
    parser.seek(end);
    Ok(InlineImage {
        params,
        data: data[start..stop].to_vec(),
        end,
    })
}

/// `(data end, EI offset)` when `EI` follows the declared length.
fn after_declared(data: &[u8], start: usize, len: usize) -> Option<(usize, usize)> {
    let stop = start.checked_add(len)?;
    if stop > data.len() {
        return None;
    }
    let mut ei = stop;
    while ei < data.len() && WHITESPACE.contains(data[ei]) {
        ei += 1;
    }
    is_ei_at(data, ei).then_some((stop, ei))
}

/// Find whitespace + `EI` + (token end or end of data).
fn scan_for_ei(data: &[u8], start: usize) -> Result<(usize, usize)> {
    let mut i = start;
    while i < data.len() {
        if WHITESPACE.contains(data[i]) && is_ei_at(data, i + 1) {
            return Ok((i, i + 1));
        }
        i += 1;
    }
    Err(PdfError::syntax(start, "unterminated inline image"))
}

fn is_ei_at(data: &[u8], pos: usize) -> bool {
    data.get(pos..pos + 2) == Some(b"EI".as_slice())
        && data.get(pos + 2).is_none_or(|&b| TOKEN_END.contains(b))
}
