//! Object streams (`/Type /ObjStm`).

use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, ObjRef, PdfObject};
use crate::model::stream::Stream;
use crate::parser::PdfParser;

/// Objects unpacked from one object stream.
#[derive(Debug)]
pub struct UnpackedObjects {
    /// `(object number, value)` in stream order.
    pub objects: Vec<(u32, PdfObject)>,
    pub extends: Option<ObjRef>,
}

/// Parse the objects of a decoded object stream.
pub fn unpack(dict: &Dictionary, decoded: &[u8]) -> Result<UnpackedObjects> {
    let count = dict
        .get_int("N")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| PdfError::Structure("object stream without /N".into()))?;
    let first = dict
        .get_int("First")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| PdfError::Structure("object stream without /First".into()))?;

    let mut header = PdfParser::new(decoded);
    // Each header pair takes at least four bytes.
    let capacity = count.min(decoded.len() / 4);
    let mut pairs = Vec::with_capacity(capacity);
    for _ in 0..count {
        let number = header.expect_unsigned()?;
        let offset = header.expect_unsigned()?;
        let number = u32::try_from(number)
            .map_err(|_| PdfError::Structure("object number out of range".into()))?;
        let offset = usize::try_from(offset)
            .ok()
            .and_then(|offset| first.checked_add(offset))
            .ok_or_else(|| {
                PdfError::Structure(format!("object {number} offset outside object stream"))
            })?;
        pairs.push((number, offset));
    }

    let mut objects = Vec::with_capacity(pairs.len());
    for (number, offset) in pairs {
        if offset >= decoded.len() {
            return Err(PdfError::Structure(format!(
                "object {number} offset {offset} outside object stream"
            )));
        }
        let value = PdfParser::at(decoded, offset).parse_object()?;
        objects.push((number, value));
    }

    let extends = match dict.get("Extends") {
        Some(obj) => Some(obj.as_reference()?),
        None => None,
    };
    Ok(UnpackedObjects { objects, extends })
}

/// Packs small objects into a single object stream.
#[derive(Debug, Default)]
pub struct ObjectStreamPacker {
    header: Vec<u8>,
    body: Vec<u8>,
    count: usize,
}

impl ObjectStreamPacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append an object; returns its index in the stream.
    pub fn add(&mut self, number: u32, value: &PdfObject) -> Result<u32> {
        if matches!(value, PdfObject::Stream(_)) {
            return Err(PdfError::Structure(format!(
                "stream object {number} cannot be packed into an object stream"
            )));
        }
        if !self.header.is_empty() {
            self.header.push(b' ');
        }
        self.header
            .extend_from_slice(format!("{} {}", number, self.body.len()).as_bytes());
        value.write_to(&mut self.body)?;
        self.body.push(b'\n');
        let index = self.count as u32;
        self.count += 1;
        Ok(index)
    }

    /// Build the stream, FlateDecode-compressed when `compress` is set.
    pub fn finish(self, compress: bool) -> Stream {
        let mut header = self.header;
        header.push(b'\n');
        let first = header.len();
        let mut dict = Dictionary::new();
        dict.set("Type", PdfObject::name("ObjStm"));
        dict.set("N", self.count as i64);
        dict.set("First", first as i64);
        if compress {
            dict.set("Filter", PdfObject::name("FlateDecode"));
        }
        let mut payload = header;
        payload.extend_from_slice(&self.body);
        Stream::from_decoded(dict, payload)
    }
}
