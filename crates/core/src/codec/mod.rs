//! Stream filters.
//!
//! A stream dictionary names its filters in `Filter` (a name or an array of
//! names) with optional parallel `DecodeParms`. Decoding applies the filters
//! in order; encoding applies them in reverse.

pub mod ascii;
pub mod flate;

use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, PdfObject};

pub use flate::PredictorParams;

/// A supported stream filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Flate(PredictorParams),
    AsciiHex,
    Ascii85,
}

impl Filter {
    pub fn from_name(name: &str, parms: Option<&Dictionary>) -> Result<Self> {
        match name {
            "FlateDecode" | "Fl" => Ok(Self::Flate(PredictorParams::from_dict(parms)?)),
            "ASCIIHexDecode" | "AHx" => Ok(Self::AsciiHex),
            "ASCII85Decode" | "A85" => Ok(Self::Ascii85),
            other => Err(PdfError::Unsupported(format!("filter /{other}"))),
        }
    }

    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Flate(params) => flate::decode(data, params),
            Self::AsciiHex => ascii::ascii_hex_decode(data),
            Self::Ascii85 => ascii::ascii85_decode(data),
        }
    }

    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Flate(params) => flate::encode(data, params),
            Self::AsciiHex => Ok(ascii::ascii_hex_encode(data)),
            Self::Ascii85 => Ok(ascii::ascii85_encode(data)),
        }
    }
}

/// Filter chain declared by a stream (or inline image) dictionary.
///
/// `filter_key` and `parms_key` allow the abbreviated inline image keys.
pub fn filter_chain_with_keys(
    dict: &Dictionary,
    filter_key: &str,
    parms_key: &str,
) -> Result<Vec<Filter>> {
    let names: Vec<&PdfObject> = match dict.get(filter_key) {
        None => return Ok(Vec::new()),
        Some(PdfObject::Array(items)) => items.iter().collect(),
        Some(obj) => vec![obj],
    };
    let parms: Vec<Option<&Dictionary>> = match dict.get(parms_key) {
        Some(PdfObject::Array(items)) => items.iter().map(|p| p.as_dict().ok()).collect(),
        Some(PdfObject::Dict(d)) => vec![Some(d)],
        _ => Vec::new(),
    };
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Filter::from_name(name.as_name()?, parms.get(i).copied().flatten()))
        .collect()
}

pub fn filter_chain(dict: &Dictionary) -> Result<Vec<Filter>> {
    if dict.has_object("F") {
        return Err(PdfError::Unsupported("externally stored stream content".into()));
    }
    filter_chain_with_keys(dict, "Filter", "DecodeParms")
}

/// Decode a stream payload with the filters its dictionary declares.
pub fn decode_stream(dict: &Dictionary, raw: &[u8]) -> Result<Vec<u8>> {
    let mut data = raw.to_vec();
    for filter in filter_chain(dict)? {
        data = filter.decode(&data)?;
    }
    Ok(data)
}

/// Encode a decoded payload with the filters its dictionary declares.
pub fn encode_stream(dict: &Dictionary, decoded: &[u8]) -> Result<Vec<u8>> {
    let mut data = decoded.to_vec();
    for filter in filter_chain(dict)?.iter().rev() {
        data = filter.encode(&data)?;
    }
    Ok(data)
}
