//! Stream objects.
//!
//! A stream holds exactly one authoritative payload: either the encoded
//! bytes (for a loaded stream, a zero-copy slice of the file buffer) or the
//! decoded bytes. Decoding an encoded payload is memoized and does not change
//! which form is authoritative.

use crate::codec;
use crate::error::Result;
use crate::model::objects::{Dictionary, PdfObject};
use bytes::Bytes;
use std::borrow::Cow;

#[derive(Debug, Clone)]
enum Payload {
    Encoded {
        raw: Bytes,
        decoded: Option<Vec<u8>>,
    },
    Decoded(Vec<u8>),
}

/// PDF stream: dictionary plus payload.
#[derive(Debug, Clone)]
pub struct Stream {
    dict: Dictionary,
    payload: Payload,
    altered: bool,
}

impl Stream {
    /// Stream read from a file; `raw` is the payload exactly as stored.
    pub fn from_file(dict: Dictionary, raw: Bytes) -> Self {
        Self {
            dict,
            payload: Payload::Encoded { raw, decoded: None },
            altered: false,
        }
    }

    /// New stream whose payload is already encoded per `dict`.
    pub fn from_encoded(dict: Dictionary, encoded: impl Into<Bytes>) -> Self {
        let mut stream = Self::from_file(dict, encoded.into());
        stream.altered = true;
        stream
    }

    /// New stream that is encoded with the filters in `dict` when written.
    pub fn from_decoded(dict: Dictionary, decoded: Vec<u8>) -> Self {
        Self {
            dict,
            payload: Payload::Decoded(decoded),
            altered: true,
        }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dict_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.dict.get(key)
    }

    /// Whether the payload was replaced since the stream was loaded.
    pub fn is_altered(&self) -> bool {
        self.altered
    }

    /// Whether the encoded form is authoritative.
    pub fn is_encoded(&self) -> bool {
        matches!(self.payload, Payload::Encoded { .. })
    }

    pub fn set_encoded(&mut self, encoded: impl Into<Bytes>) {
        self.payload = Payload::Encoded {
            raw: encoded.into(),
            decoded: None,
        };
        self.altered = true;
    }

    pub fn set_decoded(&mut self, decoded: Vec<u8>) {
        self.payload = Payload::Decoded(decoded);
        self.altered = true;
    }

    /// Decoded payload, decoding and caching on first use.
    pub fn decoded_data(&mut self) -> Result<&[u8]> {
        match &mut self.payload {
            Payload::Decoded(data) => Ok(data),
            Payload::Encoded { raw, decoded } => {
                if decoded.is_none() {
                    *decoded = Some(codec::decode_stream(&self.dict, raw)?);
                }
                Ok(decoded.as_deref().unwrap_or_default())
            }
        }
    }

    /// Decoded payload without caching.
    pub fn decode(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Decoded(data) => Ok(Cow::Borrowed(data)),
            Payload::Encoded {
                decoded: Some(data),
                ..
            } => Ok(Cow::Borrowed(data)),
            Payload::Encoded { raw, decoded: None } => {
                Ok(Cow::Owned(codec::decode_stream(&self.dict, raw)?))
            }
        }
    }

    /// Payload as it will be written, encoding a decoded payload with the
    /// filters named in the dictionary.
    pub fn encoded_data(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Encoded { raw, .. } => Ok(Cow::Borrowed(raw)),
            Payload::Decoded(data) => Ok(Cow::Owned(codec::encode_stream(&self.dict, data)?)),
        }
    }

    /// Write `<<dict>>stream ... endstream` with a direct `Length`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let payload = self.encoded_data()?;
        let mut dict = self.dict.clone();
        dict.set("Length", payload.len() as i64);
        dict.write_to(out)?;
        out.extend_from_slice(b"\nstream\n");
        out.extend_from_slice(&payload);
        out.extend_from_slice(b"\nendstream");
        Ok(())
    }
}

/// Streams compare by dictionary (ignoring `Length`) and encoded payload.
impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        let strip = |d: &Dictionary| {
            let mut d = d.clone();
            d.remove("Length");
            d
        };
        if strip(&self.dict) != strip(&other.dict) {
            return false;
        }
        match (self.encoded_data(), other.encoded_data()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::flate;

    fn flate_dict() -> Dictionary {
        let mut d = Dictionary::new();
        d.set("Filter", PdfObject::name("FlateDecode"));
        d
    }

    #[test]
    fn test_decoded_data_is_memoized() {
        let raw = flate::deflate(b"BT ET").unwrap();
        let mut stream = Stream::from_file(flate_dict(), Bytes::from(raw.clone()));
        let first = stream.decoded_data().unwrap().to_vec();
        let second = stream.decoded_data().unwrap().to_vec();
        assert_eq!(first, b"BT ET");
        assert_eq!(first, second);
        assert!(!stream.is_altered());
        assert_eq!(stream.encoded_data().unwrap().as_ref(), raw.as_slice());
    }

    #[test]
    fn test_set_decoded_replaces_encoded() {
        let raw = flate::deflate(b"old").unwrap();
        let mut stream = Stream::from_file(flate_dict(), Bytes::from(raw));
        stream.set_decoded(b"new".to_vec());
        assert!(stream.is_altered());
        assert!(!stream.is_encoded());
        let encoded = stream.encoded_data().unwrap().into_owned();
        assert_eq!(flate::inflate(&encoded).unwrap(), b"new");
    }

    #[test]
    fn test_write_uses_direct_length() {
        let mut d = Dictionary::new();
        d.set("Length", PdfObject::reference(9, 0));
        let stream = Stream::from_file(d, Bytes::from_static(b"abc"));
        let mut out = Vec::new();
        stream.write_to(&mut out).unwrap();
        assert_eq!(out, b"<</Length 3>>\nstream\nabc\nendstream");
    }
}
