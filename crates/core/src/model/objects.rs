//! PDF object types and their serialized form.

use crate::error::{PdfError, Result};
use crate::model::stream::Stream;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    pub number: u32,
    pub generation: u16,
}

impl ObjRef {
    pub const fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Literal string `( ... )`
    String(Vec<u8>),
    /// Hex string `< ... >`
    HexString(Vec<u8>),
    /// Name without the leading slash. Each byte of the serialized name maps
    /// to the char with the same code point.
    Name(String),
    Array(Vec<PdfObject>),
    Dict(Dictionary),
    /// Only ever the direct value of an indirect object.
    Stream(Box<Stream>),
    Ref(ObjRef),
    /// Unclassified lexeme from a content stream.
    Token(Vec<u8>),
}

impl PdfObject {
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Self::String(bytes.into())
    }

    /// Integer if the value equals its truncation, real otherwise.
    pub fn number(value: f64) -> Self {
        if value.is_finite() && value.trunc() == value && value.abs() < i64::MAX as f64 {
            Self::Int(value as i64)
        } else {
            Self::Real(value)
        }
    }

    pub fn reference(number: u32, generation: u16) -> Self {
        Self::Ref(ObjRef::new(number, generation))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::HexString(_) => "hexstring",
            Self::Name(_) => "name",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
            Self::Token(_) => "token",
        }
    }

    fn type_error<T>(&self, expected: &'static str) -> Result<T> {
        Err(PdfError::TypeError {
            expected,
            got: self.type_name(),
        })
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => self.type_error("bool"),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => self.type_error("int"),
        }
    }

    /// Numeric value of an int or real.
    pub fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => self.type_error("number"),
        }
    }

    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => self.type_error("name"),
        }
    }

    /// Bytes of a literal or hex string.
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) | Self::HexString(s) => Ok(s),
            _ => self.type_error("string"),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => self.type_error("array"),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => self.type_error("array"),
        }
    }

    /// Dictionary of a dict, or the dictionary of a stream.
    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(s.dict()),
            _ => self.type_error("dict"),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(s.dict_mut()),
            _ => self.type_error("dict"),
        }
    }

    pub fn as_reference(&self) -> Result<ObjRef> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => self.type_error("ref"),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => self.type_error("stream"),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => self.type_error("stream"),
        }
    }

    /// Whether a separating space is needed when this value follows one
    /// that asks for a space after itself.
    pub const fn needs_space_before(&self) -> bool {
        match self {
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Real(_) | Self::Ref(_) => true,
            Self::Token(_) => true,
            Self::Name(_) => false,
            Self::String(_)
            | Self::HexString(_)
            | Self::Array(_)
            | Self::Dict(_)
            | Self::Stream(_) => false,
        }
    }

    pub const fn needs_space_after(&self) -> bool {
        match self {
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Real(_) | Self::Ref(_) => true,
            Self::Token(_) | Self::Name(_) => true,
            Self::String(_)
            | Self::HexString(_)
            | Self::Array(_)
            | Self::Dict(_)
            | Self::Stream(_) => false,
        }
    }

    /// Append the serialized form to `out`.
    ///
    /// Fails only for streams whose payload cannot be encoded.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Null => out.extend_from_slice(b"null"),
            Self::Bool(true) => out.extend_from_slice(b"true"),
            Self::Bool(false) => out.extend_from_slice(b"false"),
            Self::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
            Self::Real(n) => write_real(*n, out),
            Self::String(s) => write_literal_string(s, out),
            Self::HexString(s) => write_hex_string(s, out),
            Self::Name(name) => write_name(name, out),
            Self::Array(items) => {
                out.push(b'[');
                write_sequence(items.iter(), out)?;
                out.push(b']');
            }
            Self::Dict(dict) => dict.write_to(out)?,
            Self::Stream(stream) => stream.write_to(out)?,
            Self::Ref(r) => out.extend_from_slice(r.to_string().as_bytes()),
            Self::Token(t) => out.extend_from_slice(t),
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

impl fmt::Display for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes().map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}

impl From<bool> for PdfObject {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PdfObject {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for PdfObject {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<ObjRef> for PdfObject {
    fn from(r: ObjRef) -> Self {
        Self::Ref(r)
    }
}

impl From<Dictionary> for PdfObject {
    fn from(d: Dictionary) -> Self {
        Self::Dict(d)
    }
}

impl From<Vec<PdfObject>> for PdfObject {
    fn from(items: Vec<PdfObject>) -> Self {
        Self::Array(items)
    }
}

impl From<Stream> for PdfObject {
    fn from(s: Stream) -> Self {
        Self::Stream(Box::new(s))
    }
}

/// Write values with the minimal-whitespace rule: one space between two
/// neighbours only when the left wants a space after and the right wants
/// one before.
pub fn write_sequence<'a>(
    items: impl IntoIterator<Item = &'a PdfObject>,
    out: &mut Vec<u8>,
) -> Result<()> {
    let mut space_after_prev = false;
    for item in items {
        if space_after_prev && item.needs_space_before() {
            out.push(b' ');
        }
        item.write_to(out)?;
        space_after_prev = item.needs_space_after();
    }
    Ok(())
}

/// Write `value` as an integer when it has no fractional part.
pub(crate) fn write_number(value: f64, out: &mut Vec<u8>) {
    match PdfObject::number(value) {
        PdfObject::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
        _ => write_real(value, out),
    }
}

fn write_real(n: f64, out: &mut Vec<u8>) {
    if !n.is_finite() || n == 0.0 {
        out.push(b'0');
        return;
    }
    // f64 Display is the shortest round-trip form and never uses exponents.
    out.extend_from_slice(n.to_string().as_bytes());
}

/// Bytes of a name as stored in the file.
pub fn name_bytes(name: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(name.len());
    for c in name.chars() {
        match u8::try_from(c as u32) {
            Ok(b) => bytes.push(b),
            Err(_) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    bytes
}

pub(crate) fn name_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn write_name(name: &str, out: &mut Vec<u8>) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push(b'/');
    for b in name_bytes(name) {
        let escape = !(0x21..=0x7e).contains(&b)
            || matches!(
                b,
                b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
            );
        if escape {
            out.extend_from_slice(&[b'#', HEX[(b >> 4) as usize], HEX[(b & 0x0f) as usize]]);
        } else {
            out.push(b);
        }
    }
}

fn write_literal_string(s: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in s {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

fn write_hex_string(s: &[u8], out: &mut Vec<u8>) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push(b'<');
    for &b in s {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0x0f) as usize]);
    }
    out.push(b'>');
}

/// PDF dictionary. Null values are never stored; keys are written sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: BTreeMap<String, PdfObject>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PdfObject> {
        self.entries.get_mut(key)
    }

    /// Insert or replace; a Null value removes the key instead.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PdfObject>) {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PdfObject> {
        self.entries.remove(key)
    }

    pub fn has_object(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PdfObject> {
        self.entries.iter()
    }

    pub fn values_mut(&mut self) -> btree_map::ValuesMut<'_, String, PdfObject> {
        self.entries.values_mut()
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_name().ok())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int().ok())
    }

    /// True if `Type` is the given name.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.get_name("Type") == Some(type_name)
    }

    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(b"<<");
        for (key, value) in &self.entries {
            // Keys are names: never a space before, always one after.
            write_name(key, out);
            if value.needs_space_before() {
                out.push(b' ');
            }
            value.write_to(out)?;
        }
        out.extend_from_slice(b">>");
        Ok(())
    }
}

impl FromIterator<(String, PdfObject)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, PdfObject)>>(iter: I) -> Self {
        let mut dict = Self::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a PdfObject);
    type IntoIter = btree_map::Iter<'a, String, PdfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
