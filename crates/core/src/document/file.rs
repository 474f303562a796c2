//! PDF file engine.
//!
//! [`PdfFile`] owns the file bytes, the merged cross-reference table and the
//! trailer. Objects are parsed lazily on first resolution and cached on
//! their table entry for the life of the file.

use super::indirect::IndirectObject;
use super::object_stream;
use super::trailer::Trailer;
use super::xref::{Location, XrefEntry, XrefTable};
use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, ObjRef, PdfObject};
use crate::parser::PdfParser;
use crate::parser::cursor::{ByteCursor, DIGITS, WHITESPACE, rfind};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

static NULL: PdfObject = PdfObject::Null;

/// Nesting limit for non-caching lookups of `/Length` and filter values.
const MAX_PEEK_DEPTH: usize = 8;

/// Header version `%PDF-major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const V1_4: Self = Self::new(1, 4);
    pub const V1_5: Self = Self::new(1, 5);
    pub const V1_7: Self = Self::new(1, 7);
    pub const V2_0: Self = Self::new(2, 0);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parse `M.m`.
    pub fn parse(text: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(text);
        let major = cursor.read_while(DIGITS, Some(3));
        let dot = cursor.read_byte().ok();
        let minor = cursor.read_while(DIGITS, Some(3));
        let invalid = || PdfError::syntax(0, format!("invalid PDF version '{}'", String::from_utf8_lossy(text)));
        if major.is_empty() || minor.is_empty() || dot != Some(b'.') {
            return Err(invalid());
        }
        let number = |digits: &[u8]| -> Result<u8> {
            std::str::from_utf8(digits)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(invalid)
        };
        let version = Self::new(number(major)?, number(minor)?);
        if !matches!(version.major, 1 | 2) {
            return Err(PdfError::Unsupported(format!("PDF version {version}")));
        }
        Ok(version)
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A loaded (or newly created) PDF file.
pub struct PdfFile {
    data: Bytes,
    version: PdfVersion,
    pub(crate) xref: XrefTable,
    pub(crate) trailer: Trailer,
    /// Object stream entries, moved out of the table after unpacking.
    hosts: BTreeMap<u32, XrefEntry>,
}

impl fmt::Debug for PdfFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfFile")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("objects", &self.xref.len())
            .field("object_streams", &self.hosts.len())
            .finish()
    }
}

/// One cross-reference section and the dictionary that closes it.
struct Section {
    entries: Vec<XrefEntry>,
    dict: Dictionary,
    is_stream: bool,
}

impl PdfFile {
    /// Empty document holding only the free-list head.
    pub fn new(version: PdfVersion) -> Self {
        Self {
            data: Bytes::new(),
            version,
            xref: XrefTable::with_free_head(),
            trailer: Trailer {
                size: Some(1),
                ..Trailer::default()
            },
            hosts: BTreeMap::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load(data)
    }

    /// Parse the header, every cross-reference section and the object
    /// streams they reference.
    pub fn load(data: impl Into<Bytes>) -> Result<Self> {
        let data: Bytes = data.into();
        let version = read_header(&data)?;
        let start = find_startxref(&data)?;
        debug!(%version, start, "loading cross-reference sections");

        let (mut xref, trailer) = load_sections(&data, start)?;
        if trailer.encrypt.is_some() {
            return Err(PdfError::Unsupported("encrypted documents".into()));
        }
        let size = trailer.require_size()?;
        trailer.require_root()?;

        let before = xref.len();
        xref.retain(|entry| entry.number < size);
        if xref.len() < before {
            warn!(dropped = before - xref.len(), size, "dropped entries beyond /Size");
        }

        let mut file = Self {
            data,
            version,
            xref,
            trailer,
            hosts: BTreeMap::new(),
        };
        file.unpack_object_streams()?;
        debug!(
            objects = file.xref.len(),
            object_streams = file.hosts.len(),
            "loaded"
        );
        Ok(file)
    }

    pub fn version(&self) -> PdfVersion {
        self.version
    }

    pub fn set_version(&mut self, version: PdfVersion) {
        self.version = version;
    }

    /// Raise the version to at least `min`.
    pub fn ensure_version(&mut self, min: PdfVersion) {
        if self.version < min {
            self.version = min;
        }
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Trailer {
        &mut self.trailer
    }

    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// Numbers of the object streams unpacked at load time.
    pub fn object_stream_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.hosts.keys().copied()
    }

    fn next_number(&self) -> u32 {
        let table_max = self.xref.max_number().unwrap_or(0);
        let host_max = self.hosts.keys().next_back().copied().unwrap_or(0);
        let declared = self.trailer.size.unwrap_or(1).saturating_sub(1);
        table_max.max(host_max).max(declared) + 1
    }

    /// Add a new in-memory object and return its reference.
    pub fn allocate(&mut self, value: PdfObject) -> ObjRef {
        let number = self.next_number();
        self.xref
            .insert(XrefEntry::detached(IndirectObject::new(number, 0, value)));
        ObjRef::new(number, 0)
    }

    /// Replace the object behind `r` with an in-memory value.
    pub fn replace(&mut self, r: ObjRef, value: PdfObject) {
        self.xref.insert(XrefEntry::detached(IndirectObject::new(
            r.number,
            r.generation,
            value,
        )));
    }

    /// Value of a reference; `Null` for missing, free or mismatched entries.
    pub fn resolve(&mut self, r: ObjRef) -> Result<&PdfObject> {
        Ok(self.resolve_indirect(r)?.map_or(&NULL, |obj| &obj.value))
    }

    pub fn resolve_indirect(&mut self, r: ObjRef) -> Result<Option<&IndirectObject>> {
        let Some(entry) = self.xref.get(r.number) else {
            return Ok(None);
        };
        if !entry.in_use || entry.generation != r.generation {
            return Ok(None);
        }
        if !entry.is_resolved() {
            let location = entry.location;
            match location {
                Location::AtRest { offset } => {
                    let object = self.parse_at(offset)?;
                    if object.number != r.number {
                        return Err(PdfError::Structure(format!(
                            "offset {offset} holds object {} instead of {}",
                            object.number, r.number
                        )));
                    }
                    if object.generation != r.generation {
                        warn!(number = r.number, "generation differs from cross-reference entry");
                    }
                    if let Some(entry) = self.xref.get_mut(r.number) {
                        entry.memoize(object);
                    }
                }
                Location::Compressed { stream, .. } => {
                    if !self.hosts.contains_key(&stream) {
                        self.take_host(stream)?;
                    }
                }
                Location::Detached => {}
            }
        }
        Ok(self.xref.get(r.number).and_then(XrefEntry::resolved))
    }

    /// Mutable access to a resolved object.
    pub fn object_mut(&mut self, r: ObjRef) -> Result<Option<&mut PdfObject>> {
        if self.resolve_indirect(r)?.is_none() {
            return Ok(None);
        }
        Ok(self
            .xref
            .get_mut(r.number)
            .and_then(XrefEntry::resolved_mut)
            .map(|obj| &mut obj.value))
    }

    /// The document catalog named by the trailer's `Root`.
    pub fn catalog(&mut self) -> Result<&PdfObject> {
        let root = self.trailer.require_root()?.as_reference()?;
        self.resolve(root)
    }

    fn parse_at(&self, offset: usize) -> Result<IndirectObject> {
        IndirectObject::parse(&self.data, offset, &|r: ObjRef| self.peek(r, 0))
    }

    /// Non-caching lookup used while another object is being parsed.
    fn peek(&self, r: ObjRef, depth: usize) -> Result<Option<PdfObject>> {
        let Some(entry) = self.xref.get(r.number) else {
            return Ok(None);
        };
        if !entry.in_use || entry.generation != r.generation {
            return Ok(None);
        }
        if let Some(value) = entry.value() {
            return Ok(Some(value.clone()));
        }
        match entry.location {
            Location::AtRest { offset } if depth < MAX_PEEK_DEPTH => {
                let object = IndirectObject::parse(&self.data, offset, &|r: ObjRef| self.peek(r, depth + 1))?;
                Ok(Some(object.value))
            }
            _ => Ok(None),
        }
    }

    /// Move every object stream named by a compressed entry out of the table
    /// and attach the objects it holds.
    fn unpack_object_streams(&mut self) -> Result<()> {
        let mut pending: Vec<u32> = self
            .xref
            .iter()
            .filter_map(|entry| match entry.location {
                Location::Compressed { stream, .. } if entry.in_use => Some(stream),
                _ => None,
            })
            .collect();
        pending.sort_unstable();
        pending.dedup();
        pending.reverse();

        while let Some(host) = pending.pop() {
            if self.hosts.contains_key(&host) {
                continue;
            }
            if let Some(extends) = self.take_host(host)? {
                pending.push(extends.number);
            }
        }
        Ok(())
    }

    /// Unpack object stream `host`; returns its `Extends` reference.
    fn take_host(&mut self, host: u32) -> Result<Option<ObjRef>> {
        let Some(entry) = self.xref.remove(host) else {
            warn!(host, "object stream is not in the cross-reference table");
            return Ok(None);
        };
        let offset = match entry.location {
            Location::AtRest { offset } if entry.in_use => offset,
            _ => {
                return Err(PdfError::Structure(format!(
                    "object stream {host} is not stored inline"
                )));
            }
        };
        self.hosts.insert(host, entry);

        let object = self.parse_at(offset)?;
        let PdfObject::Stream(mut stream) = object.value else {
            return Err(PdfError::Structure(format!(
                "object {host} is not an object stream"
            )));
        };
        let dict = stream.dict().clone();
        let unpacked = object_stream::unpack(&dict, stream.decoded_data()?)?;
        let mut attached = 0usize;
        for (number, value) in unpacked.objects {
            let Some(entry) = self.xref.get_mut(number) else {
                continue;
            };
            if entry.in_use
                && !entry.is_resolved()
                && matches!(entry.location, Location::Compressed { stream, .. } if stream == host)
            {
                entry.memoize(IndirectObject::new(number, 0, value));
                attached += 1;
            }
        }
        debug!(host, attached, "unpacked object stream");
        Ok(unpacked.extends)
    }

    /// Drop every entry not reachable from the trailer. Entry 0 is kept.
    ///
    /// Returns the number of entries removed.
    pub fn remove_unused_objects(&mut self) -> Result<usize> {
        let mut visited: FxHashSet<u32> = FxHashSet::default();
        let mut work: Vec<ObjRef> = Vec::new();
        for root in self.trailer.roots() {
            collect_refs(root, &mut work);
        }
        while let Some(r) = work.pop() {
            if !visited.insert(r.number) {
                continue;
            }
            let value = self.resolve(r)?;
            collect_refs(value, &mut work);
        }

        let before = self.xref.len();
        self.xref
            .retain(|entry| entry.number == 0 || visited.contains(&entry.number));
        let removed = before - self.xref.len();
        debug!(kept = self.xref.len(), removed, "pruned unused objects");
        Ok(removed)
    }
}

/// Push every reference inside `obj` (including stream dictionaries).
fn collect_refs(obj: &PdfObject, out: &mut Vec<ObjRef>) {
    let mut stack = vec![obj];
    while let Some(obj) = stack.pop() {
        match obj {
            PdfObject::Ref(r) => out.push(*r),
            PdfObject::Array(items) => stack.extend(items.iter()),
            PdfObject::Dict(dict) => stack.extend(dict.iter().map(|(_, v)| v)),
            PdfObject::Stream(stream) => stack.extend(stream.dict().iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

fn read_header(data: &[u8]) -> Result<PdfVersion> {
    let window = &data[..data.len().min(1024)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| PdfError::syntax(0, "missing %PDF- header"))?;
    let mut cursor = ByteCursor::at(data, pos + 5);
    let line = cursor.read_line()?;
    let end = line
        .iter()
        .position(|b| WHITESPACE.contains(*b))
        .unwrap_or(line.len());
    PdfVersion::parse(&line[..end])
}

/// Offset named on the line before the last `%%EOF`.
fn find_startxref(data: &[u8]) -> Result<usize> {
    let eof = rfind(data, b"%%EOF").ok_or_else(|| PdfError::syntax(data.len(), "missing %%EOF"))?;
    let mut lines = data[..eof]
        .split(|&b| b == b'\r' || b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .rev();
    let offset_line = lines
        .next()
        .ok_or_else(|| PdfError::syntax(eof, "missing startxref offset"))?;
    if lines.next() != Some(b"startxref".as_slice()) {
        return Err(PdfError::syntax(eof, "missing startxref keyword"));
    }
    std::str::from_utf8(offset_line)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&offset| offset < data.len())
        .ok_or_else(|| {
            PdfError::syntax(
                eof,
                format!("invalid startxref offset '{}'", String::from_utf8_lossy(offset_line)),
            )
        })
}

/// Walk the `Prev` chain from `start`, newest section first.
fn load_sections(data: &Bytes, start: usize) -> Result<(XrefTable, Trailer)> {
    let mut table = XrefTable::new();
    let mut merged: Option<Trailer> = None;
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    let mut stream_offsets: FxHashSet<usize> = FxHashSet::default();
    let mut next = Some(start);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            warn!(offset, "loop in /Prev chain");
            break;
        }
        let section = read_section(data, offset)?;
        if section.is_stream {
            stream_offsets.insert(offset);
        }
        let mut added = 0usize;

        if let Some(stm) = section.dict.get_int("XRefStm") {
            let stm = usize::try_from(stm)
                .map_err(|_| PdfError::Structure("negative /XRefStm".into()))?;
            if visited.insert(stm) {
                stream_offsets.insert(stm);
                for entry in read_section(data, stm)?.entries {
                    added += table.insert_if_absent(entry) as usize;
                }
            }
        }
        for entry in section.entries {
            added += table.insert_if_absent(entry) as usize;
        }

        let trailer = Trailer::from_dict(&section.dict)?;
        debug!(offset, added, prev = ?trailer.prev, "read cross-reference section");
        next = trailer.prev;
        match merged.as_mut() {
            Some(newer) => newer.merge_older(&trailer),
            None => merged = Some(trailer),
        }
    }

    let trailer = merged.ok_or_else(|| PdfError::Structure("no trailer found".into()))?;
    // Cross-reference streams are rebuilt on save, never carried over.
    table.retain(|entry| entry.offset().is_none_or(|o| !stream_offsets.contains(&o)));
    Ok((table, trailer))
}

fn read_section(data: &Bytes, offset: usize) -> Result<Section> {
    let mut cursor = ByteCursor::at(data, offset);
    cursor.skip_while(WHITESPACE, None);
    if cursor.remaining().starts_with(b"xref") {
        read_classic_section(data, cursor.pos())
    } else {
        let object = IndirectObject::parse(data, offset, &|_: ObjRef| Ok(None))?;
        read_stream_section(object)
    }
}

fn read_classic_section(data: &[u8], offset: usize) -> Result<Section> {
    let mut parser = PdfParser::at(data, offset);
    parser.expect_keyword(b"xref")?;
    let mut entries = Vec::new();
    loop {
        let token = parser.next_token();
        if token.is(b"trailer") {
            break;
        }
        let start = token.as_unsigned().ok_or_else(|| {
            PdfError::syntax(token.pos, "expected cross-reference subsection header")
        })?;
        let count = parser.expect_unsigned()?;
        for i in 0..count {
            let field = parser.expect_unsigned()?;
            let generation = parser.expect_unsigned()?;
            let flag = parser.next_token();
            let number = start
                .checked_add(i)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| PdfError::syntax(flag.pos, "object number out of range"))?;
            let generation = u16::try_from(generation)
                .map_err(|_| PdfError::syntax(flag.pos, "generation out of range"))?;
            let entry = match flag.bytes {
                b"n" => XrefEntry::at_rest(number, generation, field as usize),
                b"f" => XrefEntry::free(number, generation),
                _ => {
                    return Err(PdfError::syntax(
                        flag.pos,
                        format!(
                            "invalid cross-reference flag '{}'",
                            String::from_utf8_lossy(flag.bytes)
                        ),
                    ));
                }
            };
            entries.push(entry);
        }
    }
    let dict = match parser.parse_object()? {
        PdfObject::Dict(dict) => dict,
        other => {
            return Err(PdfError::syntax(
                offset,
                format!("trailer is a {}, not a dictionary", other.type_name()),
            ));
        }
    };
    Ok(Section {
        entries,
        dict,
        is_stream: false,
    })
}

/// Widths `W` of a cross-reference stream.
fn field_widths(dict: &Dictionary) -> Result<[usize; 3]> {
    let w = dict
        .get("W")
        .ok_or_else(|| PdfError::Structure("cross-reference stream without /W".into()))?
        .as_array()?;
    if w.len() != 3 {
        return Err(PdfError::Structure(format!("/W has {} entries", w.len())));
    }
    let mut widths = [0usize; 3];
    for (slot, value) in widths.iter_mut().zip(w) {
        *slot = usize::try_from(value.as_int()?)
            .ok()
            .filter(|&n| n <= 8)
            .ok_or_else(|| PdfError::Structure("invalid /W field width".into()))?;
    }
    Ok(widths)
}

fn read_field(row: &[u8], width: usize, default: u64) -> u64 {
    if width == 0 {
        default
    } else {
        BigEndian::read_uint(row, width)
    }
}

/// Narrow a cross-reference stream field to the width its meaning allows.
fn record_field<T: TryFrom<u64>>(number: u32, value: u64) -> Result<T> {
    T::try_from(value).map_err(|_| {
        PdfError::Structure(format!(
            "cross-reference field {value} out of range for object {number}"
        ))
    })
}

fn read_stream_section(object: IndirectObject) -> Result<Section> {
    let PdfObject::Stream(mut stream) = object.value else {
        return Err(PdfError::Structure(format!(
            "object {} at startxref is not a cross-reference stream",
            object.number
        )));
    };
    if !stream.dict().is_type("XRef") {
        return Err(PdfError::Structure(format!(
            "object {} is not /Type /XRef",
            object.number
        )));
    }
    let dict = stream.dict().clone();
    let widths = field_widths(&dict)?;
    let size = dict
        .get_int("Size")
        .ok_or_else(|| PdfError::Structure("cross-reference stream without /Size".into()))?;
    let index: Vec<i64> = match dict.get("Index") {
        Some(obj) => obj
            .as_array()?
            .iter()
            .map(PdfObject::as_int)
            .collect::<Result<_>>()?,
        None => vec![0, size],
    };
    if index.len() % 2 != 0 {
        return Err(PdfError::Structure("odd /Index length".into()));
    }

    let rows = stream.decoded_data()?;
    let row_len: usize = widths.iter().sum();
    let mut entries = Vec::new();
    let mut pos = 0usize;
    for pair in index.chunks_exact(2) {
        let (start, count) = (pair[0], pair[1]);
        if start < 0 || count < 0 {
            return Err(PdfError::Structure("negative /Index value".into()));
        }
        for i in 0..count {
            let row = rows.get(pos..pos + row_len).ok_or_else(|| {
                PdfError::Structure("cross-reference stream shorter than /Index".into())
            })?;
            pos += row_len;
            let number = start
                .checked_add(i)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| PdfError::Structure("object number out of range".into()))?;
            let kind = read_field(row, widths[0], 1);
            let f2 = read_field(&row[widths[0]..], widths[1], 0);
            let f3 = read_field(&row[widths[0] + widths[1]..], widths[2], 0);
            let entry = match kind {
                0 => XrefEntry::free(number, record_field(number, f3)?),
                1 => XrefEntry::at_rest(
                    number,
                    record_field(number, f3)?,
                    record_field(number, f2)?,
                ),
                2 => XrefEntry::compressed(
                    number,
                    record_field(number, f2)?,
                    record_field(number, f3)?,
                ),
                other => {
                    warn!(number, kind = other, "ignoring unknown cross-reference entry type");
                    continue;
                }
            };
            entries.push(entry);
        }
    }
    Ok(Section {
        entries,
        dict,
        is_stream: true,
    })
}
