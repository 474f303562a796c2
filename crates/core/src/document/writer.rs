//! Serialization of a [`PdfFile`] as a complete, non-incremental file.

use super::file::{PdfFile, PdfVersion};
use super::indirect::IndirectObject;
use super::object_stream::ObjectStreamPacker;
use super::xref::{XrefEntry, contiguous_runs};
use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, ObjRef, PdfObject};
use crate::model::stream::Stream;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Options for [`PdfFile::save_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Pack small objects into an object stream and write a
    /// cross-reference stream (PDF 1.5 and later only).
    pub allow_compression: bool,
    /// Run [`PdfFile::remove_unused_objects`] before writing.
    pub prune_unused: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            allow_compression: true,
            prune_unused: false,
        }
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_compression(mut self, allow: bool) -> Self {
        self.allow_compression = allow;
        self
    }

    pub fn prune_unused(mut self, prune: bool) -> Self {
        self.prune_unused = prune;
        self
    }
}

/// Where a written object ended up.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Free { next: u32, generation: u16 },
    Inline { offset: usize, generation: u16 },
    Packed { stream: u32, index: u32 },
}

impl Slot {
    /// `(type, field 2, field 3)` of a cross-reference stream row.
    fn fields(self) -> (u64, u64, u64) {
        match self {
            Slot::Free { next, generation } => (0, next as u64, generation as u64),
            Slot::Inline { offset, generation } => (1, offset as u64, generation as u64),
            Slot::Packed { stream, index } => (2, stream as u64, index as u64),
        }
    }
}

/// Smallest big-endian width holding `value`, at least one byte.
fn byte_width(value: u64) -> usize {
    (((64 - value.leading_zeros()) as usize).div_ceil(8)).max(1)
}

impl PdfFile {
    /// Serialize the whole document.
    pub fn save(&mut self, allow_compression: bool) -> Result<Vec<u8>> {
        self.save_with(&SaveOptions::new().allow_compression(allow_compression))
    }

    pub fn save_with(&mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        if options.prune_unused {
            self.remove_unused_objects()?;
        }
        self.check_free_head()?;
        self.resolve_all()?;

        let pack = options.allow_compression && self.version() >= PdfVersion::V1_5;
        let mut out = Vec::new();
        self.write_header(&mut out);

        let mut slots: BTreeMap<u32, Slot> = BTreeMap::new();
        let max_number = self.xref.max_number().unwrap_or(0);
        let host_number = max_number + 1;
        let mut packer = ObjectStreamPacker::new();

        for entry in self.xref.iter() {
            if !entry.in_use {
                continue;
            }
            let Some(object) = entry.resolved() else {
                warn!(number = entry.number, "unresolvable object written as free");
                continue;
            };
            if pack && is_packable(entry, &object.value) {
                let index = packer.add(entry.number, &object.value)?;
                slots.insert(
                    entry.number,
                    Slot::Packed {
                        stream: host_number,
                        index,
                    },
                );
            } else {
                slots.insert(
                    entry.number,
                    Slot::Inline {
                        offset: out.len(),
                        generation: object.generation,
                    },
                );
                object.write_to(&mut out)?;
            }
        }

        let packed = packer.len();
        if packed > 0 {
            let host = IndirectObject::new(host_number, 0, packer.finish(true).into());
            slots.insert(
                host_number,
                Slot::Inline {
                    offset: out.len(),
                    generation: 0,
                },
            );
            host.write_to(&mut out)?;
        }
        self.chain_free_entries(&mut slots);

        if packed > 0 {
            self.write_xref_stream(&mut out, &mut slots, host_number + 1)?;
        } else {
            self.write_classic_xref(&mut out, &slots)?;
        }
        debug!(
            bytes = out.len(),
            objects = slots.len(),
            packed,
            "saved document"
        );
        Ok(out)
    }

    fn check_free_head(&mut self) -> Result<()> {
        match self.xref.get(0) {
            None => {
                self.xref.insert(XrefEntry::free_head());
                Ok(())
            }
            Some(entry) if entry.is_free_head() => Ok(()),
            Some(entry) => Err(PdfError::Structure(format!(
                "object 0 must be the free-list head (in_use={}, generation={})",
                entry.in_use, entry.generation
            ))),
        }
    }

    fn resolve_all(&mut self) -> Result<()> {
        let refs: Vec<_> = self
            .xref
            .iter()
            .filter(|entry| entry.in_use && !entry.is_resolved())
            .map(|entry| ObjRef::new(entry.number, entry.generation))
            .collect();
        for r in refs {
            self.resolve_indirect(r)?;
        }
        Ok(())
    }

    fn write_header(&self, out: &mut Vec<u8>) {
        let version = self.version();
        out.extend_from_slice(format!("%PDF-{}.{}\n", version.major, version.minor).as_bytes());
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
    }

    /// Link every free number (and the ones left unwritten) from entry 0.
    fn chain_free_entries(&self, slots: &mut BTreeMap<u32, Slot>) {
        let mut free: Vec<(u32, u16)> = self
            .xref
            .iter()
            .filter(|entry| !slots.contains_key(&entry.number))
            .map(|entry| {
                let generation = if entry.in_use {
                    entry.generation.saturating_add(1)
                } else {
                    entry.generation
                };
                (entry.number, generation)
            })
            .collect();
        free.sort_unstable_by_key(|&(number, _)| number);
        for (i, &(number, generation)) in free.iter().enumerate() {
            let next = free.get(i + 1).map_or(0, |&(n, _)| n);
            slots.insert(number, Slot::Free { next, generation });
        }
    }

    fn write_classic_xref(&self, out: &mut Vec<u8>, slots: &BTreeMap<u32, Slot>) -> Result<()> {
        let start = out.len();
        out.extend_from_slice(b"xref\n");
        for (first, count) in contiguous_runs(slots.keys().copied()) {
            out.extend_from_slice(format!("{first} {count}\n").as_bytes());
            for number in first..first + count {
                let record = match slots.get(&number) {
                    Some(Slot::Inline { offset, generation }) => {
                        format!("{offset:010} {generation:05} n\r\n")
                    }
                    Some(Slot::Free { next, generation }) => {
                        format!("{next:010} {generation:05} f\r\n")
                    }
                    Some(Slot::Packed { .. }) | None => {
                        return Err(PdfError::Structure(format!(
                            "object {number} cannot be listed in a classic table"
                        )));
                    }
                };
                out.extend_from_slice(record.as_bytes());
            }
        }
        let size = slots.keys().next_back().map_or(1, |n| n + 1);
        out.extend_from_slice(b"trailer\n");
        self.trailer.to_dict(size)?.write_to(out)?;
        out.extend_from_slice(format!("\nstartxref\n{start}\n%%EOF\n").as_bytes());
        Ok(())
    }

    fn write_xref_stream(
        &self,
        out: &mut Vec<u8>,
        slots: &mut BTreeMap<u32, Slot>,
        number: u32,
    ) -> Result<()> {
        let start = out.len();
        slots.insert(
            number,
            Slot::Inline {
                offset: start,
                generation: 0,
            },
        );

        let (w1, w2) = slots.values().fold((1, 1), |(w1, w2), slot| {
            let (_, f2, f3) = slot.fields();
            (w1.max(byte_width(f2)), w2.max(byte_width(f3)))
        });
        let mut rows = Vec::with_capacity(slots.len() * (1 + w1 + w2));
        for slot in slots.values() {
            let (kind, f2, f3) = slot.fields();
            rows.write_uint::<BigEndian>(kind, 1)?;
            rows.write_uint::<BigEndian>(f2, w1)?;
            rows.write_uint::<BigEndian>(f3, w2)?;
        }

        let size = number + 1;
        let mut dict: Dictionary = self.trailer.to_dict(size)?;
        dict.set("Type", PdfObject::name("XRef"));
        dict.set(
            "W",
            PdfObject::Array(vec![
                PdfObject::Int(1),
                PdfObject::Int(w1 as i64),
                PdfObject::Int(w2 as i64),
            ]),
        );
        let index = contiguous_runs(slots.keys().copied())
            .into_iter()
            .flat_map(|(first, count)| [PdfObject::Int(first as i64), PdfObject::Int(count as i64)])
            .collect();
        dict.set("Index", PdfObject::Array(index));
        dict.set("Filter", PdfObject::name("FlateDecode"));

        let stream = Stream::from_decoded(dict, rows);
        IndirectObject::new(number, 0, stream.into()).write_to(out)?;
        out.extend_from_slice(format!("startxref\n{start}\n%%EOF\n").as_bytes());
        Ok(())
    }
}

fn is_packable(entry: &XrefEntry, value: &PdfObject) -> bool {
    entry.number != 0
        && entry.generation == 0
        && matches!(value, PdfObject::Dict(_) | PdfObject::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_width() {
        assert_eq!(byte_width(0), 1);
        assert_eq!(byte_width(255), 1);
        assert_eq!(byte_width(256), 2);
        assert_eq!(byte_width(70_000), 3);
    }

    #[test]
    fn test_options_builder() {
        let options = SaveOptions::new().allow_compression(false).prune_unused(true);
        assert!(!options.allow_compression);
        assert!(options.prune_unused);
        assert_eq!(SaveOptions::default(), SaveOptions::new());
    }

    #[test]
    fn test_new_document_saves_classic_table() {
        let mut file = PdfFile::new(PdfVersion::V1_4);
        let mut catalog = Dictionary::new();
        catalog.set("Type", PdfObject::name("Catalog"));
        let root = file.allocate(PdfObject::Dict(catalog));
        file.trailer_mut().root = Some(root.into());
        let out = file.save(true).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.contains("xref\n0 2\n0000000000 65535 f\r\n"));
        assert!(text.contains("/Root 1 0 R"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_bad_free_head_rejected() {
        let mut file = PdfFile::new(PdfVersion::V1_4);
        file.replace(ObjRef::new(0, 0), PdfObject::Null);
        assert!(matches!(file.save(false), Err(PdfError::Structure(_))));
    }
}
