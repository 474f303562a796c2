//! Cross-reference table.
//!
//! One table is assembled per file from every cross-reference section in
//! the `Prev` chain. Entries own an optional memo of their resolved object,
//! filled at most once.

use super::indirect::IndirectObject;
use crate::model::objects::PdfObject;
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Generation number of the free-list head.
pub const FREE_HEAD_GENERATION: u16 = 65535;

/// Where an entry's object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Created or replaced in memory; the memo holds the object.
    Detached,
    /// At a byte offset of the loaded file.
    AtRest { offset: usize },
    /// Inside object stream `stream` at position `index`.
    Compressed { stream: u32, index: u32 },
}

#[derive(Debug, Clone)]
pub struct XrefEntry {
    pub number: u32,
    pub generation: u16,
    pub in_use: bool,
    pub location: Location,
    resolved: Option<IndirectObject>,
}

impl XrefEntry {
    pub fn free(number: u32, generation: u16) -> Self {
        Self {
            number,
            generation,
            in_use: false,
            location: Location::Detached,
            resolved: None,
        }
    }

    /// Entry 0, the head of the free list.
    pub fn free_head() -> Self {
        Self::free(0, FREE_HEAD_GENERATION)
    }

    pub fn at_rest(number: u32, generation: u16, offset: usize) -> Self {
        Self {
            number,
            generation,
            in_use: true,
            location: Location::AtRest { offset },
            resolved: None,
        }
    }

    /// Compressed entries always have generation 0.
    pub fn compressed(number: u32, stream: u32, index: u32) -> Self {
        Self {
            number,
            generation: 0,
            in_use: true,
            location: Location::Compressed { stream, index },
            resolved: None,
        }
    }

    pub fn detached(object: IndirectObject) -> Self {
        Self {
            number: object.number,
            generation: object.generation,
            in_use: true,
            location: Location::Detached,
            resolved: Some(object),
        }
    }

    pub fn is_free_head(&self) -> bool {
        self.number == 0 && !self.in_use && self.generation == FREE_HEAD_GENERATION
    }

    /// Byte offset in the loaded file, if stored inline there.
    pub fn offset(&self) -> Option<usize> {
        match self.location {
            Location::AtRest { offset } => Some(offset),
            _ => None,
        }
    }

    pub fn resolved(&self) -> Option<&IndirectObject> {
        self.resolved.as_ref()
    }

    pub fn resolved_mut(&mut self) -> Option<&mut IndirectObject> {
        self.resolved.as_mut()
    }

    pub fn value(&self) -> Option<&PdfObject> {
        self.resolved.as_ref().map(|o| &o.value)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Fill the memo. Later calls keep the first object.
    pub(crate) fn memoize(&mut self, object: IndirectObject) {
        if self.resolved.is_none() {
            self.resolved = Some(object);
        }
    }
}

/// Object number to entry, iterated in ascending order.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    entries: BTreeMap<u32, XrefEntry>,
}

impl XrefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding only the free-list head.
    pub fn with_free_head() -> Self {
        let mut table = Self::new();
        table.insert(XrefEntry::free_head());
        table
    }

    pub fn get(&self, number: u32) -> Option<&XrefEntry> {
        self.entries.get(&number)
    }

    pub fn get_mut(&mut self, number: u32) -> Option<&mut XrefEntry> {
        self.entries.get_mut(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.entries.contains_key(&number)
    }

    /// Insert or replace.
    pub fn insert(&mut self, entry: XrefEntry) -> Option<XrefEntry> {
        self.entries.insert(entry.number, entry)
    }

    /// Insert unless the number is already present. Returns whether the entry
    /// was added.
    pub fn insert_if_absent(&mut self, entry: XrefEntry) -> bool {
        match self.entries.entry(entry.number) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn remove(&mut self, number: u32) -> Option<XrefEntry> {
        self.entries.remove(&number)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&XrefEntry) -> bool) {
        self.entries.retain(|_, entry| keep(entry));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_number(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    pub fn numbers(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &XrefEntry> {
        self.entries.values()
    }
}

/// Maximal runs of consecutive numbers as `(start, count)` pairs.
pub fn contiguous_runs(numbers: impl IntoIterator<Item = u32>) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for n in numbers {
        match runs.last_mut() {
            Some((start, count)) if *start + *count == n => *count += 1,
            _ => runs.push((n, 1)),
        }
    }
    runs
}
