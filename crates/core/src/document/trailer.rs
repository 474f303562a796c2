//! Trailer dictionary.

use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, PdfObject};

/// The trailer keys this crate reads and writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trailer {
    pub size: Option<u32>,
    pub prev: Option<usize>,
    pub root: Option<PdfObject>,
    pub encrypt: Option<PdfObject>,
    pub info: Option<PdfObject>,
    pub id: Option<PdfObject>,
}

impl Trailer {
    /// Typed view of a trailer (or cross-reference stream) dictionary.
    pub fn from_dict(dict: &Dictionary) -> Result<Self> {
        let size = match dict.get("Size") {
            Some(obj) => Some(
                u32::try_from(obj.as_int()?)
                    .map_err(|_| PdfError::Structure("trailer /Size out of range".into()))?,
            ),
            None => None,
        };
        let prev = match dict.get("Prev") {
            Some(obj) => Some(
                usize::try_from(obj.as_int()?)
                    .map_err(|_| PdfError::Structure("trailer /Prev is negative".into()))?,
            ),
            None => None,
        };
        Ok(Self {
            size,
            prev,
            root: dict.get("Root").cloned(),
            encrypt: dict.get("Encrypt").cloned(),
            info: dict.get("Info").cloned(),
            id: dict.get("ID").cloned(),
        })
    }

    /// Fill keys still missing from an older trailer. Newer values win.
    pub fn merge_older(&mut self, older: &Trailer) {
        fn fill<T: Clone>(slot: &mut Option<T>, older: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(older);
            }
        }
        fill(&mut self.size, &older.size);
        fill(&mut self.root, &older.root);
        fill(&mut self.encrypt, &older.encrypt);
        fill(&mut self.info, &older.info);
        fill(&mut self.id, &older.id);
    }

    /// Declared `Size`, or a structural error.
    pub fn require_size(&self) -> Result<u32> {
        self.size
            .ok_or_else(|| PdfError::Structure("trailer has no /Size".into()))
    }

    pub fn require_root(&self) -> Result<&PdfObject> {
        self.root
            .as_ref()
            .ok_or_else(|| PdfError::Structure("trailer has no /Root".into()))
    }

    /// Dictionary written on save: Size, Root, Info and ID.
    pub fn to_dict(&self, size: u32) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        dict.set("Size", size as i64);
        dict.set("Root", self.require_root()?.clone());
        if let Some(info) = &self.info {
            dict.set("Info", info.clone());
        }
        if let Some(id) = &self.id {
            dict.set("ID", id.clone());
        }
        Ok(dict)
    }

    /// Objects reachable from the trailer, as pruning roots.
    pub fn roots(&self) -> impl Iterator<Item = &PdfObject> {
        [&self.root, &self.info, &self.encrypt, &self.id]
            .into_iter()
            .flatten()
    }
}
