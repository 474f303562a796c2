//! Synthetic PDF files for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

#[derive(Clone, Copy)]
enum Row {
    Offset(usize),
    Compressed(u32, u32),
    Free(u32, u16),
}

/// Writes objects and cross-reference sections, tracking offsets. Each
/// section lists the objects written since the previous one.
pub struct PdfBuilder {
    out: Vec<u8>,
    pending: BTreeMap<u32, Row>,
    sections: usize,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        let mut out = format!("%PDF-{version}\n").into_bytes();
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            pending: BTreeMap::new(),
            sections: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.pending.insert(number, Row::Offset(self.out.len()));
        self.out
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
        self
    }

    pub fn stream(&mut self, number: u32, dict: &str, payload: &[u8]) -> &mut Self {
        self.pending.insert(number, Row::Offset(self.out.len()));
        self.write_stream(number, dict, payload);
        self
    }

    fn write_stream(&mut self, number: u32, dict: &str, payload: &[u8]) {
        self.out.extend_from_slice(
            format!("{number} 0 obj\n<<{dict}/Length {}>>\nstream\n", payload.len()).as_bytes(),
        );
        self.out.extend_from_slice(payload);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
    }

    pub fn free(&mut self, number: u32, generation: u16) -> &mut Self {
        self.pending.insert(number, Row::Free(0, generation));
        self
    }

    /// Uncompressed object stream holding `objects`.
    pub fn object_stream(&mut self, number: u32, objects: &[(u32, &str)]) -> &mut Self {
        let mut header = String::new();
        let mut body = String::new();
        for (i, (n, text)) in objects.iter().enumerate() {
            header.push_str(&format!("{n} {} ", body.len()));
            body.push_str(text);
            body.push('\n');
            self.pending.insert(*n, Row::Compressed(number, i as u32));
        }
        let first = header.len();
        let dict = format!("/Type/ObjStm/N {}/First {first}", objects.len());
        self.stream(number, &dict, format!("{header}{body}").as_bytes())
    }

    fn take_rows(&mut self) -> BTreeMap<u32, Row> {
        if self.sections == 0 {
            self.pending.insert(0, Row::Free(0, 65535));
        }
        self.sections += 1;
        std::mem::take(&mut self.pending)
    }

    /// Classic section plus trailer; returns the section offset.
    pub fn xref_table(&mut self, trailer: &str) -> usize {
        let start = self.out.len();
        let mut text = String::from("xref\n");
        for (n, row) in self.take_rows() {
            let record = match row {
                Row::Offset(offset) => format!("{offset:010} 00000 n\r\n"),
                Row::Free(next, generation) => format!("{next:010} {generation:05} f\r\n"),
                Row::Compressed(..) => panic!("object {n} is compressed"),
            };
            text.push_str(&format!("{n} 1\n{record}"));
        }
        text.push_str(&format!("trailer\n<<{trailer}>>\nstartxref\n{start}\n%%EOF\n"));
        self.out.extend_from_slice(text.as_bytes());
        start
    }

    /// Cross-reference stream object `number` with `W [1 4 2]`, without the
    /// `startxref` tail; returns its offset.
    pub fn xref_stream_object(&mut self, number: u32, trailer: &str) -> usize {
        let start = self.out.len();
        self.pending.insert(number, Row::Offset(start));
        let mut rows = Vec::new();
        let mut index = Vec::new();
        for (n, row) in self.take_rows() {
            let (kind, f2, f3): (u8, u32, u16) = match row {
                Row::Offset(offset) => (1, offset as u32, 0),
                Row::Compressed(stream, i) => (2, stream, i as u16),
                Row::Free(next, generation) => (0, next, generation),
            };
            rows.push(kind);
            rows.extend_from_slice(&f2.to_be_bytes());
            rows.extend_from_slice(&f3.to_be_bytes());
            index.push(format!("{n} 1"));
        }
        let dict = format!("/Type/XRef/W[1 4 2]/Index[{}]{trailer}", index.join(" "));
        self.write_stream(number, &dict, &rows);
        start
    }

    /// Cross-reference stream section; returns its offset.
    pub fn xref_stream(&mut self, number: u32, trailer: &str) -> usize {
        let start = self.xref_stream_object(number, trailer);
        self.out
            .extend_from_slice(format!("startxref\n{start}\n%%EOF\n").as_bytes());
        start
    }

    pub fn finish(&self) -> Vec<u8> {
        self.out.clone()
    }
}

pub const CONTENT: &[u8] =
    b"q 1 0 0 1 50 50 cm /Im1 Do Q\nBT /F1 12 Tf (Hello) Tj ET\n0 0 m 10 10 l S";

/// Catalog, page tree, one page with a content stream, and one object
/// nothing refers to.
pub fn simple_pdf(version: &str) -> Vec<u8> {
    let mut b = PdfBuilder::new(version);
    b.object(1, "<</Type/Catalog/Pages 2 0 R>>")
        .object(2, "<</Type/Pages/Kids[3 0 R]/Count 1>>")
        .object(
            3,
            "<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]/Contents 4 0 R>>",
        )
        .stream(4, "", CONTENT)
        .object(5, "(orphan)");
    b.xref_table("/Size 6/Root 1 0 R");
    b.finish()
}
