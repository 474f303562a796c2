//! Byte cursor over an immutable buffer.
//!
//! Every tokenizer and raw-byte sub-reader in the crate reads through a
//! `ByteCursor`. Character classes are expressed as [`ByteMask`] tables
//! built at compile time.

use crate::error::{PdfError, Result};

/// A 256-entry membership table for byte classes.
#[derive(Clone, Copy)]
pub struct ByteMask([bool; 256]);

impl ByteMask {
    pub const fn from_bytes(bytes: &[u8]) -> Self {
        let mut table = [false; 256];
        let mut i = 0;
        while i < bytes.len() {
            table[bytes[i] as usize] = true;
            i += 1;
        }
        Self(table)
    }

    pub const fn union(self, other: Self) -> Self {
        let mut table = self.0;
        let mut i = 0;
        while i < 256 {
            table[i] = table[i] || other.0[i];
            i += 1;
        }
        Self(table)
    }

    pub const fn invert(self) -> Self {
        let mut table = self.0;
        let mut i = 0;
        while i < 256 {
            table[i] = !table[i];
            i += 1;
        }
        Self(table)
    }

    #[inline]
    pub const fn contains(&self, b: u8) -> bool {
        self.0[b as usize]
    }
}

impl std::fmt::Debug for ByteMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members: Vec<u8> = (0..=255u8).filter(|&b| self.contains(b)).collect();
        f.debug_tuple("ByteMask").field(&members).finish()
    }
}

/// PDF whitespace: NUL, HT, LF, FF, CR, SP.
pub const WHITESPACE: ByteMask = ByteMask::from_bytes(b"\x00\t\n\x0c\r ");
/// Bytes that end a regular token.
pub const DELIMITERS: ByteMask = ByteMask::from_bytes(b"()<>[]{}/%");
pub const TOKEN_END: ByteMask = WHITESPACE.union(DELIMITERS);
pub const EOL: ByteMask = ByteMask::from_bytes(b"\r\n");
pub const DIGITS: ByteMask = ByteMask::from_bytes(b"0123456789");

/// Cursor over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// True if reading `n` more bytes would run past the end of the buffer.
    pub fn would_exceed(&self, n: usize) -> bool {
        self.pos.checked_add(n).is_none_or(|end| end > self.data.len())
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or(PdfError::UnexpectedEof)
    }

    /// Byte `offset` positions ahead of the cursor, if any.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.would_exceed(n) {
            return Err(PdfError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Step back one byte.
    pub fn retreat(&mut self) -> Result<()> {
        if self.pos == 0 {
            return Err(PdfError::syntax(0, "cannot retreat before start of buffer"));
        }
        self.pos -= 1;
        Ok(())
    }

    /// Read up to the next CR, LF or CRLF and consume the terminator.
    ///
    /// The returned slice excludes the terminator. The last line of a buffer
    /// need not be terminated.
    pub fn read_line(&mut self) -> Result<&'a [u8]> {
        if self.is_at_end() {
            return Err(PdfError::UnexpectedEof);
        }
        let line = self.read_until(EOL, None);
        match self.data.get(self.pos) {
            Some(b'\r') => {
                self.pos += 1;
                if self.data.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
        Ok(line)
    }

    fn scan(&mut self, mask: ByteMask, member: bool, max: Option<usize>) -> &'a [u8] {
        let start = self.pos;
        let limit = max.map_or(self.data.len(), |m| (start + m).min(self.data.len()));
        while self.pos < limit && mask.contains(self.data[self.pos]) == member {
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Read bytes while they belong to `mask`.
    pub fn read_while(&mut self, mask: ByteMask, max: Option<usize>) -> &'a [u8] {
        self.scan(mask, true, max)
    }

    /// Read bytes until one belongs to `mask`.
    pub fn read_until(&mut self, mask: ByteMask, max: Option<usize>) -> &'a [u8] {
        self.scan(mask, false, max)
    }

    pub fn skip_while(&mut self, mask: ByteMask, max: Option<usize>) -> usize {
        self.scan(mask, true, max).len()
    }

    pub fn skip_until(&mut self, mask: ByteMask, max: Option<usize>) -> usize {
        self.scan(mask, false, max).len()
    }

    /// Position of the next occurrence of `needle` at or after the cursor.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || self.remaining().len() < needle.len() {
            return None;
        }
        self.remaining()
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|i| self.pos + i)
    }
}

/// Position of the last occurrence of `needle` in `data`.
pub fn rfind(data: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || data.len() < needle.len() {
        return None;
    }
    data.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_line_variants() {
        let mut cursor = ByteCursor::new(b"one\rtwo\r\nthree\nfour");
        assert_eq!(cursor.read_line().unwrap(), b"one");
        assert_eq!(cursor.read_line().unwrap(), b"two");
        assert_eq!(cursor.read_line().unwrap(), b"three");
        assert_eq!(cursor.read_line().unwrap(), b"four");
        assert!(cursor.read_line().is_err());
    }

    #[test]
    fn test_read_while_respects_max() {
        let mut cursor = ByteCursor::new(b"12345abc");
        assert_eq!(cursor.read_while(DIGITS, Some(3)), b"123");
        assert_eq!(cursor.read_while(DIGITS, None), b"45");
        assert_eq!(cursor.read_until(DIGITS, None), b"abc");
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_bounds() {
        let mut cursor = ByteCursor::new(b"ab");
        assert!(!cursor.would_exceed(2));
        assert!(cursor.would_exceed(3));
        assert!(cursor.read_bytes(3).is_err());
        assert_eq!(cursor.read_byte().unwrap(), b'a');
        cursor.retreat().unwrap();
        assert_eq!(cursor.read_bytes(2).unwrap(), b"ab");
        assert!(cursor.read_byte().is_err());
        assert!(cursor.peek_byte().is_err());
    }

    #[test]
    fn test_masks() {
        assert!(WHITESPACE.contains(b'\x0c'));
        assert!(TOKEN_END.contains(b'%'));
        assert!(!TOKEN_END.contains(b'a'));
        assert!(DIGITS.invert().contains(b'x'));
    }

    #[test]
    fn test_rfind() {
        assert_eq!(rfind(b"%%EOF\n%%EOF", b"%%EOF"), Some(6));
        assert_eq!(rfind(b"abc", b"xyz"), None);
    }
}
