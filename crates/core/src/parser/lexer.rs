//! PDF tokenizer.
//!
//! Splits a byte buffer into lexemes: the single-byte delimiters
//! `( ) < > [ ] { } /` and runs of regular bytes. Whitespace and `%`
//! comments are skipped. Composite lexemes (strings, hex strings, names)
//! are left to the parser, which continues reading raw bytes from the
//! cursor right after the opening delimiter.

use super::cursor::{ByteCursor, DELIMITERS, EOL, TOKEN_END, WHITESPACE};

/// A lexeme and the byte offset where it starts.
///
/// An empty token marks the end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub pos: usize,
    pub bytes: &'a [u8],
}

impl<'a> Token<'a> {
    pub fn is_end(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn end(&self) -> usize {
        self.pos + self.bytes.len()
    }

    pub fn is(&self, lexeme: &[u8]) -> bool {
        self.bytes == lexeme
    }

    /// True for a single delimiter byte.
    pub fn is_delimiter(&self) -> bool {
        self.bytes.len() == 1 && DELIMITERS.contains(self.bytes[0]) && self.bytes[0] != b'%'
    }

    /// Parse as a non-negative integer without sign or fraction.
    pub fn as_unsigned(&self) -> Option<u64> {
        if self.bytes.is_empty() || !self.bytes.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(self.bytes).ok()?.parse().ok()
    }
}

/// Tokenizer with a LIFO pushback list.
pub struct Lexer<'a> {
    cursor: ByteCursor<'a>,
    pushback: Vec<Token<'a>>,
    last_end: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        let cursor = ByteCursor::at(data, pos);
        let last_end = cursor.pos();
        Self {
            cursor,
            pushback: Vec::new(),
            last_end,
        }
    }

    /// Next lexeme, or the empty sentinel at end of input.
    pub fn next_token(&mut self) -> Token<'a> {
        if let Some(token) = self.pushback.pop() {
            self.last_end = token.end();
            return token;
        }
        let token = self.scan();
        self.last_end = token.end();
        token
    }

    fn scan(&mut self) -> Token<'a> {
        loop {
            self.cursor.skip_while(WHITESPACE, None);
            let pos = self.cursor.pos();
            let Ok(b) = self.cursor.peek_byte() else {
                return Token { pos, bytes: &[] };
            };
            if b == b'%' {
                self.cursor.skip_until(EOL, None);
                continue;
            }
            if DELIMITERS.contains(b) {
                let bytes = &self.cursor.data()[pos..pos + 1];
                self.cursor.set_pos(pos + 1);
                return Token { pos, bytes };
            }
            let bytes = self.cursor.read_until(TOKEN_END, None);
            return Token { pos, bytes };
        }
    }

    /// Un-read a token. Several tokens must be pushed in reverse order of
    /// acquisition.
    pub fn push_back(&mut self, token: Token<'a>) {
        self.pushback.push(token);
    }

    pub fn has_pushback(&self) -> bool {
        !self.pushback.is_empty()
    }

    /// End offset of the most recently consumed lexeme.
    pub fn last_end(&self) -> usize {
        self.last_end
    }

    pub(crate) fn set_last_end(&mut self, pos: usize) {
        self.last_end = pos;
    }

    /// Raw access for sub-readers that consume bytes rather than tokens.
    ///
    /// Only meaningful while the pushback list is empty.
    pub fn cursor(&mut self) -> &mut ByteCursor<'a> {
        &mut self.cursor
    }

    /// Discard pushback and continue scanning from `pos`.
    pub fn seek(&mut self, pos: usize) {
        self.pushback.clear();
        self.cursor.set_pos(pos);
        self.last_end = self.cursor.pos();
    }

    /// Offset of the next unread byte, accounting for pushback.
    pub fn tell(&self) -> usize {
        self.pushback
            .last()
            .map_or(self.cursor.pos(), |token| token.pos)
    }

    pub fn data(&self) -> &'a [u8] {
        self.cursor.data()
    }
}
