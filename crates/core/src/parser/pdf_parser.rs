//! Recursive-descent PDF object parser.

use super::cursor::{TOKEN_END, WHITESPACE};
use super::lexer::{Lexer, Token};
use crate::error::{PdfError, Result};
use crate::model::objects::{Dictionary, ObjRef, PdfObject, name_from_bytes};

/// Parses PDF objects from a byte buffer.
pub struct PdfParser<'a> {
    lexer: Lexer<'a>,
    allow_bare_tokens: bool,
}

impl<'a> PdfParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            lexer: Lexer::at(data, pos),
            allow_bare_tokens: false,
        }
    }

    /// Parser for content streams: unknown keywords become `Token` values.
    pub fn content(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            allow_bare_tokens: true,
        }
    }

    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    pub fn tell(&self) -> usize {
        self.lexer.tell()
    }

    pub fn seek(&mut self, pos: usize) {
        self.lexer.seek(pos);
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.lexer.next_token()
    }

    /// Consume the keyword `kw` or fail.
    pub fn expect_keyword(&mut self, kw: &[u8]) -> Result<()> {
        let token = self.lexer.next_token();
        if token.is(kw) {
            Ok(())
        } else {
            Err(PdfError::syntax(
                token.pos,
                format!(
                    "expected '{}', found '{}'",
                    String::from_utf8_lossy(kw),
                    String::from_utf8_lossy(token.bytes)
                ),
            ))
        }
    }

    /// Consume an unsigned integer token or fail.
    pub fn expect_unsigned(&mut self) -> Result<u64> {
        let token = self.lexer.next_token();
        token.as_unsigned().ok_or_else(|| {
            PdfError::syntax(
                token.pos,
                format!(
                    "expected unsigned integer, found '{}'",
                    String::from_utf8_lossy(token.bytes)
                ),
            )
        })
    }

    /// Parse one object. End of input is an error.
    pub fn parse_object(&mut self) -> Result<PdfObject> {
        let token = self.lexer.next_token();
        if token.is_end() {
            return Err(PdfError::UnexpectedEof);
        }
        self.parse_from(token, true)
    }

    /// Next object with its byte span, or `None` at end of input.
    pub fn next_object(&mut self) -> Result<Option<(usize, PdfObject, usize)>> {
        let token = self.lexer.next_token();
        if token.is_end() {
            return Ok(None);
        }
        let start = token.pos;
        let obj = self.parse_from(token, true)?;
        Ok(Some((start, obj, self.lexer.last_end())))
    }

    fn parse_from(&mut self, token: Token<'a>, top_level: bool) -> Result<PdfObject> {
        match token.bytes {
            b"(" => self.parse_literal_string(),
            b"<" => {
                if self.lexer.cursor().peek_byte().ok() == Some(b'<') {
                    self.lexer.cursor().read_byte()?;
                    self.parse_dictionary(token.pos)
                } else {
                    self.parse_hex_string(token.pos)
                }
            }
            b"[" => self.parse_array(token.pos),
            b"/" => Ok(PdfObject::Name(self.parse_name())),
            b"true" => Ok(PdfObject::Bool(true)),
            b"false" => Ok(PdfObject::Bool(false)),
            b"null" => Ok(PdfObject::Null),
            bytes if is_numeric(bytes) => self.parse_number_or_ref(token),
            bytes if top_level && self.allow_bare_tokens && !token.is_delimiter() => {
                Ok(PdfObject::Token(bytes.to_vec()))
            }
            bytes => Err(PdfError::syntax(
                token.pos,
                format!("unexpected token '{}'", String::from_utf8_lossy(bytes)),
            )),
        }
    }

    fn parse_number_or_ref(&mut self, token: Token<'a>) -> Result<PdfObject> {
        if let Some(number) = token.as_unsigned() {
            let second = self.lexer.next_token();
            if let Some(generation) = second.as_unsigned() {
                let third = self.lexer.next_token();
                if third.is(b"R") {
                    let number = u32::try_from(number)
                        .map_err(|_| PdfError::syntax(token.pos, "object number out of range"))?;
                    let generation = u16::try_from(generation).map_err(|_| {
                        PdfError::syntax(second.pos, "generation number out of range")
                    })?;
                    return Ok(PdfObject::Ref(ObjRef::new(number, generation)));
                }
                self.lexer.push_back(third);
            }
            self.lexer.push_back(second);
            // Restore the end of the number itself for span reporting.
            self.lexer.set_last_end(token.end());
        }
        parse_number(token)
    }

    fn parse_array(&mut self, start: usize) -> Result<PdfObject> {
        let mut items = Vec::new();
        loop {
            let token = self.lexer.next_token();
            if token.is_end() {
                return Err(PdfError::syntax(start, "unterminated array"));
            }
            if token.is(b"]") {
                return Ok(PdfObject::Array(items));
            }
            items.push(self.parse_from(token, false)?);
        }
    }

    fn parse_dictionary(&mut self, start: usize) -> Result<PdfObject> {
        let mut dict = Dictionary::new();
        loop {
            let token = self.lexer.next_token();
            if token.is_end() {
                return Err(PdfError::syntax(start, "unterminated dictionary"));
            }
            if token.is(b">") {
                let cursor = self.lexer.cursor();
                if cursor.peek_byte().ok() == Some(b'>') {
                    cursor.read_byte()?;
                    let end = cursor.pos();
                    self.lexer.set_last_end(end);
                    return Ok(PdfObject::Dict(dict));
                }
                return Err(PdfError::syntax(token.pos, "expected '>>'"));
            }
            if !token.is(b"/") {
                return Err(PdfError::syntax(
                    token.pos,
                    format!(
                        "dictionary key is not a name: '{}'",
                        String::from_utf8_lossy(token.bytes)
                    ),
                ));
            }
            let key = self.parse_name();
            let value_token = self.lexer.next_token();
            if value_token.is_end() || value_token.is(b">") {
                return Err(PdfError::syntax(value_token.pos, "dictionary key without value"));
            }
            let value = self.parse_from(value_token, false)?;
            dict.set(key, value);
        }
    }

    /// Name body after `/`, with `#xx` escapes decoded.
    fn parse_name(&mut self) -> String {
        let cursor = self.lexer.cursor();
        let raw = cursor.read_until(TOKEN_END, None);
        let end = cursor.pos();
        self.lexer.set_last_end(end);

        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#'
                && let (Some(h), Some(l)) = (
                    raw.get(i + 1).copied().and_then(hex_value),
                    raw.get(i + 2).copied().and_then(hex_value),
                )
            {
                bytes.push((h << 4) | l);
                i += 3;
                continue;
            }
            bytes.push(raw[i]);
            i += 1;
        }
        name_from_bytes(&bytes)
    }

    fn parse_literal_string(&mut self) -> Result<PdfObject> {
        let cursor = self.lexer.cursor();
        let mut out = Vec::new();
        let mut depth = 1usize;
        loop {
            let b = cursor.read_byte()?;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\r' => {
                    if cursor.peek_byte().ok() == Some(b'\n') {
                        cursor.read_byte()?;
                    }
                    out.push(b'\n');
                }
                b'\\' => {
                    let esc = cursor.read_byte()?;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'(' | b')' | b'\\' => out.push(esc),
                        b'\r' => {
                            if cursor.peek_byte().ok() == Some(b'\n') {
                                cursor.read_byte()?;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u32;
                            for _ in 0..2 {
                                match cursor.peek_byte() {
                                    Ok(d @ b'0'..=b'7') => {
                                        cursor.read_byte()?;
                                        value = value * 8 + (d - b'0') as u32;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xff) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }
        let end = cursor.pos();
        self.lexer.set_last_end(end);
        Ok(PdfObject::String(out))
    }

    fn parse_hex_string(&mut self, start: usize) -> Result<PdfObject> {
        let cursor = self.lexer.cursor();
        let mut out = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            let b = cursor
                .read_byte()
                .map_err(|_| PdfError::syntax(start, "unterminated hex string"))?;
            if b == b'>' {
                break;
            }
            if WHITESPACE.contains(b) {
                continue;
            }
            let nibble = hex_value(b).ok_or_else(|| {
                PdfError::syntax(cursor.pos() - 1, format!("invalid hex digit {b:#04x}"))
            })?;
            match pending.take() {
                Some(high) => out.push((high << 4) | nibble),
                None => pending = Some(nibble),
            }
        }
        if let Some(high) = pending {
            out.push(high << 4);
        }
        let end = cursor.pos();
        self.lexer.set_last_end(end);
        Ok(PdfObject::HexString(out))
    }

    /// Skip the end-of-line that follows a `stream` keyword.
    pub fn skip_stream_eol(&mut self) -> Result<usize> {
        self.lexer.seek(self.lexer.last_end());
        let cursor = self.lexer.cursor();
        match cursor.peek_byte() {
            Ok(b'\r') => {
                cursor.read_byte()?;
                if cursor.peek_byte().ok() == Some(b'\n') {
                    cursor.read_byte()?;
                }
            }
            Ok(b'\n') => {
                cursor.read_byte()?;
            }
            _ => {}
        }
        Ok(cursor.pos())
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// `[+-]digits[.digits]` or `[+-].digits`.
pub(crate) fn is_numeric(bytes: &[u8]) -> bool {
    let body = match bytes.first() {
        Some(b'+' | b'-') => &bytes[1..],
        _ => bytes,
    };
    let mut seen_digit = false;
    let mut seen_dot = false;
    for &b in body {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

fn parse_number(token: Token<'_>) -> Result<PdfObject> {
    let text = std::str::from_utf8(token.bytes)
        .map_err(|_| PdfError::syntax(token.pos, "invalid number"))?;
    if !text.contains('.')
        && let Ok(n) = text.parse::<i64>()
    {
        return Ok(PdfObject::Int(n));
    }
    let normalized = text.strip_prefix('+').unwrap_or(text);
    let value: f64 = normalized
        .parse()
        .map_err(|_| PdfError::syntax(token.pos, format!("invalid number '{text}'")))?;
    Ok(PdfObject::number(value))
}
