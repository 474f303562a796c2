//! ASCIIHexDecode and ASCII85Decode.

use crate::error::{PdfError, Result};

/// Decode ASCII85 data. Accepts the `<~` prefix, `z` shorthand, embedded
/// whitespace and a missing `~>` terminator.
pub fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let data = match data.iter().position(|&b| b == b'~') {
        Some(pos) => &data[..pos],
        None => data,
    };

    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut n = 0;
    for &b in data {
        match b {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x00' | b'\x0c' => {}
            b'z' if n == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[n] = b - b'!';
                n += 1;
                if n == 5 {
                    out.extend_from_slice(&group_value(&group)?.to_be_bytes());
                    n = 0;
                }
            }
            other => {
                return Err(PdfError::DecodeError(format!(
                    "invalid ASCII85 byte {other:#04x}"
                )));
            }
        }
    }
    if n == 1 {
        return Err(PdfError::DecodeError("truncated ASCII85 group".into()));
    }
    if n > 0 {
        for slot in group.iter_mut().skip(n) {
            *slot = b'u' - b'!';
        }
        let bytes = group_value(&group)?.to_be_bytes();
        out.extend_from_slice(&bytes[..n - 1]);
    }
    Ok(out)
}

fn group_value(group: &[u8; 5]) -> Result<u32> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + digit as u64);
    u32::try_from(value).map_err(|_| PdfError::DecodeError("ASCII85 group overflow".into()))
}

/// Encode as ASCII85 with the `~>` terminator.
pub fn ascii85_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 2);
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(word);
        if chunk.len() == 4 && value == 0 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        for slot in digits.iter_mut().rev() {
            *slot = (value % 85) as u8 + b'!';
            value /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode ASCIIHex data up to `>`; an odd final digit is padded with 0.
pub fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;
    for &b in data {
        if b == b'>' {
            break;
        }
        if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x00' | b'\x0c') {
            continue;
        }
        let nibble = hex_nibble(b)
            .ok_or_else(|| PdfError::DecodeError(format!("invalid hex digit {b:#04x}")))?;
        match pending.take() {
            Some(high) => out.push((high << 4) | nibble),
            None => pending = Some(nibble),
        }
    }
    if let Some(high) = pending {
        out.push(high << 4);
    }
    Ok(out)
}

pub fn ascii_hex_encode(data: &[u8]) -> Vec<u8> {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        out.push(DIGITS[(b >> 4) as usize]);
        out.push(DIGITS[(b & 0x0f) as usize]);
    }
    out.push(b'>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii85_known_values() {
        assert_eq!(
            ascii85_decode(b"9jqo^BlbD-BleB1DJ+*+F(f,q").unwrap(),
            b"Man is distinguished"
        );
        assert_eq!(ascii85_decode(b"<~E,9)oF*2M7/c~>").unwrap(), b"pleasure.");
        assert_eq!(
            ascii85_decode(b"zE,9)oF*2M7/c~>").unwrap(),
            b"\0\0\0\0pleasure."
        );
    }

    #[test]
    fn test_ascii85_encode_decodes_back() {
        let data = b"\0\0\0\0pleasure.";
        assert_eq!(ascii85_encode(data), b"zE,9)oF*2M7/c~>");
        assert_eq!(ascii85_decode(&ascii85_encode(data)).unwrap(), data);
    }

    #[test]
    fn test_ascii_hex() {
        assert_eq!(ascii_hex_decode(b"61 62 6>").unwrap(), b"ab`");
        assert_eq!(ascii_hex_encode(b"ab"), b"6162>");
        assert!(ascii_hex_decode(b"6G>").is_err());
    }
}
