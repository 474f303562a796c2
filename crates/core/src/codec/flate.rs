//! FlateDecode with PNG predictors.

use crate::error::{PdfError, Result};
use crate::model::objects::Dictionary;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Predictor settings from a `DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn png(predictor: i64, columns: usize) -> Self {
        Self {
            predictor,
            columns,
            ..Self::default()
        }
    }

    pub fn from_dict(parms: Option<&Dictionary>) -> Result<Self> {
        let Some(parms) = parms else {
            return Ok(Self::default());
        };
        let int = |key: &str, default: i64| -> Result<i64> {
            match parms.get(key) {
                Some(obj) => obj.as_int(),
                None => Ok(default),
            }
        };
        let positive = |key: &str, default: i64| -> Result<usize> {
            let v = int(key, default)?;
            usize::try_from(v)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| PdfError::DecodeError(format!("invalid {key} {v}")))
        };
        Ok(Self {
            predictor: int("Predictor", 1)?,
            colors: positive("Colors", 1)?,
            bits_per_component: positive("BitsPerComponent", 8)?,
            columns: positive("Columns", 1)?,
        })
    }

    pub fn is_png(&self) -> bool {
        (10..=15).contains(&self.predictor)
    }

    fn check(&self) -> Result<()> {
        match self.predictor {
            1 => Ok(()),
            10..=15 => Ok(()),
            2 => Err(PdfError::Unsupported("TIFF predictor 2".into())),
            other => Err(PdfError::Unsupported(format!("predictor {other}"))),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        std::cmp::max(1, self.colors.saturating_mul(self.bits_per_component) / 8)
    }

    /// Bytes per row, excluding the selector byte.
    pub fn row_len(&self) -> Result<usize> {
        self.colors
            .checked_mul(self.columns)
            .and_then(|n| n.checked_mul(self.bits_per_component))
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| {
                PdfError::DecodeError(format!(
                    "predictor row of {} columns overflows",
                    self.columns
                ))
            })
    }
}

/// Inflate zlib data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::DecodeError(format!("flate: {e}")))?;
    Ok(out)
}

/// Deflate data with zlib framing.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate then undo the predictor.
pub fn decode(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    params.check()?;
    let inflated = inflate(data)?;
    if params.is_png() {
        png_decode(&inflated, params.bytes_per_pixel(), params.row_len()?)
    } else {
        Ok(inflated)
    }
}

/// Apply the predictor then deflate.
pub fn encode(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    params.check()?;
    if params.is_png() {
        let filtered = png_encode(data, params.bytes_per_pixel(), params.row_len()?, params.predictor)?;
        deflate(&filtered)
    } else {
        deflate(data)
    }
}

/// PNG row filter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RowFilter {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl RowFilter {
    pub const ALL: [RowFilter; 5] = [
        RowFilter::None,
        RowFilter::Sub,
        RowFilter::Up,
        RowFilter::Average,
        RowFilter::Paeth,
    ];

    pub fn from_selector(b: u8) -> Option<Self> {
        Self::ALL.get(b as usize).copied()
    }
}

const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

/// Value the filter predicts for byte `i` of `row`, given the reconstructed
/// previous row.
#[inline]
fn prediction(filter: RowFilter, row: &[u8], prev: &[u8], i: usize, bpp: usize) -> u8 {
    let left = if i >= bpp { row[i - bpp] } else { 0 };
    match filter {
        RowFilter::None => 0,
        RowFilter::Sub => left,
        RowFilter::Up => prev[i],
        RowFilter::Average => ((left as u16 + prev[i] as u16) / 2) as u8,
        RowFilter::Paeth => {
            let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
            paeth_predictor(left, prev[i], upper_left)
        }
    }
}

/// Undo PNG row filters. A trailing partial row is dropped.
pub fn png_decode(data: &[u8], bpp: usize, row_len: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if row_len >= data.len() {
        return Err(PdfError::DecodeError(format!(
            "predictor row of {row_len} bytes is longer than the {} bytes of data",
            data.len()
        )));
    }
    let stride = row_len + 1;
    let mut out = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev = vec![0u8; row_len];
    let mut row = vec![0u8; row_len];

    for (n, chunk) in data.chunks_exact(stride).enumerate() {
        let filter = RowFilter::from_selector(chunk[0]).ok_or_else(|| {
            PdfError::DecodeError(format!("invalid PNG row filter {} in row {n}", chunk[0]))
        })?;
        for i in 0..row_len {
            row[i] = chunk[i + 1].wrapping_add(prediction(filter, &row, &prev, i, bpp));
        }
        out.extend_from_slice(&row);
        std::mem::swap(&mut prev, &mut row);
    }
    Ok(out)
}

fn filter_row(filter: RowFilter, row: &[u8], prev: &[u8], bpp: usize, out: &mut Vec<u8>) {
    out.push(filter as u8);
    for i in 0..row.len() {
        out.push(row[i].wrapping_sub(prediction(filter, row, prev, i, bpp)));
    }
}

/// Distance of each byte from zero modulo 256, summed.
fn row_score(filtered: &[u8]) -> u64 {
    filtered
        .iter()
        .map(|&v| if v <= 128 { v as u64 } else { 256 - v as u64 })
        .sum()
}

/// Apply PNG row filters.
///
/// Predictors 10 through 14 use one filter for every row; 15 picks the
/// lowest-scoring filter per row, preferring the lower selector on ties.
/// The input must be a whole number of rows.
pub fn png_encode(data: &[u8], bpp: usize, row_len: usize, predictor: i64) -> Result<Vec<u8>> {
    if row_len == 0 || data.len() % row_len != 0 {
        return Err(PdfError::DecodeError(format!(
            "{} bytes is not a whole number of {row_len}-byte rows",
            data.len()
        )));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let fixed = match predictor {
        10..=14 => RowFilter::from_selector((predictor - 10) as u8),
        15 => None,
        other => return Err(PdfError::Unsupported(format!("predictor {other}"))),
    };

    let mut out = Vec::with_capacity(data.len() + data.len() / row_len);
    let zero = vec![0u8; row_len];
    let mut prev: &[u8] = &zero;
    let mut candidate = Vec::with_capacity(row_len + 1);
    let mut best = Vec::with_capacity(row_len + 1);

    for row in data.chunks_exact(row_len) {
        match fixed {
            Some(filter) => filter_row(filter, row, prev, bpp, &mut out),
            None => {
                let mut best_score = u64::MAX;
                for filter in RowFilter::ALL {
                    candidate.clear();
                    filter_row(filter, row, prev, bpp, &mut candidate);
                    let score = row_score(&candidate[1..]);
                    if score < best_score {
                        best_score = score;
                        std::mem::swap(&mut best, &mut candidate);
                    }
                }
                out.extend_from_slice(&best);
            }
        }
        prev = row;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paeth_predictor() {
        assert_eq!(paeth_predictor(10, 20, 15), 15);
        assert_eq!(paeth_predictor(0, 0, 0), 0);
        assert_eq!(paeth_predictor(100, 0, 0), 100);
    }

    #[test]
    fn test_png_decode_up_rows() {
        // Two rows of three bytes; second row uses Up.
        let data = [0, 1, 2, 3, 2, 1, 1, 1];
        assert_eq!(png_decode(&data, 1, 3).unwrap(), vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_png_decode_rejects_bad_selector() {
        let data = [7, 1, 2, 3];
        assert!(matches!(
            png_decode(&data, 1, 3),
            Err(PdfError::DecodeError(_))
        ));
    }

    #[test]
    fn test_png_decode_ignores_partial_row() {
        let data = [0, 9, 9, 0, 1];
        assert_eq!(png_decode(&data, 1, 2).unwrap(), vec![9, 9]);
    }

    #[test]
    fn test_png_decode_row_longer_than_data() {
        assert!(matches!(
            png_decode(&[0, 1, 2], 1, 4096),
            Err(PdfError::DecodeError(_))
        ));
        assert!(png_decode(&[], 1, 4096).unwrap().is_empty());
        assert!(png_encode(&[], 1, 4096, 15).unwrap().is_empty());
    }

    #[test]
    fn test_optimal_prefers_constant_rows_as_sub() {
        let data = [5u8; 8];
        let encoded = png_encode(&data, 1, 8, 15).unwrap();
        // Sub leaves one 5 and seven zeros; Up on the first row scores 40.
        assert_eq!(encoded[0], RowFilter::Sub as u8);
        assert_eq!(png_decode(&encoded, 1, 8).unwrap(), data);
    }

    #[test]
    fn test_optimal_tie_uses_lowest_selector() {
        let data = [0u8; 4];
        let encoded = png_encode(&data, 1, 4, 15).unwrap();
        assert_eq!(encoded, vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_tiff_predictor_unsupported() {
        let params = PredictorParams::png(2, 4);
        assert!(matches!(
            decode(&deflate(b"abcd").unwrap(), &params),
            Err(PdfError::Unsupported(_))
        ));
    }

    #[test]
    fn test_inflate_corrupt_is_decode_error() {
        assert!(matches!(
            inflate(b"not zlib at all"),
            Err(PdfError::DecodeError(_))
        ));
    }
}
