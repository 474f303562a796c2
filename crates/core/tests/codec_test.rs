//! Stream filter tests.

use vellum_core::codec::flate::{self, PredictorParams};
use vellum_core::codec::{Filter, decode_stream, encode_stream};
use vellum_core::{Dictionary, PdfError, PdfObject};

fn parms(predictor: i64, columns: i64, colors: i64) -> Dictionary {
    let mut d = Dictionary::new();
    d.set("Predictor", predictor);
    d.set("Columns", columns);
    d.set("Colors", colors);
    d
}

#[test]
fn test_png_up_rows_from_fixture() {
    // Two rows of three bytes, both with the Up selector.
    let predicted = hex::decode("02010203020101 01".replace(' ', "")).unwrap();
    let compressed = flate::deflate(&predicted).unwrap();
    let params = PredictorParams::png(12, 3);
    assert_eq!(
        flate::decode(&compressed, &params).unwrap(),
        vec![1, 2, 3, 2, 3, 4]
    );
}

#[test]
fn test_optimal_predictor_round_trip() {
    let params = PredictorParams::from_dict(Some(&parms(15, 5, 3))).unwrap();
    assert_eq!(params.row_len().unwrap(), 15);
    let data: Vec<u8> = (0..15 * 7).map(|i| ((i * 37) % 251) as u8).collect();
    let encoded = flate::encode(&data, &params).unwrap();
    assert_eq!(flate::decode(&encoded, &params).unwrap(), data);
}

#[test]
fn test_each_fixed_predictor_round_trips() {
    let data: Vec<u8> = (0u8..64).map(|i| i.wrapping_mul(13) ^ 0x5a).collect();
    for predictor in 10..=14 {
        let params = PredictorParams::png(predictor, 8);
        let encoded = flate::encode(&data, &params).unwrap();
        assert_eq!(flate::decode(&encoded, &params).unwrap(), data, "predictor {predictor}");
    }
}

#[test]
fn test_unsupported_predictors() {
    let compressed = flate::deflate(b"abc").unwrap();
    assert!(matches!(
        flate::decode(&compressed, &PredictorParams::png(2, 1)),
        Err(PdfError::Unsupported(_))
    ));
    assert!(matches!(
        flate::decode(&compressed, &PredictorParams::png(7, 1)),
        Err(PdfError::Unsupported(_))
    ));
}

#[test]
fn test_bad_row_selector() {
    let compressed = flate::deflate(&[9, 1, 2]).unwrap();
    assert!(matches!(
        flate::decode(&compressed, &PredictorParams::png(12, 2)),
        Err(PdfError::DecodeError(_))
    ));
}

#[test]
fn test_oversized_predictor_rows() {
    let params = PredictorParams::from_dict(Some(&parms(12, 1 << 62, 4))).unwrap();
    assert!(matches!(params.row_len(), Err(PdfError::DecodeError(_))));
    let compressed = flate::deflate(&[0, 1, 2]).unwrap();
    assert!(matches!(
        flate::decode(&compressed, &params),
        Err(PdfError::DecodeError(_))
    ));

    let wide = PredictorParams::png(12, 1 << 40);
    assert!(matches!(
        flate::decode(&compressed, &wide),
        Err(PdfError::DecodeError(_))
    ));
}

#[test]
fn test_corrupt_deflate_data() {
    assert!(matches!(
        flate::inflate(b"not zlib at all"),
        Err(PdfError::DecodeError(_))
    ));
}

#[test]
fn test_filter_chain_order() {
    let mut dict = Dictionary::new();
    dict.set(
        "Filter",
        PdfObject::Array(vec![
            PdfObject::name("ASCIIHexDecode"),
            PdfObject::name("FlateDecode"),
        ]),
    );
    let payload = b"BT /F1 12 Tf (chained) Tj ET".repeat(4);
    let encoded = encode_stream(&dict, &payload).unwrap();
    assert!(encoded.iter().all(|b| b.is_ascii_hexdigit() || *b == b'>'));
    assert_eq!(decode_stream(&dict, &encoded).unwrap(), payload);
}

#[test]
fn test_ascii85_filter() {
    let mut dict = Dictionary::new();
    dict.set("Filter", PdfObject::name("A85"));
    assert_eq!(decode_stream(&dict, b"87cURD]i,\"Ebo7~>").unwrap(), b"Hello World");
}

#[test]
fn test_unknown_filter() {
    assert!(matches!(
        Filter::from_name("LZWDecode", None),
        Err(PdfError::Unsupported(_))
    ));
}
