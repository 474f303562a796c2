//! Benchmarks for FlateDecode with PNG predictors.
//!
//! Benchmark groups:
//! - `flate_predictor_decode`: inflate plus un-prediction of image-like rows
//! - `flate_predictor_encode`: per-row selector choice plus deflate

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use vellum_core::codec::flate::{self, PredictorParams};
use vellum_core::Dictionary;

/// RGB rows with smooth gradients and some noise, similar to scanned images.
fn generate_rows(columns: usize, rows: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(columns * rows * 3);
    let mut noise = 0x2545_f491u32;
    for y in 0..rows {
        for x in 0..columns {
            noise ^= noise << 13;
            noise ^= noise >> 17;
            noise ^= noise << 5;
            let jitter = (noise & 0x07) as usize;
            data.push(((x + jitter) % 256) as u8);
            data.push(((y * 2 + jitter) % 256) as u8);
            data.push(((x + y) % 256) as u8);
        }
    }
    data
}

fn params(predictor: i64, columns: usize) -> PredictorParams {
    let mut parms = Dictionary::new();
    parms.set("Predictor", predictor);
    parms.set("Colors", 3i64);
    parms.set("Columns", columns as i64);
    PredictorParams::from_dict(Some(&parms)).expect("valid predictor parameters")
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("flate_predictor_decode");

    for columns in [256usize, 1024, 4096] {
        let rows = 256;
        let data = generate_rows(columns, rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        for predictor in [12i64, 15] {
            let params = params(predictor, columns);
            let encoded = flate::encode(&data, &params).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("predictor_{predictor}"), columns),
                &encoded,
                |b, encoded| b.iter(|| flate::decode(black_box(encoded), &params).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("flate_predictor_encode");

    for columns in [256usize, 1024] {
        let data = generate_rows(columns, 256);
        group.throughput(Throughput::Bytes(data.len() as u64));
        let params = params(15, columns);
        group.bench_with_input(BenchmarkId::new("optimal", columns), &data, |b, data| {
            b.iter(|| flate::encode(black_box(data), &params).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
