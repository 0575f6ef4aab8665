//! Benchmarks for corsairpsu
//!
//! Run with: cargo bench

use std::hint::black_box;

use corsairpsu::hid::{Command, Frame};
use corsairpsu::linear11::{self, scale};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// Benchmark LINEAR11 decoding
///
/// Every numeric sensor read goes through this.
fn bench_linear11(c: &mut Criterion) {
    let words: Vec<u16> = (0..1024u32).map(|i| (i * 64 + 13) as u16).collect();

    let mut group = c.benchmark_group("linear11");
    group.throughput(Throughput::Elements(words.len() as u64));

    group.bench_function("decode_milli", |b| {
        b.iter(|| {
            for &w in black_box(&words) {
                black_box(linear11::decode(w, scale::MILLI));
            }
        })
    });

    // Compare with the float formula
    group.bench_function("float_reference", |b| {
        b.iter(|| {
            for &w in black_box(&words) {
                let value = linear11::mantissa(w) as f64 * 2f64.powi(linear11::exponent(w));
                black_box((value * 1000.0).floor() as i64);
            }
        })
    });

    group.finish();
}

/// Benchmark command frame construction
fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");

    group.bench_function("command", |b| {
        b.iter(|| Frame::command(black_box(Command::read(0x8D))))
    });

    let mut frame = Frame::zeroed();
    group.bench_function("set_command_reuse", |b| {
        b.iter(|| frame.set_command(black_box(Command::read(0x8D))))
    });

    group.finish();
}

criterion_group!(benches, bench_linear11, bench_frame);
criterion_main!(benches);
