//! Row-building throughput benchmarks across the ASCII and binary wire
//! encodings, measuring latency and throughput as the row count scales.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ilp_sender::buffer::array::NdArrayF64;
use ilp_sender::buffer::decimal::DecimalValue;
use ilp_sender::{Buffer, ProtocolVersion};

fn build_ascii_rows(n: usize) -> Buffer {
    let mut buffer = Buffer::new(1 << 20, 1 << 28, 127);
    for i in 0..n {
        buffer.table("weather").unwrap();
        buffer.symbol("city", "london").unwrap();
        buffer.column_f64("temp", 23.5 + i as f64).unwrap();
        buffer.column_long("humidity", 42 + i as i64).unwrap();
        buffer.at_nanos(1_000_000_000 + i as i64).unwrap();
    }
    buffer
}

fn build_binary_rows(n: usize) -> Buffer {
    let mut buffer = Buffer::new(1 << 20, 1 << 28, 127);
    buffer.set_protocol_version(ProtocolVersion::V3);
    let array = NdArrayF64::new(vec![3], vec![1.2, 2.6, 3.1]).unwrap();
    let price = DecimalValue::new(12345, 2).unwrap();
    for i in 0..n {
        buffer.table("trades").unwrap();
        buffer.column_f64("qty", 10.0 + i as f64).unwrap();
        buffer.column_array_f64("signal", &array).unwrap();
        buffer.column_decimal("price", &price).unwrap();
        buffer.at_nanos(1_000_000_000 + i as i64).unwrap();
    }
    buffer
}

fn benchmark_row_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_building");

    for rows in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*rows as u64));

        group.bench_with_input(BenchmarkId::new("ascii", rows), rows, |b, &rows| {
            b.iter(|| black_box(build_ascii_rows(rows)));
        });

        group.bench_with_input(BenchmarkId::new("binary_v3", rows), rows, |b, &rows| {
            b.iter(|| black_box(build_binary_rows(rows)));
        });
    }

    group.finish();
}

fn benchmark_to_vec(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_to_vec");
    let buffer = build_ascii_rows(10_000);
    group.throughput(Throughput::Bytes(buffer.length() as u64));
    group.bench_function("copy_10k_rows", |b| {
        b.iter(|| black_box(buffer.to_vec()));
    });
    group.finish();
}

criterion_group!(benches, benchmark_row_building, benchmark_to_vec);
criterion_main!(benches);
