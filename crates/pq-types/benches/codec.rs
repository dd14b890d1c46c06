//! Benchmarks for binary value encoding and decoding.

#![allow(clippy::unwrap_used, missing_docs)]

use bytes::BytesMut;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pq_protocol::types::oid;
use pq_types::extensions::{POINT_OID, register_geometric};
use pq_types::{FromSql, SqlValue, ToSql, TypeRegistry, decode_value_with, encode_value_with};
use std::hint::black_box;

fn encoded(registry: &TypeRegistry, type_id: u32, value: &SqlValue) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_value_with(registry, type_id, value, &mut buf).unwrap();
    buf.to_vec()
}

/// Benchmark decoding of fixed-width and text scalars.
fn bench_decode_scalar(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_scalar");
    let registry = TypeRegistry::new();

    let int8 = 1_234_567_890_123i64.to_be_bytes();
    group.bench_function("int8", |b| {
        b.iter(|| decode_value_with(&registry, oid::INT8, -1, black_box(&int8)).unwrap())
    });

    let float8 = 3.25f64.to_be_bytes();
    group.bench_function("float8", |b| {
        b.iter(|| decode_value_with(&registry, oid::FLOAT8, -1, black_box(&float8)).unwrap())
    });

    let text = "This is a typical database column value with some content";
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("text", |b| {
        b.iter(|| decode_value_with(&registry, oid::TEXT, -1, black_box(text.as_bytes())).unwrap())
    });

    group.bench_function("bpchar_padded", |b| {
        b.iter(|| decode_value_with(&registry, oid::BPCHAR, 36, black_box(b"abc")).unwrap())
    });

    group.finish();
}

/// Benchmark array decoding (server array layout to `SqlArray`).
fn bench_decode_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_array");
    let registry = TypeRegistry::new();

    for len in [16usize, 1024] {
        let values: Vec<i32> = (0..len as i32).collect();
        let raw = encoded(&registry, oid::INT4_ARRAY, &values.to_sql().unwrap());
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(format!("int4_{len}"), |b| {
            b.iter(|| decode_value_with(&registry, oid::INT4_ARRAY, -1, black_box(&raw)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark parameter encoding.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let registry = TypeRegistry::new();

    let int4 = SqlValue::Int(42);
    group.bench_function("int4", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(8);
            encode_value_with(&registry, oid::INT4, black_box(&int4), &mut buf).unwrap();
            black_box(buf)
        })
    });

    let array = (0..1024i64).collect::<Vec<_>>().to_sql().unwrap();
    group.throughput(Throughput::Elements(1024));
    group.bench_function("int8_array_1024", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(16 * 1024);
            encode_value_with(&registry, oid::INT8_ARRAY, black_box(&array), &mut buf).unwrap();
            black_box(buf)
        })
    });

    group.finish();
}

/// Benchmark registry-backed decoding.
fn bench_registered(c: &mut Criterion) {
    let mut group = c.benchmark_group("registered");
    let registry = TypeRegistry::new();
    register_geometric(&registry);

    let mut raw = BytesMut::new();
    raw.extend_from_slice(&1.0f64.to_be_bytes());
    raw.extend_from_slice(&2.0f64.to_be_bytes());
    group.bench_function("point", |b| {
        b.iter(|| decode_value_with(&registry, POINT_OID, -1, black_box(&raw)).unwrap())
    });

    let unknown = [0u8; 32];
    group.bench_function("unknown_passthrough", |b| {
        b.iter(|| decode_value_with(&registry, 99_999, -1, black_box(&unknown)).unwrap())
    });

    group.finish();
}

/// Benchmark host conversions.
fn bench_from_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_sql");

    let value = vec![1i32, 2, 3, 4].to_sql().unwrap();
    group.bench_function("vec_i32", |b| {
        b.iter(|| Vec::<i32>::from_sql(black_box(&value)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_scalar,
    bench_decode_array,
    bench_encode,
    bench_registered,
    bench_from_sql,
);

criterion_main!(benches);
