//! DDL Compilation and Key Decoding Benchmarks
//!
//! Measures statement rendering for growing table widths and the cost of
//! decoding streamed key strings.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quantum_ts::query::decode_key;
use quantum_ts::schema::compile_create_table;
use quantum_ts::{Field, FieldType, QuantizedField, TableDefinition, TimeUnit};
use std::hint::black_box;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Table with `key_fields` key columns and `fields` additional columns
fn wide_table(key_fields: usize, fields: usize) -> TableDefinition {
    TableDefinition::new(
        "Wide",
        QuantizedField::new("time", FieldType::Timestamp, 15, TimeUnit::Minutes).unwrap(),
        (0..key_fields)
            .map(|i| Field::varchar(format!("key_{i}")).not_null())
            .collect(),
        (0..fields)
            .map(|i| Field::new(format!("field_{i}"), FieldType::Double))
            .collect(),
    )
    .unwrap()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_create_table");

    for fields in [4usize, 32, 256] {
        let def = wide_table(3, fields);
        group.throughput(Throughput::Elements(def.column_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &def, |b, def| {
            b.iter(|| black_box(compile_create_table(black_box(def)).unwrap()))
        });
    }

    group.finish();
}

fn bench_decode_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_key");

    let keys: Vec<String> = (0..1000)
        .map(|i| format!("region_{},CA,{}", i % 7, 1_469_541_600_000i64 + i))
        .collect();
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("1000_keys", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(decode_key(key));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_decode_keys);
criterion_main!(benches);
