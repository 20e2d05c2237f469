//! OID benchmarks.
//!
//! `Oid` keeps up to 16 arcs inline; the length sweeps straddle that
//! threshold.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use snmp_stack::Oid;
use std::hint::black_box;

fn generate_oid(len: usize) -> Oid {
    let mut arcs = vec![1u64, 3, 6, 1, 4, 1];
    arcs.extend((0..len.saturating_sub(6)).map(|i| (i % 256) as u64));
    Oid::new(arcs)
}

fn bench_oid_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_clone");

    for len in [8, 15, 16, 17, 32] {
        let oid = generate_oid(len);
        group.bench_with_input(BenchmarkId::new("clone", len), &oid, |b, oid| {
            b.iter(|| black_box(oid.clone()))
        });
        group.bench_with_input(BenchmarkId::new("child", len), &oid, |b, oid| {
            b.iter(|| black_box(oid.child(42)))
        });
    }

    group.finish();
}

fn bench_oid_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_comparison");

    for len in [8, 16, 32] {
        let oid = generate_oid(len);
        let prefix = generate_oid(6);
        let next = oid.parent().unwrap_or_default().child(u64::MAX);

        group.bench_with_input(
            BenchmarkId::new("contains", len),
            &(prefix, oid.clone()),
            |b, (prefix, oid)| b.iter(|| black_box(prefix.contains(oid))),
        );
        group.bench_with_input(
            BenchmarkId::new("cmp", len),
            &(oid, next),
            |b, (a, b_oid)| b.iter(|| black_box(a.cmp(b_oid))),
        );
    }

    group.finish();
}

fn bench_oid_ber(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_ber");

    for len in [8, 16, 32, 64] {
        let oid = generate_oid(len);
        let encoded = oid.to_ber().unwrap();

        group.bench_with_input(BenchmarkId::new("to_ber", len), &oid, |b, oid| {
            b.iter(|| black_box(oid.to_ber().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("from_ber", len), &encoded, |b, data| {
            b.iter(|| black_box(Oid::from_ber(data).unwrap()))
        });
    }

    group.finish();
}

fn bench_oid_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_text");

    for len in [8, 16, 32] {
        let oid = generate_oid(len);
        let text = oid.to_string();

        group.bench_with_input(BenchmarkId::new("parse", len), &text, |b, s| {
            b.iter(|| black_box(Oid::parse(s).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("display", len), &oid, |b, oid| {
            b.iter(|| black_box(oid.to_string()))
        });
    }

    group.finish();
}

fn bench_table_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_table_walk");
    let column = Oid::from_slice(&[1, 3, 6, 1, 2, 1, 2, 2, 1, 2]);

    let instances: Vec<Oid> = (0..100u64)
        .map(|i| Oid::from_slice(&[1, 3, 6, 1, 2, 1, 2, 2, 1, (i % 10) + 1, i]))
        .collect();

    group.bench_function("sort_100", |b| {
        b.iter_batched(
            || instances.clone(),
            |mut oids| {
                oids.sort();
                black_box(oids)
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("suffix_after", |b| {
        let instance = column.child(42);
        b.iter(|| black_box(instance.suffix_after(&column)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_oid_clone,
    bench_oid_comparison,
    bench_oid_ber,
    bench_oid_text,
    bench_table_walk,
);

criterion_main!(benches);
