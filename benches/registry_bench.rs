use criterion::{black_box, criterion_group, criterion_main, Criterion};

use packet::{Packet, PacketCache};

#[derive(Packet)]
struct Inner {
    key: String,
    value: i64,
}

#[derive(Packet)]
struct Outer {
    id: u32,
    entries: Vec<Inner>,
}

fn cached_lookup_bench(c: &mut Criterion) {
    let cache = PacketCache::new();
    cache.converter::<Outer>().unwrap();
    c.bench_function("converter_cached", |b| {
        b.iter(|| black_box(cache.converter::<Outer>().unwrap()))
    });
}

fn first_derivation_bench(c: &mut Criterion) {
    c.bench_function("converter_first_use", |b| {
        b.iter(|| {
            let cache = PacketCache::new();
            black_box(cache.converter::<Outer>().unwrap())
        })
    });
}

criterion_group!(registry_benches, cached_lookup_bench, first_derivation_bench);
criterion_main!(registry_benches);
