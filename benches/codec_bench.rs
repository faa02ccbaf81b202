use criterion::{black_box, criterion_group, criterion_main, Criterion};

use packet::{Packet, PacketCache};

#[derive(Packet, Debug, PartialEq)]
struct Frame {
    seq: u64,
    source: String,
    samples: Vec<f32>,
    tags: Vec<String>,
}

fn sample_frame() -> Frame {
    Frame {
        seq: 42,
        source: "bench-sensor".to_owned(),
        samples: (0..256).map(|i| i as f32 * 0.5).collect(),
        tags: vec!["a".to_owned(), "bb".to_owned(), "ccc".to_owned()],
    }
}

fn serialize_bench(c: &mut Criterion) {
    let cache = PacketCache::new();
    let frame = sample_frame();
    c.bench_function("serialize_record", |b| {
        b.iter(|| black_box(cache.serialize(&frame).unwrap()))
    });
}

fn deserialize_bench(c: &mut Criterion) {
    let cache = PacketCache::new();
    let bytes = cache.serialize(&sample_frame()).unwrap();
    c.bench_function("deserialize_record", |b| {
        b.iter(|| black_box(cache.deserialize::<Frame>(&bytes).unwrap()))
    });
}

fn strided_bench(c: &mut Criterion) {
    let cache = PacketCache::new();
    let bytes = cache.serialize(&(0..4096u32).collect::<Vec<_>>()).unwrap();
    c.bench_function("deserialize_u32_sequence", |b| {
        b.iter(|| black_box(cache.deserialize::<Vec<u32>>(&bytes).unwrap()))
    });
    c.bench_function("deserialize_byte_sequence", |b| {
        b.iter(|| black_box(cache.deserialize::<Vec<u8>>(&bytes).unwrap()))
    });
}

criterion_group! {
    name = codec_benches;
    config = Criterion::default();
    targets = serialize_bench, deserialize_bench, strided_bench
}

criterion_main!(codec_benches);
