//! Benchmark: serialize a record through each writer, deserialize it back, and
//! transcode Compact to Simple JSON without materializing the record.

use bondcore::{
    bond_record, marshal_to_vec, serialize, transcode, unmarshal, CompactWriter, JsonWriter, ProtocolType, Record,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Sample("bench.Sample") {
        1 => Required id: u64,
        2 => Optional label: String,
        3 => Optional values: Vec<i32>,
        4 => Optional lookup: BTreeMap<u32, String>,
        5 => Optional ratio: f64,
    }
}

bond_record! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Batch("bench.Batch") {
        1 => Optional items: Vec<Sample>,
    }
}

fn batch() -> Batch {
    let items = (0..64u64)
        .map(|i| Sample {
            id: i,
            label: format!("item-{i}"),
            values: (0..16).map(|v| v * i as i32 - 100).collect(),
            lookup: (0..4u32).map(|k| (k, format!("k{k}"))).collect(),
            ratio: i as f64 / 3.0,
        })
        .collect();
    Batch { items }
}

fn bench_protocols(c: &mut Criterion) {
    let batch = batch();
    for protocol in [ProtocolType::Compact, ProtocolType::Simple, ProtocolType::SimpleJson] {
        let bytes = marshal_to_vec(&batch, protocol).expect("marshal");
        c.bench_function(&format!("marshal {protocol:?}"), |b| {
            b.iter(|| marshal_to_vec(black_box(&batch), protocol).expect("marshal"))
        });
        c.bench_function(&format!("unmarshal {protocol:?}"), |b| {
            b.iter(|| unmarshal::<Batch>(black_box(&bytes)).expect("unmarshal"))
        });
    }
}

fn bench_transcode(c: &mut Criterion) {
    let mut writer = CompactWriter::new(Vec::new());
    serialize(&batch(), &mut writer).expect("serialize");
    let compact = writer.into_inner();
    c.bench_function("transcode Compact -> SimpleJson", |b| {
        b.iter(|| {
            let mut json = JsonWriter::new();
            transcode(black_box(&compact), ProtocolType::Compact, 1, Batch::schema(), &mut json).expect("transcode");
            json.into_bytes().expect("bytes")
        })
    });
}

criterion_group!(benches, bench_protocols, bench_transcode);
criterion_main!(benches);
