//! Benchmarks for the generation-checked slot map backing resource tables.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dare_containers::prelude::SlotMap;
use std::hint::black_box;

fn benchmark_slot_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_map");
    for size in [100usize, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("insert", size), size, |b, &size| {
            b.iter(|| {
                let mut slot_map: SlotMap<u64> = SlotMap::default();
                for i in 0..size {
                    black_box(slot_map.insert(black_box(i as u64)));
                }
                black_box(slot_map)
            });
        });

        group.bench_with_input(BenchmarkId::new("get", size), size, |b, &size| {
            let mut slot_map: SlotMap<u64> = SlotMap::default();
            let slots: Vec<_> = (0..size).map(|i| slot_map.insert(i as u64)).collect();
            b.iter(|| {
                for slot in slots.iter() {
                    black_box(slot_map.get(black_box(slot)).ok());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("remove", size), size, |b, &size| {
            b.iter(|| {
                let mut slot_map: SlotMap<u64> = SlotMap::default();
                let slots: Vec<_> = (0..size).map(|i| slot_map.insert(i as u64)).collect();
                for slot in slots {
                    black_box(slot_map.remove(slot).ok());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_slot_map);
criterion_main!(benches);
