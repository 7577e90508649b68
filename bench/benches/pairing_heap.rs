use chainweld_core::heap::PairingHeap;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn bench_push_and_pop_all(c: &mut Criterion) {
    for &n in &[1_000usize, 10_000, 100_000] {
        c.bench_function(&format!("pairing_heap_push_pop_all/{n}"), |b| {
            b.iter_batched(
                || PairingHeap::with_capacity(n),
                |mut heap| {
                    for i in 0..n {
                        heap.set_value(i as u32, (n - i) as f64);
                    }
                    while let Some(id) = heap.pop_min() {
                        black_box(id);
                    }
                },
                BatchSize::LargeInput,
            )
        });
    }
}

fn bench_decrease_key_heavy(c: &mut Criterion) {
    let n = 20_000usize;
    c.bench_function("pairing_heap_decrease_key_heavy", |b| {
        b.iter_batched(
            || {
                let mut heap = PairingHeap::with_capacity(n);
                for i in 0..n {
                    heap.set_value(i as u32, (n - i) as f64);
                }
                heap
            },
            |mut heap| {
                // Simulate Dijkstra-style relaxation: every node gets its
                // value lowered a handful of times before being popped.
                for round in 0..4u32 {
                    for i in 0..n as u32 {
                        heap.check_decrease_value(i, round as f64);
                    }
                }
                while let Some(id) = heap.pop_min() {
                    black_box(id);
                }
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_reset_is_cheap(c: &mut Criterion) {
    let n = 50_000usize;
    c.bench_function("pairing_heap_reset", |b| {
        b.iter_batched(
            || {
                let mut heap = PairingHeap::with_capacity(n);
                for i in 0..n {
                    heap.set_value(i as u32, i as f64);
                }
                heap
            },
            |mut heap| {
                heap.reset();
                black_box(&heap);
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_push_and_pop_all, bench_decrease_key_heavy, bench_reset_is_cheap);
criterion_main!(benches);
