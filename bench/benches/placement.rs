use chainweld_core::chain::ChainStore;
use chainweld_core::graph::Graph;
use chainweld_core::placement::{place_vertex, PlacementScratch};
use chainweld_core::rng::Rng;
use chainweld_types::DenseId;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn id(n: u32) -> DenseId {
    DenseId(n)
}

/// A `side x side` grid target graph, the shape a chimera-style annealer
/// topology benchmark would use as a stand-in for unit-cell connectivity.
fn grid(side: u32) -> Graph {
    let mut g = Graph::with_vertex_count((side * side) as usize);
    let idx = |x: u32, y: u32| x * side + y;
    for x in 0..side {
        for y in 0..side {
            if x + 1 < side {
                g.add_edge(id(idx(x, y)), id(idx(x + 1, y)));
            }
            if y + 1 < side {
                g.add_edge(id(idx(x, y)), id(idx(x, y + 1)));
            }
        }
    }
    g
}

fn star_source() -> Graph {
    // One hub with four leaves: the placement under test is the hub, with
    // four already-placed neighbor chains to fan a parallel Dijkstra out
    // to.
    let mut g = Graph::with_vertex_count(5);
    for leaf in 1..5 {
        g.add_edge(id(0), id(leaf));
    }
    g
}

fn bench_single_vertex_placement(c: &mut Criterion) {
    for &side in &[8u32, 16, 32] {
        let target = grid(side);
        let source = star_source();
        let corners = [
            id(0),
            id(side - 1),
            id((side - 1) * side),
            id(side * side - 1),
        ];

        c.bench_function(&format!("place_vertex_grid/{side}x{side}"), |b| {
            b.iter_batched(
                || {
                    let mut chains = ChainStore::new(5, target.len());
                    for (leaf, &corner) in corners.iter().enumerate() {
                        chains.install(id(leaf as u32 + 1), corner, &[vec![corner]]).unwrap();
                    }
                    let scratch = PlacementScratch::new(1, 4, target.len());
                    let rng = Rng::new(42);
                    (chains, scratch, rng)
                },
                |(mut chains, mut scratch, mut rng)| {
                    let outcome = place_vertex(
                        id(0),
                        &source,
                        &target,
                        &mut chains,
                        None,
                        2.0,
                        u32::MAX,
                        1e9,
                        &mut scratch,
                        &mut rng,
                    );
                    black_box(outcome);
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_placement_thread_scaling(c: &mut Criterion) {
    let side = 24u32;
    let target = grid(side);
    let source = star_source();
    let corners = [id(0), id(side - 1), id((side - 1) * side), id(side * side - 1)];

    for &threads in &[1usize, 2, 4] {
        c.bench_function(&format!("place_vertex_grid_threads/{threads}"), |b| {
            b.iter_batched(
                || {
                    let mut chains = ChainStore::new(5, target.len());
                    for (leaf, &corner) in corners.iter().enumerate() {
                        chains.install(id(leaf as u32 + 1), corner, &[vec![corner]]).unwrap();
                    }
                    let scratch = PlacementScratch::new(threads, 4, target.len());
                    let rng = Rng::new(7);
                    (chains, scratch, rng)
                },
                |(mut chains, mut scratch, mut rng)| {
                    let outcome = place_vertex(
                        id(0),
                        &source,
                        &target,
                        &mut chains,
                        None,
                        2.0,
                        u32::MAX,
                        1e9,
                        &mut scratch,
                        &mut rng,
                    );
                    black_box(outcome);
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_single_vertex_placement, bench_placement_thread_scaling);
criterion_main!(benches);
