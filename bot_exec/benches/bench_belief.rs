//! Benchmarks for the belief update cycle.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bot_lib::colour::Colour;
use bot_lib::loc::{Belief, LocParams, Observation, Turn};
use bot_lib::map::StreetMap;

/// Largest map size the original system supports (20x20 intersections).
const SX: usize = 20;
const SY: usize = 20;

fn bench_map() -> StreetMap {
    let palette = [Colour::Green, Colour::Blue, Colour::White];

    let corners: Vec<[Colour; 4]> = (0..SX * SY)
        .map(|i| {
            [
                palette[i % 3],
                palette[(i / 3) % 3],
                palette[(i / 9) % 3],
                palette[(i / 27) % 3],
            ]
        })
        .collect();

    StreetMap::from_corners(SX, SY, corners).expect("bench map is well formed")
}

fn bench_predict(c: &mut Criterion) {
    let mut belief = Belief::uniform(SX, SY);

    c.bench_function("belief predict straight 20x20", |b| {
        b.iter(|| {
            belief.predict(black_box(Turn::Straight));
        })
    });

    c.bench_function("belief predict right 20x20", |b| {
        b.iter(|| {
            belief.predict(black_box(Turn::Right));
        })
    });
}

fn bench_update(c: &mut Criterion) {
    let map = bench_map();
    let params = LocParams {
        p_match: 0.7,
        p_mismatch: 0.1,
    };
    let obs = Observation([Colour::Green, Colour::Blue, Colour::White, Colour::Green]);

    c.bench_function("belief update 20x20", |b| {
        let mut belief = Belief::uniform(SX, SY);
        b.iter(|| {
            belief.update(black_box(&obs), &map, &params);
        })
    });
}

criterion_group!(benches, bench_predict, bench_update);
criterion_main!(benches);
