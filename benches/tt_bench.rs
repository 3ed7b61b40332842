use criterion::{criterion_group, criterion_main, Criterion, black_box};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use splitbot::search::tt::TranspositionTable;
use splitbot::search::Value;

fn bench_tt(c: &mut Criterion) {
    let tt = TranspositionTable::new(16);
    let mut rng = SmallRng::seed_from_u64(7);
    let keys: Vec<u64> = (0..4096).map(|_| rng.gen()).collect();

    c.bench_function("tt_store", |ben| {
        let mut i = 0;
        ben.iter(|| {
            let key = keys[i & 4095];
            tt.store(black_box(key), None, 8, Value(10), Value(10), Value(5));
            i += 1;
        })
    });
    c.bench_function("tt_retrieve", |ben| {
        let mut i = 0;
        ben.iter(|| {
            let hit = tt.retrieve(black_box(keys[i & 4095]), false);
            i += 1;
            black_box(hit.is_some())
        })
    });
}

criterion_group!(benches, bench_tt);
criterion_main!(benches);
