use criterion::{criterion_group, criterion_main, Criterion, black_box};
use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher};

fn bench_search(c: &mut Criterion) {
    let pos = Position::startpos();
    c.bench_function("search_depth_6_startpos", |ben| {
        ben.iter(|| {
            let mut s = Searcher::new(16, 1);
            let p = SearchParams { depth: 6, ..SearchParams::default() };
            let r = s.search_with_params(black_box(&pos), p);
            black_box(r.nodes)
        })
    });

    let kiwipete = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
    let mut group = c.benchmark_group("search_depth_6_kiwipete");
    group.sample_size(10);
    for threads in [1usize, 2, 4] {
        group.bench_function(format!("threads_{threads}"), |ben| {
            let mut s = Searcher::new(16, threads);
            ben.iter(|| {
                s.new_game();
                let p = SearchParams { depth: 6, ..SearchParams::default() };
                black_box(s.search_with_params(black_box(&kiwipete), p).nodes)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
