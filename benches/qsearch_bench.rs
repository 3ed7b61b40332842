use criterion::{criterion_group, criterion_main, Criterion, black_box};
use splitbot::board::Position;
use splitbot::search::Searcher;

fn bench_qsearch(c: &mut Criterion) {
    let start = Position::startpos();
    let tactical = Position::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4").unwrap();
    let mut s = Searcher::new(16, 1);
    c.bench_function("qsearch_startpos", |ben| ben.iter(|| black_box(s.qsearch(black_box(&start)))));
    c.bench_function("qsearch_tactical", |ben| ben.iter(|| black_box(s.qsearch(black_box(&tactical)))));
}

criterion_group!(benches, bench_qsearch);
criterion_main!(benches);
