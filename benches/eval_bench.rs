use criterion::{criterion_group, criterion_main, Criterion, black_box};
use splitbot::board::Position;
use splitbot::search::eval::{eval_cp, Evaluator, PstEvaluator};

fn bench_eval(c: &mut Criterion) {
    let pos = Position::startpos();
    c.bench_function("eval_cp_startpos", |ben| ben.iter(|| black_box(eval_cp(black_box(pos.board())))));
    c.bench_function("pst_evaluator_startpos", |ben| {
        ben.iter(|| black_box(PstEvaluator.evaluate(black_box(&pos), 0)))
    });
}

criterion_group!(benches, bench_eval);
criterion_main!(benches);
