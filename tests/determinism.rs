use pretty_assertions::assert_eq;
use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher};

const FEN: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 2 3";

#[test]
fn single_thread_search_repeats_exactly() {
    let pos = Position::from_fen(FEN).unwrap();
    let params = SearchParams { depth: 6, threads: 1, ..SearchParams::default() };

    let a = Searcher::new(16, 1).search_with_params(&pos, params);
    let b = Searcher::new(16, 1).search_with_params(&pos, params);

    assert_eq!(a.best_move, b.best_move);
    assert_eq!(a.score, b.score);
    assert_eq!(a.pv, b.pv);
    assert_eq!(a.nodes, b.nodes);
}

#[test]
fn new_game_resets_learned_state() {
    let pos = Position::from_fen(FEN).unwrap();
    let params = SearchParams { depth: 5, ..SearchParams::default() };
    let mut searcher = Searcher::new(16, 1);
    let first = searcher.search_with_params(&pos, params);
    let warm = searcher.search_with_params(&pos, params);
    assert_eq!(warm.best_move.is_some(), first.best_move.is_some());

    searcher.new_game();
    let again = searcher.search_with_params(&pos, params);
    assert_eq!(again.nodes, first.nodes);
    assert_eq!(again.pv, first.pv);
}
