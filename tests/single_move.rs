use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher};
use std::time::Duration;

#[test]
fn forced_reply_returns_at_depth_one() {
    // the king's only move is to take the rook
    let pos = Position::from_fen("k7/8/8/8/8/8/1r6/K7 w - - 0 1").unwrap();
    assert_eq!(pos.legal_moves_count(), 1);
    let mut searcher = Searcher::default();
    let params = SearchParams { depth: 20, movetime: Some(Duration::from_secs(30)), ..SearchParams::default() };
    let res = searcher.search_with_params(&pos, params);
    assert_eq!(res.best_move.map(|m| pos.move_to_uci(m)).as_deref(), Some("a1b2"));
    assert_eq!(res.depth, 1);
    // the root and the quiescence of its only child
    assert!(res.nodes <= 2, "searched {} nodes", res.nodes);
    assert!(res.elapsed < Duration::from_secs(5));
}

#[test]
fn stop_before_the_first_iteration_still_yields_a_move() {
    let pos = Position::startpos();
    let mut searcher = Searcher::default();
    let control = searcher.stop_handle();
    control.arm(false);
    control.stop();
    let res = searcher.search_armed(&pos, SearchParams::default(), |_| {});
    let best = res.best_move.expect("depth 1 always completes");
    assert!(pos.is_legal(best));
    assert_eq!(res.depth, 1);
}
