use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher};

#[test]
fn back_rank_mate_in_one() {
    let pos = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1").unwrap();
    let mut searcher = Searcher::default();
    let res = searcher.search_with_params(&pos, SearchParams { depth: 3, ..SearchParams::default() });
    assert_eq!(res.best_move.map(|m| pos.move_to_uci(m)).as_deref(), Some("d1d8"));
    assert_eq!(res.score.to_string(), "mate 1");
}

#[test]
fn doubled_rooks_mate_in_two() {
    let pos = Position::from_fen("2r3k1/5ppp/8/8/8/8/3R1PPP/3R2K1 w - - 0 1").unwrap();
    let mut searcher = Searcher::default();
    let res = searcher.search_with_params(&pos, SearchParams { depth: 5, ..SearchParams::default() });
    assert_eq!(res.best_move.map(|m| pos.move_to_uci(m)).as_deref(), Some("d2d8"));
    assert!(res.score.is_mate() && res.score.0 > 0, "expected a mate score, got {}", res.score);
    assert_eq!(res.score.mate_distance(), 2);

    assert_eq!(pos.line_to_uci(&res.pv), ["d2d8", "c8d8", "d1d8"]);
    let mut end = pos.clone();
    for &mv in &res.pv {
        end.make_move(mv);
    }
    assert!(end.is_mate(), "line must end in checkmate");
}

#[test]
fn side_a_rook_down_scores_negative() {
    // black to move makes luft but stays a rook down
    let pos = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/3R2K1 b - - 0 1").unwrap();
    let mut searcher = Searcher::default();
    let res = searcher.search_with_params(&pos, SearchParams { depth: 4, ..SearchParams::default() });
    assert!(res.best_move.is_some());
    assert!(res.score.0 < 0);
}
