use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher, Value};

const FENS: &[&str] = &[
    "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 2 3",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "4k3/2p5/3n4/4P3/8/8/8/4K3 w - - 0 1",
];

// The first iteration searches every root move with a full window, so with
// the window-dependent pruning off the value does not depend on the order
// moves are generated in.
fn first_iteration() -> SearchParams {
    SearchParams {
        depth: 1,
        use_tt: false,
        use_null: false,
        use_razor: false,
        use_static_null: false,
        use_iid: false,
        use_lmr: false,
        use_futility: false,
        use_delta: false,
        use_aspiration: false,
        ..SearchParams::default()
    }
}

#[test]
fn mirrored_positions_score_alike() {
    for fen in FENS {
        let pos = Position::from_fen(fen).unwrap();
        let mirror = pos.mirrored().unwrap();
        let a = Searcher::new(16, 1).search_with_params(&pos, first_iteration());
        let b = Searcher::new(16, 1).search_with_params(&mirror, first_iteration());
        assert_eq!(a.score, b.score, "score differs for {fen}");
    }
}

#[test]
fn mirrored_quiescence_agrees() {
    for fen in FENS {
        let pos = Position::from_fen(fen).unwrap();
        let mirror = pos.mirrored().unwrap();
        assert_eq!(Searcher::new(16, 1).qsearch(&pos), Searcher::new(16, 1).qsearch(&mirror), "qsearch differs for {fen}");
    }
}

#[test]
fn mirrored_full_search_agrees_at_depth_four() {
    let params = SearchParams { depth: 0, ..first_iteration() };
    for fen in FENS {
        let pos = Position::from_fen(fen).unwrap();
        let mirror = pos.mirrored().unwrap();
        let a = Searcher::new(16, 1).search_window(&pos, params, 4, -Value::INF, Value::INF);
        let b = Searcher::new(16, 1).search_window(&mirror, params, 4, -Value::INF, Value::INF);
        assert_eq!(a, b, "depth 4 value differs for {fen}");
    }
}

