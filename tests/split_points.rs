use splitbot::board::Position;
use splitbot::search::threads::{Stage, ThreadPool};
use splitbot::search::{SearchParams, Searcher};

#[test]
fn parallel_search_finds_the_mate() {
    let pos = Position::from_fen("2r3k1/5ppp/8/8/8/8/3R1PPP/3R2K1 w - - 0 1").unwrap();
    let mut searcher = Searcher::new(16, 4);
    let res = searcher.search_with_params(&pos, SearchParams { depth: 7, ..SearchParams::default() });
    assert_eq!(res.best_move.map(|m| pos.move_to_uci(m)).as_deref(), Some("d2d8"));
    assert_eq!(res.score.mate_distance(), 2);
}

#[test]
fn parallel_search_agrees_on_material_win() {
    let pos = Position::from_fen("k7/8/8/8/8/8/3qQ3/7K w - - 0 1").unwrap();
    let mut searcher = Searcher::new(16, 4);
    let res = searcher.search_with_params(&pos, SearchParams { depth: 8, ..SearchParams::default() });
    assert_eq!(res.best_move.map(|m| pos.move_to_uci(m)).as_deref(), Some("e2d2"));
    assert!(res.score.0 > 500);
}

#[test]
fn pool_survives_repeated_searches() {
    let pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
    let mut searcher = Searcher::new(16, 3);
    for depth in [5, 6, 7] {
        let res = searcher.search_with_params(&pos, SearchParams { depth, ..SearchParams::default() });
        let best = res.best_move.expect("parallel search returned no move");
        assert!(pos.is_legal(best));
        assert_eq!(pos.line_to_uci(&res.pv).len(), res.pv.len(), "illegal pv at depth {depth}");
    }
    searcher.set_threads(1);
    assert_eq!(searcher.threads(), 1);
    let res = searcher.search_with_params(&pos, SearchParams { depth: 5, ..SearchParams::default() });
    assert!(res.best_move.is_some());
}

#[test]
fn booking_needs_idle_helpers() {
    let pool = ThreadPool::new(4);
    let shared = pool.shared();
    // parked helpers cannot be booked
    assert_eq!(shared.book(0), None);

    shared.wake(0);
    assert!(shared.has_idle());
    let slaves = shared.book(0).expect("three idle helpers");
    assert_eq!(slaves, 0b1110);
    assert_eq!(shared.stage(0), Stage::Booked);
    assert_eq!(shared.stage(2), Stage::Booked);
    assert!(!shared.has_idle());
    assert_eq!(shared.book(0), None);

    shared.sleep();
    assert_eq!(shared.stage(1), Stage::Sleeping);
}

#[test]
fn single_thread_pool_never_splits() {
    let pool = ThreadPool::new(1);
    let shared = pool.shared();
    shared.wake(0);
    assert!(!shared.has_idle());
    assert_eq!(shared.book(0), None);
    assert_eq!(shared.stage(0), Stage::Searching);
}
