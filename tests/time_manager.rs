use splitbot::board::Position;
use splitbot::search::time::TimeLimits;
use splitbot::search::{SearchParams, Searcher};
use std::time::{Duration, Instant};

fn close(d: Duration, secs: f64) -> bool { (d.as_secs_f64() - secs).abs() < 1e-3 }

#[test]
fn sudden_death_budget() {
    let l = TimeLimits::allocate(Duration::from_secs(60), Duration::ZERO, None, false);
    // 56s usable over 30 moves
    assert!(close(l.limit_1, 56.0 / 30.0), "{:?}", l);
    assert!(close(l.limit_2, 28.0), "{:?}", l);
    assert!(close(l.limit_3, 14.0), "{:?}", l);
}

#[test]
fn last_move_before_control_uses_the_reserve_cap() {
    let l = TimeLimits::allocate(Duration::from_secs(10), Duration::ZERO, Some(1), false);
    assert!(close(l.limit_1, 8.5), "{:?}", l);
    assert!(l.limit_2 <= Duration::from_secs_f64(8.5 + 1e-6));
}

#[test]
fn increment_extends_the_target() {
    let bare = TimeLimits::allocate(Duration::from_secs(60), Duration::ZERO, None, false);
    let inc = TimeLimits::allocate(Duration::from_secs(60), Duration::from_secs(1), None, false);
    assert!(inc.limit_1 > bare.limit_1);
}

#[test]
fn pondering_raises_the_target() {
    let normal = TimeLimits::allocate(Duration::from_secs(60), Duration::ZERO, Some(20), false);
    let ponder = TimeLimits::allocate(Duration::from_secs(60), Duration::ZERO, Some(20), true);
    assert!(ponder.limit_1 > normal.limit_1);
    assert_eq!(ponder.limit_2, normal.limit_2);
}

#[test]
fn short_clock_never_goes_negative() {
    let l = TimeLimits::allocate(Duration::from_millis(500), Duration::ZERO, None, false);
    assert_eq!(l.limit_1, Duration::ZERO);
    assert_eq!(l.limit_2, Duration::ZERO);
}

#[test]
fn fixed_movetime_is_a_hard_limit() {
    let l = TimeLimits::fixed(Duration::from_millis(100));
    assert_eq!(l.limit_1, Duration::from_millis(500));
    assert_eq!(l.limit_2, Duration::from_millis(100));
    assert_eq!(l.limit_3, Duration::from_millis(100));
}

#[test]
fn movetime_search_returns_in_time() {
    let pos = Position::startpos();
    let mut searcher = Searcher::new(16, 1);
    let t0 = Instant::now();
    let res = searcher.search_with_params(&pos, SearchParams { movetime: Some(Duration::from_millis(50)), ..SearchParams::default() });
    assert!(res.best_move.is_some());
    assert!(t0.elapsed() < Duration::from_secs(2), "took {:?}", t0.elapsed());
}

#[test]
fn node_limit_bounds_the_search() {
    let pos = Position::startpos();
    let mut searcher = Searcher::new(16, 1);
    let res = searcher.search_with_params(&pos, SearchParams { max_nodes: Some(20_000), ..SearchParams::default() });
    assert!(res.best_move.is_some());
    // checked every few thousand nodes, so allow some overshoot
    assert!(res.nodes < 40_000, "searched {} nodes", res.nodes);
}

#[test]
fn stop_ends_an_infinite_search() {
    let pos = Position::startpos();
    let mut searcher = Searcher::new(16, 2);
    let control = searcher.stop_handle();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        control.stop();
    });
    let t0 = Instant::now();
    let res = searcher.search_with_params(&pos, SearchParams { infinite: true, ..SearchParams::default() });
    stopper.join().unwrap();
    assert!(res.best_move.is_some());
    assert!(t0.elapsed() < Duration::from_secs(5), "took {:?}", t0.elapsed());
}
