use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher, Value};

const FENS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "4k3/2p5/3n4/4P3/8/8/8/4K3 w - - 0 1",
];

const BETAS: &[i32] = &[-200, -50, 0, 50, 200, 1000, 30_000];

fn plain() -> SearchParams {
    SearchParams {
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
fn raising_beta_never_lowers_the_value() {
    for fen in FENS {
        let pos = Position::from_fen(fen).unwrap();
        let mut last = -Value::INF;
        for &beta in BETAS {
            let value = Searcher::new(8, 1).search_window(&pos, plain(), 3, -Value::INF, Value(beta));
            assert!(value >= last, "{fen}: beta {beta} gave {value}, below {last}");
            last = value;
        }
    }
}

#[test]
fn fail_high_is_a_lower_bound_of_the_full_value() {
    let pos = Position::from_fen(FENS[2]).unwrap();
    let full = Searcher::new(8, 1).search_window(&pos, plain(), 3, -Value::INF, Value::INF);
    let low = Searcher::new(8, 1).search_window(&pos, plain(), 3, -Value::INF, full - 100);
    assert!(low >= full - 100, "search below the true value must fail high");
    assert!(low <= full);
}
