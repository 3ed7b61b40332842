use splitbot::search::value::HEIGHT_MAX;
use splitbot::search::Value;

#[test]
fn shorter_mates_score_higher() {
    assert!(Value::mate_in(1) > Value::mate_in(3));
    assert!(Value::mated_in(4) > Value::mated_in(2));
    assert!(Value::mate_in(HEIGHT_MAX - 1).is_mate());
    assert!(Value::mated_in(HEIGHT_MAX - 1).is_mate());
    assert!(!Value(Value::EVAL_INF.0).is_mate());
    assert!(!Value(-Value::EVAL_INF.0).is_mate());
    assert!(!Value::mate_in(HEIGHT_MAX).is_mate());
}

#[test]
fn mate_distance_in_moves() {
    assert_eq!(Value::mate_in(1).mate_distance(), 1);
    assert_eq!(Value::mate_in(3).mate_distance(), 2);
    assert_eq!(Value::mated_in(2).mate_distance(), -1);
    assert_eq!(Value(250).mate_distance(), 0);
}

#[test]
fn stored_mates_are_node_relative() {
    // mate found 7 plies from the root, stored at a node 5 plies deep
    let stored = Value::mate_in(7).to_trans(5);
    assert_eq!(stored, Value::mate_in(2));
    // the same node reached 3 plies from the root
    assert_eq!(stored.from_trans(3), Value::mate_in(5));

    let stored = Value::mated_in(6).to_trans(2);
    assert_eq!(stored, Value::mated_in(4));
    assert_eq!(stored.from_trans(4), Value::mated_in(8));

    assert_eq!(Value(123).to_trans(9), Value(123));
    assert_eq!(Value(-123).from_trans(9), Value(-123));
}

#[test]
fn uci_score_text() {
    assert_eq!(Value(-45).to_string(), "cp -45");
    assert_eq!(Value::mate_in(5).to_string(), "mate 3");
    assert_eq!(Value::mated_in(4).to_string(), "mate -2");
}

#[test]
fn win_band_contains_mates() {
    assert!(Value::mate_in(10).is_win());
    assert!(Value(Value::WIN.0 + 1).is_win());
    assert!(!Value(Value::WIN.0).is_win());
    assert!(Value::NONE.is_none());
}

#[test]
fn trans_encoding_round_trips_over_the_mate_band() {
    for h in 0..HEIGHT_MAX {
        // root-relative mates seen at height h are at least h plies away
        for d in h..HEIGHT_MAX {
            for v in [Value::mate_in(d), Value::mated_in(d)] {
                assert!(v.to_trans(h).is_mate(), "v={v:?} h={h}");
                assert_eq!(v.to_trans(h).from_trans(h), v, "h={h} d={d}");
            }
        }
        // stored mates stay in the band once re-rooted h plies deeper
        for k in 0..HEIGHT_MAX - h {
            for v in [Value::mate_in(k), Value::mated_in(k)] {
                assert_eq!(v.from_trans(h).to_trans(h), v, "h={h} k={k}");
            }
        }
    }
    for cp in (-Value::EVAL_INF.0..=Value::EVAL_INF.0).step_by(97) {
        assert_eq!(Value(cp).to_trans(17), Value(cp));
        assert_eq!(Value(cp).from_trans(17), Value(cp));
    }
}
