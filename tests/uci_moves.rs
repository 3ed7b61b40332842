use cozy_chess::{Color, Square};
use pretty_assertions::assert_eq;
use splitbot::board::Position;
use splitbot::error::EngineError;

#[test]
fn apply_startpos_moves_sequence() {
    let moves = vec!["e2e4".to_string(), "e7e5".to_string(), "g1f3".to_string()];
    let pos = Position::set_from_start_and_moves(&moves).expect("legal move sequence");
    assert_eq!(pos.side_to_move(), Color::Black, "expected black to move after 3 plies");
}

#[test]
fn castling_round_trips_as_king_two_squares() {
    let mut pos = Position::from_fen("r3k2r/pppq1ppp/8/8/8/8/PPPQ1PPP/R3K2R w KQkq - 0 1").unwrap();
    let short = pos.parse_uci_move("e1g1").unwrap();
    assert!(pos.is_castle(short));
    assert_eq!(pos.move_to_uci(short), "e1g1");
    pos.make_move(short);
    let long = pos.parse_uci_move("e8c8").unwrap();
    assert_eq!(long.to, Square::A8);
    assert_eq!(pos.move_to_uci(long), "e8c8");
}

#[test]
fn promotion_text_keeps_piece() {
    let pos = Position::from_fen("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let mv = pos.parse_uci_move("e7e8n").unwrap();
    assert_eq!(pos.move_to_uci(mv), "e7e8n");
}

#[test]
fn bad_input_is_reported() {
    let pos = Position::startpos();
    assert!(matches!(pos.parse_uci_move("zz"), Err(EngineError::BadMove(_))));
    assert!(matches!(pos.parse_uci_move("e2e5"), Err(EngineError::IllegalMove(_))));
    assert!(matches!(Position::from_fen("not a fen"), Err(EngineError::Fen { .. })));
    let moves = vec!["e2e4".to_string(), "e2e4".to_string()];
    assert!(Position::set_from_start_and_moves(&moves).is_err());
}

#[test]
fn line_text_stops_at_illegal_move() {
    let pos = Position::startpos();
    let e4 = pos.parse_uci_move("e2e4").unwrap();
    let mut after = pos.clone();
    after.make_move(e4);
    let e5 = after.parse_uci_move("e7e5").unwrap();
    assert_eq!(pos.line_to_uci(&[e4, e5, e4]), vec!["e2e4".to_string(), "e7e5".to_string()]);
}

#[test]
fn repetition_is_a_draw() {
    let mut pos = Position::startpos();
    for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        pos.make_move_uci(mv).unwrap();
    }
    assert!(pos.is_repetition());
    assert!(pos.is_draw());
}
