use splitbot::board::Position;
use splitbot::search::see::see;
use splitbot::search::Value;

fn see_of(fen: &str, mv: &str) -> i32 {
    let pos = Position::from_fen(fen).unwrap();
    let mv = pos.parse_uci_move(mv).unwrap();
    see(pos.board(), mv)
}

#[test]
fn undefended_queen_is_free() {
    assert_eq!(see_of("4k3/8/8/8/5Q2/8/8/2b4K b - - 0 1", "c1f4"), Value::QUEEN);
}

#[test]
fn pawn_takes_defended_knight_wins() {
    assert!(see_of("4k3/2p5/3n4/4P3/8/8/8/4K3 w - - 0 1", "e5d6") > 0);
}

#[test]
fn rook_takes_defended_pawn_loses() {
    assert_eq!(see_of("4k3/8/2p5/3p4/8/8/8/3RK3 w - - 0 1", "d1d5"), Value::PAWN - Value::ROOK);
}

#[test]
fn quiet_move_to_attacked_square_loses_piece() {
    // Nf3-e5 walks into the d6 pawn
    assert_eq!(see_of("4k3/8/3p4/8/8/5N2/8/4K3 w - - 0 1", "f3e5"), -Value::KNIGHT);
}

#[test]
fn en_passant_counts_a_pawn() {
    assert_eq!(see_of("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2", "e5d6"), Value::PAWN);
}
