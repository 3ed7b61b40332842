use splitbot::board::perft::{divide, perft, perft_parallel, perft_staged};
use splitbot::board::Position;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const PROMOTIONS: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";

#[test]
fn startpos_counts() {
    let mut pos = Position::startpos();
    assert_eq!(perft(&mut pos, 1), 20);
    assert_eq!(perft(&mut pos, 2), 400);
    assert_eq!(perft(&mut pos, 3), 8_902);
}

#[test]
fn kiwipete_counts() {
    let mut pos = Position::from_fen(KIWIPETE).unwrap();
    assert_eq!(perft(&mut pos, 1), 48);
    assert_eq!(perft(&mut pos, 2), 2_039);
    assert_eq!(perft_parallel(&pos, 3), 97_862);
}

#[test]
fn staged_generation_matches_legal_generation() {
    for fen in [KIWIPETE, PROMOTIONS, "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"] {
        let mut pos = Position::from_fen(fen).unwrap();
        let expected = perft(&mut pos, 3);
        assert_eq!(perft_staged(&mut pos, 3), expected, "{fen}");
    }
}

#[test]
fn divide_sums_to_perft() {
    let mut pos = Position::from_fen(PROMOTIONS).unwrap();
    let counts = divide(&pos, 2);
    assert_eq!(counts.len(), 6);
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<u64>(), perft(&mut pos, 2));
}
