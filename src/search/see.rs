use cozy_chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves, BitBoard, Board, Color,
    Move, Piece, Square,
};

use super::value::Value;

const ORDER: [Piece; 6] = [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King];

/// Every piece of either colour attacking `sq` given the occupancy `occ`.
pub fn attackers_to(board: &Board, sq: Square, occ: BitBoard) -> BitBoard {
    let diag = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
    let line = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    let attackers = (get_pawn_attacks(sq, Color::White) & board.colored_pieces(Color::Black, Piece::Pawn))
        | (get_pawn_attacks(sq, Color::Black) & board.colored_pieces(Color::White, Piece::Pawn))
        | (get_knight_moves(sq) & board.pieces(Piece::Knight))
        | (get_bishop_moves(sq, occ) & diag)
        | (get_rook_moves(sq, occ) & line)
        | (get_king_moves(sq) & board.pieces(Piece::King));
    attackers & occ
}

/// Static exchange evaluation of `mv` in centipawns for the side to move.
/// Sliders hidden behind the exchange square join in as the pieces in front
/// of them leave; pins are ignored.
pub fn see(board: &Board, mv: Move) -> i32 {
    let Some(mut attacker) = board.piece_on(mv.from) else { return 0 };
    let to = mv.to;
    let stm = board.side_to_move();
    let mut occ = board.occupied() ^ mv.from.bitboard();
    let mut gain = [0i32; 32];

    let en_passant = attacker == Piece::Pawn && mv.from.file() != to.file() && board.piece_on(to).is_none();
    if en_passant {
        gain[0] = Value::PAWN;
        occ ^= Square::new(to.file(), mv.from.rank()).bitboard();
    } else if board.colors(!stm).has(to) {
        gain[0] = board.piece_on(to).map_or(0, Value::piece);
    }
    if let Some(promo) = mv.promotion {
        gain[0] += Value::piece(promo) - Value::PAWN;
        attacker = promo;
    }

    let mut side = !stm;
    let mut d = 0usize;
    loop {
        d += 1;
        gain[d] = Value::piece(attacker) - gain[d - 1];
        if (-gain[d - 1]).max(gain[d]) < 0 || d + 1 >= gain.len() { break; }
        let mine = attackers_to(board, to, occ) & board.colors(side);
        let Some((piece, sq)) = ORDER
            .iter()
            .find_map(|&p| (mine & board.pieces(p)).into_iter().next().map(|sq| (p, sq)))
        else { break };
        // a king may only take last
        if piece == Piece::King && !(attackers_to(board, to, occ ^ sq.bitboard()) & board.colors(!side)).is_empty() {
            break;
        }
        occ ^= sq.bitboard();
        attacker = piece;
        side = !side;
    }
    while d > 1 {
        d -= 1;
        gain[d - 1] = -(-gain[d - 1]).max(gain[d]);
    }
    gain[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(board: &Board, from: Square, to: Square) -> Move {
        let mut found = None;
        board.generate_moves(|ml| {
            for m in ml {
                if m.from == from && m.to == to { found = Some(m); }
            }
            found.is_some()
        });
        found.expect("move must be legal in this position")
    }

    #[test]
    fn see_detects_bad_exchange_rook_x_pawn_on_h7() {
        // after Rxh7, ...Kxh7 wins the rook
        let board = Board::from_fen("6k1/2R4p/6p1/8/6K1/6P1/8/8 w - - 3 38", false).unwrap();
        let gain = see(&board, find(&board, Square::C7, Square::H7));
        assert!(gain < 0, "SEE should be negative for losing exchange, got {gain}");
    }

    #[test]
    fn xray_rook_supports_capture() {
        // Rd1 behind Rd2 backs up Rxd7 against the lone defender
        let board = Board::from_fen("3r2k1/3p4/8/8/8/8/3R4/3RK3 w - - 0 1", false).unwrap();
        let gain = see(&board, find(&board, Square::D2, Square::D7));
        assert_eq!(gain, Value::PAWN, "pawn wins after the rook trade, got {gain}");
    }
}
