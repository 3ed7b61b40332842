pub mod cozy;
pub mod perft;

pub use cozy::{Position, Undo};

use cozy_chess::{Move, Piece, Square};

/// Packs a move into 16 bits: `from | to << 6 | promo << 12`. Zero is "no move"
/// (a1a1 can never be played).
pub fn encode_move(mv: Option<Move>) -> u16 {
    let Some(mv) = mv else { return 0 };
    let promo = match mv.promotion {
        None => 0,
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(_) => 4,
    };
    (mv.from as u16) | ((mv.to as u16) << 6) | (promo << 12)
}

pub fn decode_move(code: u16) -> Option<Move> {
    if code == 0 { return None; }
    let from = Square::index((code & 63) as usize);
    let to = Square::index(((code >> 6) & 63) as usize);
    let promotion = match (code >> 12) & 7 {
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => None,
    };
    Some(Move { from, to, promotion })
}
