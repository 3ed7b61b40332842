use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Search depth in half-plies.
pub type Depth = i32;

pub const ONE_PLY: Depth = 2;
pub const DEPTH_MAX: Depth = 64;
pub const HEIGHT_MAX: usize = 256;

/// Side-to-move-relative score. Mates are stored as `MATE - height` so that
/// shorter mates compare higher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value(pub i32);

impl Value {
    pub const DRAW: Value = Value(0);
    pub const MATE: Value = Value(30_000);
    pub const INF: Value = Value::MATE;
    pub const EVAL_INF: Value = Value(30_000 - 256);
    pub const WIN: Value = Value(15_000);
    pub const NONE: Value = Value(-32_767);

    pub const PAWN: i32 = 100;
    pub const KNIGHT: i32 = 325;
    pub const BISHOP: i32 = 325;
    pub const ROOK: i32 = 500;
    pub const QUEEN: i32 = 1000;
    pub const KING: i32 = 10_000;

    pub fn mated_in(height: usize) -> Value { Value(-Self::MATE.0 + height as i32) }

    pub fn mate_in(height: usize) -> Value { Value(Self::MATE.0 - height as i32) }

    pub fn is_mate(self) -> bool { self.0 < -Self::EVAL_INF.0 || self.0 > Self::EVAL_INF.0 }

    pub fn is_win(self) -> bool { self.0 < -Self::WIN.0 || self.0 > Self::WIN.0 }

    pub fn is_none(self) -> bool { self == Self::NONE }

    /// Moves to mate, negative when the side to move is getting mated.
    pub fn mate_distance(self) -> i32 {
        if self.0 < -Self::EVAL_INF.0 {
            -(Self::MATE.0 + self.0) / 2
        } else if self.0 > Self::EVAL_INF.0 {
            (Self::MATE.0 - self.0 + 1) / 2
        } else {
            0
        }
    }

    /// Root-relative mate scores become node-relative before storing.
    pub fn to_trans(self, height: usize) -> Value {
        let h = height as i32;
        if self.0 < -Self::EVAL_INF.0 { Value(self.0 - h) }
        else if self.0 > Self::EVAL_INF.0 { Value(self.0 + h) }
        else { self }
    }

    pub fn from_trans(self, height: usize) -> Value {
        let h = height as i32;
        if self.0 < -Self::EVAL_INF.0 { Value(self.0 + h) }
        else if self.0 > Self::EVAL_INF.0 { Value(self.0 - h) }
        else { self }
    }

    pub fn piece(piece: cozy_chess::Piece) -> i32 {
        use cozy_chess::Piece::*;
        match piece {
            Pawn => Self::PAWN,
            Knight => Self::KNIGHT,
            Bishop => Self::BISHOP,
            Rook => Self::ROOK,
            Queen => Self::QUEEN,
            King => Self::KING,
        }
    }
}

impl fmt::Display for Value {
    /// UCI `score` payload: `cp N` or `mate N`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() { write!(f, "mate {}", self.mate_distance()) } else { write!(f, "cp {}", self.0) }
    }
}

impl Neg for Value {
    type Output = Value;
    fn neg(self) -> Value { Value(-self.0) }
}

impl Add<i32> for Value {
    type Output = Value;
    fn add(self, rhs: i32) -> Value { Value(self.0 + rhs) }
}

impl Sub<i32> for Value {
    type Output = Value;
    fn sub(self, rhs: i32) -> Value { Value(self.0 - rhs) }
}

impl Add for Value {
    type Output = Value;
    fn add(self, rhs: Value) -> Value { Value(self.0 + rhs.0) }
}

impl Sub for Value {
    type Output = Value;
    fn sub(self, rhs: Value) -> Value { Value(self.0 - rhs.0) }
}

impl AddAssign<i32> for Value {
    fn add_assign(&mut self, rhs: i32) { self.0 += rhs; }
}

impl SubAssign<i32> for Value {
    fn sub_assign(&mut self, rhs: i32) { self.0 -= rhs; }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_display() {
        assert_eq!(Value::mate_in(3).to_string(), "mate 2");
        assert_eq!(Value::mated_in(2).to_string(), "mate -1");
        assert_eq!(Value(37).to_string(), "cp 37");
    }
}
