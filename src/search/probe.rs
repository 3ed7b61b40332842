use cozy_chess::Move;

use crate::board::Position;
use super::value::Value;

/// Opening book and endgame tablebase hooks. Values returned by
/// `probe_tablebase` are from the side to move's point of view and may use
/// the mate encoding of [`Value`].
pub trait Probes: Send + Sync {
    fn probe_book(&self, _pos: &Position) -> Option<Move> { None }

    fn probe_tablebase(&self, _pos: &Position) -> Option<Value> { None }

    /// Largest piece count (kings included) the tablebases cover.
    fn tablebase_pieces(&self) -> usize { 0 }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProbes;

impl Probes for NoProbes {}
