use cozy_chess::Move;
use std::sync::atomic::{AtomicI16, AtomicI32, AtomicU16, Ordering};

use crate::board::{decode_move, encode_move, Position};
use super::threads::THREAD_MAX;
use super::value::{Depth, Value, HEIGHT_MAX, ONE_PLY};

pub const HISTORY_SIZE: usize = 12 * 64;
pub const HISTORY_MAX: u16 = 16384;
pub const HISTORY_CEILING: i32 = 8192 * 4;
pub const HISTORY_EVAL_MAX: i32 = 2048;
pub const PROB_MAX: i32 = 16384;

/// Killer moves per (thread, height) and the shared history statistics. All
/// fields are relaxed atomics: concurrent updates may lose increments, which
/// only blurs move ordering.
pub struct MoveOrderingTables {
    killers: Vec<[AtomicU16; 2]>,
    history: Vec<AtomicI32>,
    hit: Vec<AtomicU16>,
    tot: Vec<AtomicU16>,
    hist_eval: Vec<AtomicI16>,
}

fn halve(h: i32) -> i32 { if h >= 0 { (h + 1) / 2 } else { (h - 1) / 2 } }

impl MoveOrderingTables {
    pub fn new() -> Self {
        let tables = Self {
            killers: (0..THREAD_MAX * HEIGHT_MAX).map(|_| [AtomicU16::new(0), AtomicU16::new(0)]).collect(),
            history: (0..HISTORY_SIZE).map(|_| AtomicI32::new(0)).collect(),
            hit: (0..HISTORY_SIZE).map(|_| AtomicU16::new(1)).collect(),
            tot: (0..HISTORY_SIZE).map(|_| AtomicU16::new(1)).collect(),
            hist_eval: (0..HISTORY_SIZE).map(|_| AtomicI16::new(0)).collect(),
        };
        tables.clear();
        tables
    }

    fn slot(&self, thread: usize, height: usize) -> &[AtomicU16; 2] {
        &self.killers[thread * HEIGHT_MAX + height.min(HEIGHT_MAX - 1)]
    }

    pub fn clear(&self) {
        self.clear_killers();
        for i in 0..HISTORY_SIZE {
            self.history[i].store(0, Ordering::Relaxed);
            self.hit[i].store(1, Ordering::Relaxed);
            self.tot[i].store(1, Ordering::Relaxed);
            self.hist_eval[i].store(0, Ordering::Relaxed);
        }
    }

    pub fn clear_killers(&self) {
        for k in &self.killers {
            k[0].store(0, Ordering::Relaxed);
            k[1].store(0, Ordering::Relaxed);
        }
    }

    pub fn killers(&self, thread: usize, height: usize) -> [Option<Move>; 2] {
        let k = self.slot(thread, height);
        [decode_move(k[0].load(Ordering::Relaxed)), decode_move(k[1].load(Ordering::Relaxed))]
    }

    /// Seeds `dst`'s killers with `src`'s for heights `from..to`.
    pub fn killer_copy(&self, dst: usize, src: usize, from: usize, to: usize) {
        for h in from..to.min(HEIGHT_MAX) {
            let (s, d) = (self.slot(src, h), self.slot(dst, h));
            d[0].store(s[0].load(Ordering::Relaxed), Ordering::Relaxed);
            d[1].store(s[1].load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    fn rescale(&self) {
        for h in &self.history {
            h.store(halve(h.load(Ordering::Relaxed)), Ordering::Relaxed);
        }
    }

    fn bump_total(&self, index: usize) {
        let tot = self.tot[index].fetch_add(1, Ordering::Relaxed) + 1;
        if tot >= HISTORY_MAX {
            let hit = self.hit[index].load(Ordering::Relaxed);
            self.hit[index].store((hit + 1) / 2, Ordering::Relaxed);
            self.tot[index].store((tot + 1) / 2, Ordering::Relaxed);
        }
    }

    /// Quiet `mv` was best at this node: make it the first killer and raise
    /// its history. `cut` marks an actual beta cutoff.
    pub fn record_cutoff(&self, mv: Move, pos: &Position, depth: Depth, height: usize, thread: usize, cut: bool) {
        if pos.is_tactical(mv) { return; }
        let code = encode_move(Some(mv));
        let k = self.slot(thread, height);
        let first = k[0].load(Ordering::Relaxed);
        if first != code {
            k[1].store(first, Ordering::Relaxed);
            k[0].store(code, Ordering::Relaxed);
        }

        let index = pos.history_index(mv);
        let value = self.history[index].fetch_add(depth * depth, Ordering::Relaxed) + depth * depth;
        if value > HISTORY_CEILING { self.rescale(); }

        if cut {
            self.hit[index].fetch_add(1, Ordering::Relaxed);
            self.bump_total(index);
        }
    }

    /// Quiet `mv` was searched before the move that cut off.
    pub fn record_failure(&self, mv: Move, pos: &Position, depth: Depth) {
        if pos.is_tactical(mv) { return; }
        let index = pos.history_index(mv);
        let value = self.history[index].fetch_sub(depth * depth, Ordering::Relaxed) - depth * depth;
        if value < -HISTORY_CEILING { self.rescale(); }
        self.bump_total(index);
    }

    pub fn history(&self, index: usize) -> i32 { self.history[index].load(Ordering::Relaxed) }

    /// Empirical cutoff rate of a quiet move in 0..=16384.
    pub fn history_prob(&self, index: usize) -> i32 {
        let hit = self.hit[index].load(Ordering::Relaxed) as i32;
        let tot = (self.tot[index].load(Ordering::Relaxed) as i32).max(1);
        (hit * PROB_MAX / tot).min(PROB_MAX)
    }

    /// Ordering key of a quiet move: history, a bonus for any positive
    /// history, and the best static-eval gain the move produced.
    pub fn quiet_score(&self, index: usize) -> i32 {
        let mut value = self.history(index);
        if value > 0 { value += HISTORY_EVAL_MAX; }
        value += self.hist_eval[index].load(Ordering::Relaxed) as i32;
        value / ONE_PLY
    }

    /// Tracks the largest eval swing a quiet move has produced. Values decay
    /// slowly when the move does worse; 0 stays reserved for "never seen".
    pub fn move_eval(&self, index: usize, gain: Value) {
        let value = gain.0.clamp(-Value::QUEEN, Value::QUEEN);
        let cell = &self.hist_eval[index];
        let best = cell.load(Ordering::Relaxed) as i32;
        if value >= best {
            cell.store(if value == 0 { 1 } else { value } as i16, Ordering::Relaxed);
        } else if best > -Value::QUEEN {
            let step = if best == 1 { 2 } else { 1 };
            cell.store((best - step) as i16, Ordering::Relaxed);
        }
    }

    pub(crate) fn hist_eval(&self, index: usize) -> i32 { self.hist_eval[index].load(Ordering::Relaxed) as i32 }
}

impl Default for MoveOrderingTables {
    fn default() -> Self { Self::new() }
}
