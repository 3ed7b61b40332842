use cozy_chess::Move;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::board::{decode_move, encode_move};
use super::value::{Depth, Value};

pub const CLUSTER_SIZE: usize = 4;
pub const DATE_SIZE: u8 = 16;
pub const DEPTH_NONE: Depth = -128;
pub const HASH_MB_DEFAULT: usize = 16;
pub const HASH_MB_MIN: usize = 4;
pub const HASH_MB_MAX: usize = 1024;

const SLOT_BYTES: usize = 16;

/// What a probe found. Absent bounds come back as `-INF`/`+INF` with
/// `DEPTH_NONE`, an absent move as `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtHit {
    pub mv: Option<Move>,
    pub move_depth: Depth,
    pub min_depth: Depth,
    pub max_depth: Depth,
    pub min_value: Value,
    pub max_value: Value,
    pub eval: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    lock: u32,
    mv: u16,
    date: u8,
    move_depth: i8,
    min_depth: i8,
    max_depth: i8,
    min_value: i16,
    max_value: i16,
    eval: i16,
}

impl Entry {
    const EMPTY: Entry = Entry {
        lock: 0,
        mv: 0,
        date: 0,
        move_depth: DEPTH_NONE as i8,
        min_depth: DEPTH_NONE as i8,
        max_depth: DEPTH_NONE as i8,
        min_value: -Value::INF.0 as i16,
        max_value: Value::INF.0 as i16,
        eval: Value::NONE.0 as i16,
    };

    fn pack(&self) -> (u64, u64) {
        let w0 = self.lock as u64
            | (self.mv as u64) << 32
            | (self.date as u64) << 48
            | (self.move_depth as u8 as u64) << 56;
        let w1 = self.min_depth as u8 as u64
            | (self.max_depth as u8 as u64) << 8
            | (self.min_value as u16 as u64) << 16
            | (self.max_value as u16 as u64) << 32
            | (self.eval as u16 as u64) << 48;
        (w0, w1)
    }

    fn unpack(w0: u64, w1: u64) -> Entry {
        Entry {
            lock: w0 as u32,
            mv: (w0 >> 32) as u16,
            date: (w0 >> 48) as u8,
            move_depth: (w0 >> 56) as u8 as i8,
            min_depth: w1 as u8 as i8,
            max_depth: (w1 >> 8) as u8 as i8,
            min_value: (w1 >> 16) as u16 as i16,
            max_value: (w1 >> 32) as u16 as i16,
            eval: (w1 >> 48) as u16 as i16,
        }
    }

    fn deepest(&self) -> i32 {
        (self.move_depth as i32).max(self.min_depth as i32).max(self.max_depth as i32)
    }
}

/// One slot is two words. The first holds the key half XOR-ed with the
/// second, so a torn write between threads reads back as a lock mismatch.
#[derive(Default)]
struct Slot {
    keyed: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    fn load(&self) -> Entry {
        let w1 = self.data.load(Ordering::Relaxed);
        let w0 = self.keyed.load(Ordering::Relaxed) ^ w1;
        Entry::unpack(w0, w1)
    }

    fn save(&self, e: &Entry) {
        let (w0, w1) = e.pack();
        self.keyed.store(w0 ^ w1, Ordering::Relaxed);
        self.data.store(w1, Ordering::Relaxed);
    }
}

fn clamp_depth(depth: Depth) -> i8 { depth.clamp(-127, 127) as i8 }

fn age(now: u8, then: u8) -> i32 { (now.wrapping_sub(then) % DATE_SIZE) as i32 }

/// Shared hash table of search results, indexed by the low key bits and
/// verified by the high 32 bits. Lossy under concurrent writes; every reader
/// tolerates stale or missing entries.
pub struct TranspositionTable {
    slots: Vec<Slot>,
    mask: usize,
    date: AtomicU8,
}

impl TranspositionTable {
    pub fn new(mb: usize) -> Self {
        let mb = mb.clamp(HASH_MB_MIN, HASH_MB_MAX);
        Self::with_entries(mb * 1024 * 1024 / SLOT_BYTES)
    }

    /// Table of at most `entries` slots, rounded down to a power-of-two
    /// number of clusters.
    pub fn with_entries(entries: usize) -> Self {
        let clusters = (entries / CLUSTER_SIZE).max(1);
        let clusters = if clusters.is_power_of_two() { clusters } else { clusters.next_power_of_two() >> 1 };
        let mut slots = Vec::with_capacity(clusters * CLUSTER_SIZE);
        slots.resize_with(clusters * CLUSTER_SIZE, Slot::default);
        let tt = Self { slots, mask: clusters - 1, date: AtomicU8::new(0) };
        tt.clear();
        tt
    }

    pub fn capacity(&self) -> usize { self.slots.len() }

    pub fn date(&self) -> u8 { self.date.load(Ordering::Relaxed) }

    pub fn inc_date(&self) {
        let next = (self.date() + 1) % DATE_SIZE;
        self.date.store(next, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.date.store(0, Ordering::Relaxed);
        for slot in &self.slots { slot.save(&Entry::EMPTY); }
    }

    fn cluster(&self, key: u64) -> &[Slot] {
        let start = (key as usize & self.mask) * CLUSTER_SIZE;
        &self.slots[start..start + CLUSTER_SIZE]
    }

    pub fn store(&self, key: u64, mv: Option<Move>, depth: Depth, min_value: Value, max_value: Value, eval: Value) {
        debug_assert!(min_value <= max_value || min_value == -Value::INF || max_value == Value::INF);
        let lock = (key >> 32) as u32;
        let now = self.date();
        let depth8 = clamp_depth(depth);
        let cluster = self.cluster(key);

        let mut victim = 0;
        let mut worst = -32767;
        for (i, slot) in cluster.iter().enumerate() {
            let mut e = slot.load();
            if e.lock == lock {
                e.date = now;
                if eval != Value::NONE && e.eval as i32 != eval.0 { e.eval = eval.0 as i16; }
                if mv.is_some() && depth8 >= e.move_depth {
                    e.move_depth = depth8;
                    e.mv = encode_move(mv);
                }
                if min_value > -Value::INF && depth8 >= e.min_depth {
                    e.min_depth = depth8;
                    e.min_value = min_value.0 as i16;
                }
                if max_value < Value::INF && depth8 >= e.max_depth {
                    e.max_depth = depth8;
                    e.max_value = max_value.0 as i16;
                }
                slot.save(&e);
                return;
            }
            let score = age(now, e.date) * 256 - e.deepest();
            if score > worst {
                worst = score;
                victim = i;
            }
        }

        let has_min = min_value > -Value::INF;
        let has_max = max_value < Value::INF;
        let fresh = Entry {
            lock,
            mv: encode_move(mv),
            date: now,
            move_depth: if mv.is_some() { depth8 } else { DEPTH_NONE as i8 },
            min_depth: if has_min { depth8 } else { DEPTH_NONE as i8 },
            max_depth: if has_max { depth8 } else { DEPTH_NONE as i8 },
            min_value: if has_min { min_value.0 as i16 } else { -Value::INF.0 as i16 },
            max_value: if has_max { max_value.0 as i16 } else { Value::INF.0 as i16 },
            eval: eval.0 as i16,
        };
        cluster[victim].save(&fresh);
    }

    pub fn retrieve(&self, key: u64, refresh: bool) -> Option<TtHit> {
        let lock = (key >> 32) as u32;
        let now = self.date();
        for slot in self.cluster(key) {
            let mut e = slot.load();
            if e.lock != lock { continue; }
            if refresh && e.date != now {
                e.date = now;
                slot.save(&e);
            }
            return Some(TtHit {
                mv: decode_move(e.mv),
                move_depth: e.move_depth as Depth,
                min_depth: e.min_depth as Depth,
                max_depth: e.max_depth as Depth,
                min_value: Value(e.min_value as i32),
                max_value: Value(e.max_value as i32),
                eval: Value(e.eval as i32),
            });
        }
        None
    }

    /// Per-mille of sampled slots written during the current search.
    pub fn hashfull(&self) -> usize {
        let now = self.date();
        let sample = self.slots.len().min(1000);
        let used = self.slots[..sample]
            .iter()
            .map(Slot::load)
            .filter(|e| e.date == now && e.deepest() != DEPTH_NONE)
            .count();
        used * 1000 / sample.max(1)
    }
}

impl Default for TranspositionTable {
    fn default() -> Self { Self::new(HASH_MB_DEFAULT) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_keeps_negative_fields() {
        let e = Entry {
            lock: 0xDEAD_BEEF,
            mv: 0x1234,
            date: 15,
            move_depth: -3,
            min_depth: -128,
            max_depth: 100,
            min_value: -30000,
            max_value: 29990,
            eval: -32767,
        };
        let (w0, w1) = e.pack();
        assert_eq!(Entry::unpack(w0, w1), e);
    }

    #[test]
    fn cluster_count_is_power_of_two() {
        let tt = TranspositionTable::with_entries(100);
        assert_eq!(tt.capacity(), 16 * CLUSTER_SIZE);
        assert_eq!(TranspositionTable::with_entries(1).capacity(), CLUSTER_SIZE);
    }
}
