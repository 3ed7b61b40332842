use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use splitbot::search::tt::{TranspositionTable, CLUSTER_SIZE, DATE_SIZE};
use splitbot::search::Value;

fn key(i: u64) -> u64 { (i + 1) << 32 }

fn fill_over_dates(tt: &TranspositionTable) {
    for i in 0..CLUSTER_SIZE as u64 {
        tt.store(key(i), None, 5, Value(0), Value(0), Value(0));
        tt.inc_date();
    }
}

#[test]
fn aging_evicts_oldest_at_equal_depth() {
    let tt = TranspositionTable::with_entries(CLUSTER_SIZE);
    fill_over_dates(&tt);
    tt.store(key(99), None, 5, Value(0), Value(0), Value(0));
    assert!(tt.retrieve(key(0), false).is_none(), "oldest entry not evicted");
    assert!(tt.retrieve(key(99), false).is_some());
}

#[test]
fn refreshed_entry_survives() {
    let tt = TranspositionTable::with_entries(CLUSTER_SIZE);
    fill_over_dates(&tt);
    assert!(tt.retrieve(key(0), true).is_some());
    tt.store(key(99), None, 5, Value(0), Value(0), Value(0));
    assert!(tt.retrieve(key(0), false).is_some(), "refreshed entry was evicted");
    assert!(tt.retrieve(key(1), false).is_none(), "next oldest entry should go");
}

#[test]
fn old_deep_entry_loses_to_age() {
    let tt = TranspositionTable::with_entries(CLUSTER_SIZE);
    tt.store(key(0), None, 40, Value(0), Value(0), Value(0));
    for _ in 0..4 { tt.inc_date(); }
    for i in 1..CLUSTER_SIZE as u64 {
        tt.store(key(i), None, 2, Value(0), Value(0), Value(0));
    }
    tt.store(key(50), None, 2, Value(0), Value(0), Value(0));
    assert!(tt.retrieve(key(0), false).is_none(), "four searches old beats any depth difference");
}

#[test]
fn date_wraps() {
    let tt = TranspositionTable::with_entries(CLUSTER_SIZE);
    for _ in 0..DATE_SIZE { tt.inc_date(); }
    assert_eq!(tt.date(), 0);
}

#[test]
fn hashfull_tracks_current_search() {
    let tt = TranspositionTable::with_entries(1024);
    assert_eq!(tt.hashfull(), 0);
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..8192 {
        let k: u64 = rng.gen();
        tt.store(k | 1 << 63, None, 4, Value(0), Value(0), Value(0));
    }
    assert!(tt.hashfull() > 900, "table should be nearly full, got {}", tt.hashfull());
    tt.inc_date();
    assert_eq!(tt.hashfull(), 0, "entries from older searches do not count");
}
