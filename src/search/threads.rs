use cozy_chess::Move;
use log::{debug, trace};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::board::Position;
use super::engine::SearchContext;
use super::sort::MoveSorter;
use super::value::{Depth, Value};
use super::worker::{NodeType, SearchWorker};

pub const THREAD_MAX: usize = 16;
pub const SPLIT_MAX: usize = 8;
pub const SLAVE_MAX: usize = 4;

pub const THREAD_STACK: usize = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Parked between searches; never booked.
    Sleeping,
    /// Waiting for work; may be booked into a split point.
    Idle,
    Booked,
    /// Booked and handed a split point, not yet picked up.
    Working,
    Searching,
    Exited,
}

/// Mutable state of a split node, shared by its participants under one lock.
pub struct SplitState {
    pub sorter: MoveSorter,
    pub alpha: Value,
    pub best_value: Value,
    pub best_move: Option<Move>,
    pub played: Vec<Move>,
    pub pv: Vec<Move>,
    pub end: bool,
}

/// A node whose remaining moves are searched by several threads. Immutable
/// node parameters sit outside the lock, the move loop state inside it.
pub struct SplitPoint {
    pub master: usize,
    pub parent: Option<Arc<SplitPoint>>,
    pub pos: Position,
    pub old_alpha: Value,
    pub beta: Value,
    pub depth: Depth,
    pub height: usize,
    pub node_type: NodeType,
    pub eval: Value,
    pub in_check: bool,
    pub ctx: Arc<SearchContext>,
    slaves: AtomicU32,
    active: AtomicUsize,
    cut: AtomicBool,
    state: Mutex<SplitState>,
}

impl SplitPoint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: Arc<SearchContext>,
        master: usize,
        parent: Option<Arc<SplitPoint>>,
        pos: Position,
        window: (Value, Value),
        depth: Depth,
        height: usize,
        node_type: NodeType,
        eval: Value,
        in_check: bool,
        slaves: u32,
        state: SplitState,
    ) -> Self {
        let (old_alpha, beta) = window;
        Self {
            master,
            parent,
            pos,
            old_alpha,
            beta,
            depth,
            height,
            node_type,
            eval,
            in_check,
            ctx,
            active: AtomicUsize::new(slaves.count_ones() as usize + 1),
            slaves: AtomicU32::new(slaves),
            cut: AtomicBool::new(false),
            state: Mutex::new(state),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SplitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn has_slave(&self, id: usize) -> bool { self.slaves.load(Ordering::Relaxed) & (1 << id) != 0 }

    pub fn is_cut(&self) -> bool { self.cut.load(Ordering::Relaxed) }

    pub fn set_cut(&self) { self.cut.store(true, Ordering::Relaxed) }

    pub fn active(&self) -> usize { self.active.load(Ordering::Acquire) }
}

struct ThreadSlot {
    stage: Stage,
    /// Split points this thread is master of, innermost last.
    splits: Vec<Arc<SplitPoint>>,
    work: Option<Arc<SplitPoint>>,
}

pub(crate) struct PoolState {
    slots: Vec<ThreadSlot>,
}

impl PoolState {
    /// Some idle thread could help `master`: it has no split of its own, or
    /// its innermost split already employs `master` (helping it finishes
    /// that split sooner).
    fn is_free(&self, master: usize) -> bool {
        self.slots.iter().any(|slot| {
            slot.stage == Stage::Idle && slot.splits.last().map_or(true, |sp| sp.has_slave(master))
        })
    }
}

/// Shared half of the pool, reachable from every search context.
pub struct PoolShared {
    state: Mutex<PoolState>,
    cond: Condvar,
    idle: AtomicUsize,
    size: usize,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_stage(&self, state: &mut PoolState, id: usize, stage: Stage) {
        let old = std::mem::replace(&mut state.slots[id].stage, stage);
        if old == Stage::Idle && stage != Stage::Idle { self.idle.fetch_sub(1, Ordering::Relaxed); }
        if old != Stage::Idle && stage == Stage::Idle { self.idle.fetch_add(1, Ordering::Relaxed); }
    }

    pub fn size(&self) -> usize { self.size }

    /// Unlocked hint; `book` re-checks under the lock.
    pub fn has_idle(&self) -> bool { self.idle.load(Ordering::Relaxed) > 0 }

    /// Reserves `master` and up to `SLAVE_MAX` free threads for a new split
    /// point. Returns the slave bitmask, or `None` when the split is declined.
    pub fn book(&self, master: usize) -> Option<u32> {
        let mut state = self.lock();
        if state.slots[master].splits.len() >= SPLIT_MAX || !state.is_free(master) {
            trace!("thread {master}: split declined");
            return None;
        }
        self.set_stage(&mut state, master, Stage::Booked);
        let mut slaves = 0u32;
        let mut count = 1;
        for id in 0..state.slots.len() {
            if count > SLAVE_MAX { break; }
            let slot = &state.slots[id];
            if id == master || slot.stage != Stage::Idle { continue; }
            if let Some(top) = slot.splits.last() {
                if !top.has_slave(master) { continue; }
            }
            self.set_stage(&mut state, id, Stage::Booked);
            slaves |= 1 << id;
            count += 1;
        }
        if slaves == 0 {
            self.set_stage(&mut state, master, Stage::Searching);
            return None;
        }
        Some(slaves)
    }

    /// Publishes `split` to its booked slaves and wakes them.
    pub fn start(&self, split: &Arc<SplitPoint>) {
        let mut state = self.lock();
        state.slots[split.master].splits.push(Arc::clone(split));
        for id in 0..state.slots.len() {
            if split.has_slave(id) {
                state.slots[id].work = Some(Arc::clone(split));
                self.set_stage(&mut state, id, Stage::Working);
            }
        }
        self.set_stage(&mut state, split.master, Stage::Searching);
        self.cond.notify_all();
    }

    /// Called by every participant once it stops taking moves from `split`.
    pub fn leave(&self, split: &SplitPoint, id: usize) {
        let _state = self.lock();
        split.slaves.fetch_and(!(1u32 << id), Ordering::Relaxed);
        split.active.fetch_sub(1, Ordering::Release);
        self.cond.notify_all();
    }

    /// Helpful master: wait for the other participants of `split`, searching
    /// any split point handed to this thread meanwhile.
    pub fn wait(&self, worker: &mut SearchWorker, split: &Arc<SplitPoint>) {
        let id = worker.id();
        let mut state = self.lock();
        self.set_stage(&mut state, id, Stage::Idle);
        loop {
            match state.slots[id].stage {
                Stage::Working => {
                    if let Some(work) = state.slots[id].work.take() {
                        self.set_stage(&mut state, id, Stage::Searching);
                        drop(state);
                        worker.help(&work);
                        state = self.lock();
                    }
                    self.set_stage(&mut state, id, Stage::Idle);
                    self.cond.notify_all();
                    continue;
                }
                // booked by a slave of ours; its split point is on the way
                Stage::Booked => {}
                _ if split.active() == 0 => {
                    self.set_stage(&mut state, id, Stage::Searching);
                    state.slots[id].splits.pop();
                    return;
                }
                _ => {}
            }
            if id == 0 {
                // the main thread keeps the clock running while it waits
                let (guard, _) = self.cond.wait_timeout(state, Duration::from_millis(5)).unwrap_or_else(|e| e.into_inner());
                state = guard;
                worker.search_check();
            } else {
                state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        }
    }

    /// Makes the helpers bookable for a new search; `main` starts searching.
    pub fn wake(&self, main: usize) {
        let mut state = self.lock();
        for id in 0..state.slots.len() {
            state.slots[id].splits.clear();
            state.slots[id].work = None;
            let stage = if id == main { Stage::Searching } else { Stage::Idle };
            self.set_stage(&mut state, id, stage);
        }
    }

    pub fn sleep(&self) {
        let mut state = self.lock();
        for id in 0..state.slots.len() {
            self.set_stage(&mut state, id, Stage::Sleeping);
        }
    }

    pub fn stage(&self, id: usize) -> Stage { self.lock().slots[id].stage }
}

fn helper_loop(shared: Arc<PoolShared>, id: usize) {
    let mut state = shared.lock();
    loop {
        match state.slots[id].stage {
            Stage::Exited => break,
            Stage::Working => {
                let Some(split) = state.slots[id].work.take() else {
                    shared.set_stage(&mut state, id, Stage::Idle);
                    continue;
                };
                shared.set_stage(&mut state, id, Stage::Searching);
                drop(state);
                let mut worker = SearchWorker::new(id, Arc::clone(&split.ctx));
                worker.help(&split);
                state = shared.lock();
                if state.slots[id].stage == Stage::Searching { shared.set_stage(&mut state, id, Stage::Idle); }
                shared.cond.notify_all();
            }
            _ => state = shared.cond.wait(state).unwrap_or_else(|e| e.into_inner()),
        }
    }
    debug!("helper thread {id} exited");
}

/// Fixed set of OS threads cooperating on one search. Thread 0 is whichever
/// thread runs the coordinator; helpers are spawned for ids `1..size`.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, THREAD_MAX);
        let slots = (0..size).map(|_| ThreadSlot { stage: Stage::Sleeping, splits: Vec::new(), work: None }).collect();
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState { slots }),
            cond: Condvar::new(),
            idle: AtomicUsize::new(0),
            size,
        });
        let mut handles = Vec::with_capacity(size.saturating_sub(1));
        for id in 1..size {
            let shared = Arc::clone(&shared);
            let spawned = std::thread::Builder::new()
                .name(format!("splitbot-helper-{id}"))
                .stack_size(THREAD_STACK)
                .spawn(move || helper_loop(shared, id));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => log::warn!("could not spawn helper thread {id}: {e}"),
            }
        }
        debug!("thread pool ready with {} helpers", handles.len());
        Self { shared, handles }
    }

    pub fn size(&self) -> usize { self.shared.size }

    pub fn shared(&self) -> Arc<PoolShared> { Arc::clone(&self.shared) }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            for id in 0..state.slots.len() {
                self.shared.set_stage(&mut state, id, Stage::Exited);
            }
            self.shared.cond.notify_all();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
