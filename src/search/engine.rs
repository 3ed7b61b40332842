use cozy_chess::Move;
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::Position;
use super::eval::{Evaluator, PstEvaluator};
use super::history::MoveOrderingTables;
use super::probe::{NoProbes, Probes};
use super::sort::score_root_moves;
use super::threads::{PoolShared, ThreadPool, THREAD_MAX};
use super::time::TimeLimits;
use super::tt::{TranspositionTable, HASH_MB_DEFAULT};
use super::value::{Depth, Value, DEPTH_MAX, ONE_PLY};
use super::worker::{Bound, NodeType, RootKind, RootList, SearchWorker, CHECK_INC};

const SHORT_SEARCH_DEPTH: Depth = 1;
const EASY_THRESHOLD: i32 = 150;
const EASY_RATIO: f64 = 0.20;
const EARLY_RATIO: f64 = 0.60;
const WIDTH_START: i32 = 1;
const WIDTH_FACTOR: i32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Iteration limit in plies; 0 searches until another limit hits.
    pub depth: u32,
    pub max_nodes: Option<u64>,
    pub movetime: Option<Duration>,
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
    pub ponder: bool,
    pub multi_pv: usize,
    /// Score of a drawn position for either side.
    pub contempt: i32,
    /// 0 keeps the engine's current thread count.
    pub threads: usize,
    pub use_tt: bool,
    pub use_null: bool,
    pub use_razor: bool,
    pub use_static_null: bool,
    pub use_iid: bool,
    pub use_lmr: bool,
    pub use_futility: bool,
    pub use_delta: bool,
    pub use_aspiration: bool,
    pub use_book: bool,
    pub use_tablebase: bool,
    pub aspiration_depth: u32,
    pub aspiration_window: i32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            depth: 0,
            max_nodes: None,
            movetime: None,
            wtime: None,
            btime: None,
            winc: None,
            binc: None,
            movestogo: None,
            infinite: false,
            ponder: false,
            multi_pv: 1,
            contempt: 0,
            threads: 0,
            use_tt: true,
            use_null: true,
            use_razor: true,
            use_static_null: true,
            use_iid: true,
            use_lmr: true,
            use_futility: true,
            use_delta: true,
            use_aspiration: true,
            use_book: true,
            use_tablebase: true,
            aspiration_depth: 4,
            aspiration_window: 16,
        }
    }
}

/// Stop and ponder flags shared with whoever drives the search, usually the
/// protocol thread.
#[derive(Debug, Default)]
pub struct SearchControl {
    stop: AtomicBool,
    infinite: AtomicBool,
}

impl SearchControl {
    pub fn stop(&self) { self.stop.store(true, Ordering::Relaxed); }

    /// The pondered move was played: normal limits apply from now on.
    pub fn ponderhit(&self) { self.infinite.store(false, Ordering::Relaxed); }

    pub fn stop_requested(&self) -> bool { self.stop.load(Ordering::Relaxed) }

    pub fn is_infinite(&self) -> bool { self.infinite.load(Ordering::Relaxed) }

    /// Clears the stop flag before a search. Callers that start the search on
    /// another thread arm it first so an early `stop` is not lost.
    pub fn arm(&self, infinite: bool) {
        self.stop.store(false, Ordering::Relaxed);
        self.infinite.store(infinite, Ordering::Relaxed);
    }
}

/// Everything the workers of one search share.
pub struct SearchContext {
    pub(crate) tt: Arc<TranspositionTable>,
    pub(crate) tables: Arc<MoveOrderingTables>,
    pub(crate) evaluator: Arc<dyn Evaluator>,
    pub(crate) probes: Arc<dyn Probes>,
    pub(crate) pool: Arc<PoolShared>,
    pub(crate) control: Arc<SearchControl>,
    pub(crate) params: SearchParams,
    pub(crate) limits: Option<TimeLimits>,
    pub(crate) depth_limit: Depth,
    pub(crate) node_limit: Option<u64>,
    pub(crate) check_inc: i64,
    pub(crate) draw: Value,
    pub(crate) start: Instant,
    pub(crate) search_stop: AtomicBool,
    pub(crate) nodes: AtomicU64,
    pub(crate) seldepth: AtomicUsize,
}

impl SearchContext {
    pub fn nodes(&self) -> u64 { self.nodes.load(Ordering::Relaxed) }

    pub fn elapsed(&self) -> Duration { self.start.elapsed() }
}

/// Progress report sent after every root pass.
#[derive(Debug, Clone)]
pub struct IterationInfo {
    pub depth: u32,
    pub seldepth: usize,
    pub multipv: usize,
    pub score: Value,
    pub bound: Bound,
    pub pv: Vec<Move>,
    pub nodes: u64,
    pub elapsed: Duration,
    pub hashfull: usize,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: Value,
    pub pv: Vec<Move>,
    pub depth: u32,
    pub seldepth: usize,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl Default for SearchResult {
    fn default() -> Self {
        Self {
            best_move: None,
            ponder_move: None,
            score: Value::DRAW,
            pv: Vec::new(),
            depth: 0,
            seldepth: 0,
            nodes: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Iterative-deepening driver. Owns the shared tables and the thread pool,
/// which persist across searches of one game.
pub struct Searcher {
    tt: Arc<TranspositionTable>,
    tables: Arc<MoveOrderingTables>,
    pool: ThreadPool,
    evaluator: Arc<dyn Evaluator>,
    probes: Arc<dyn Probes>,
    control: Arc<SearchControl>,
}

impl Default for Searcher {
    fn default() -> Self {
        Self {
            tt: Arc::new(TranspositionTable::new(HASH_MB_DEFAULT)),
            tables: Arc::new(MoveOrderingTables::new()),
            pool: ThreadPool::new(1),
            evaluator: Arc::new(PstEvaluator),
            probes: Arc::new(NoProbes),
            control: Arc::new(SearchControl::default()),
        }
    }
}

impl Searcher {
    pub fn new(hash_mb: usize, threads: usize) -> Self {
        let mut searcher = Self::default();
        searcher.set_hash_mb(hash_mb);
        searcher.set_threads(threads);
        searcher
    }

    pub fn threads(&self) -> usize { self.pool.size() }

    pub fn set_threads(&mut self, threads: usize) {
        if threads.clamp(1, THREAD_MAX) != self.pool.size() {
            self.pool = ThreadPool::new(threads);
        }
    }

    pub fn set_hash_mb(&mut self, mb: usize) { self.tt = Arc::new(TranspositionTable::new(mb)); }

    /// Table of exactly `entries` slots (rounded to whole clusters); for tests.
    pub fn set_hash_entries(&mut self, entries: usize) { self.tt = Arc::new(TranspositionTable::with_entries(entries)); }

    pub fn clear_hash(&mut self) { self.tt.clear(); }

    pub fn new_game(&mut self) {
        self.tt.clear();
        self.tables.clear();
    }

    pub fn set_evaluator(&mut self, evaluator: Arc<dyn Evaluator>) { self.evaluator = evaluator; }

    pub fn set_probes(&mut self, probes: Arc<dyn Probes>) { self.probes = probes; }

    pub fn tt(&self) -> &TranspositionTable { &self.tt }

    pub fn tables(&self) -> &MoveOrderingTables { &self.tables }

    /// Handle for stopping or releasing (ponderhit) a running search.
    pub fn stop_handle(&self) -> Arc<SearchControl> { Arc::clone(&self.control) }

    pub fn stop(&self) { self.control.stop(); }

    pub fn search_with_params(&mut self, pos: &Position, params: SearchParams) -> SearchResult {
        self.search_with_callback(pos, params, |_| {})
    }

    /// Quiescence value of `pos` with a full window; for tests and benches.
    pub fn qsearch(&mut self, pos: &Position) -> Value {
        let ctx = Arc::new(self.context(SearchParams::default(), None, DEPTH_MAX, None));
        let mut worker = SearchWorker::new(0, Arc::clone(&ctx));
        let mut pos = pos.clone();
        let mut pv = Vec::new();
        worker.quiescence(&ctx, &mut pos, -Value::INF, Value::INF, 0, 0, &mut pv, NodeType::Pv)
    }

    /// Value of one full-width search of `pos` at `depth` plies inside
    /// `(alpha, beta)`, with no iterative deepening around it. Fail-soft, so
    /// the result may lie outside the window.
    pub fn search_window(&mut self, pos: &Position, params: SearchParams, depth: u32, alpha: Value, beta: Value) -> Value {
        self.control.arm(false);
        let depth = (depth as Depth).clamp(1, DEPTH_MAX);
        let ctx = Arc::new(self.context(params, None, depth, None));
        let mut worker = SearchWorker::new(0, Arc::clone(&ctx));
        let mut pos = pos.clone();
        let mut pv = Vec::new();
        let node_type = if beta.0 == alpha.0 + 1 { NodeType::Cut } else { NodeType::Pv };
        worker.full_search(&ctx, &mut pos, alpha, beta, depth * ONE_PLY, 0, &mut pv, node_type, false)
    }

    fn context(&self, params: SearchParams, limits: Option<TimeLimits>, depth_limit: Depth, node_limit: Option<u64>) -> SearchContext {
        let check_inc = node_limit.map_or(CHECK_INC, |n| (n as i64 / 8).clamp(64, CHECK_INC));
        SearchContext {
            tt: Arc::clone(&self.tt),
            tables: Arc::clone(&self.tables),
            evaluator: Arc::clone(&self.evaluator),
            probes: Arc::clone(&self.probes),
            pool: self.pool.shared(),
            control: Arc::clone(&self.control),
            params,
            limits,
            depth_limit,
            node_limit,
            check_inc,
            draw: Value(params.contempt),
            start: Instant::now(),
            search_stop: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            seldepth: AtomicUsize::new(0),
        }
    }

    fn time_limits(pos: &Position, params: &SearchParams) -> Option<TimeLimits> {
        if let Some(movetime) = params.movetime {
            return Some(TimeLimits::fixed(movetime));
        }
        let (time, inc) = match pos.side_to_move() {
            cozy_chess::Color::White => (params.wtime, params.winc),
            cozy_chess::Color::Black => (params.btime, params.binc),
        };
        time.map(|t| TimeLimits::allocate(t, inc.unwrap_or_default(), params.movestogo, params.ponder))
    }

    pub fn search_with_callback<F: FnMut(&IterationInfo)>(
        &mut self,
        pos: &Position,
        params: SearchParams,
        on_iteration: F,
    ) -> SearchResult {
        self.control.arm(params.infinite || params.ponder);
        self.search_armed(pos, params, on_iteration)
    }

    /// Like `search_with_callback` but keeps the control state set by
    /// `SearchControl::arm`.
    pub fn search_armed<F: FnMut(&IterationInfo)>(
        &mut self,
        pos: &Position,
        params: SearchParams,
        mut on_iteration: F,
    ) -> SearchResult {
        if params.threads > 0 { self.set_threads(params.threads); }
        let infinite = params.infinite || params.ponder;

        let legal = pos.legal_moves();
        if legal.is_empty() {
            let score = if pos.in_check() { Value::mated_in(0) } else { Value(params.contempt) };
            return SearchResult { score, ..SearchResult::default() };
        }

        if params.use_book && !infinite {
            if let Some(mv) = self.probes.probe_book(pos).filter(|&mv| legal.contains(&mv)) {
                debug!("book move {}", pos.move_to_uci(mv));
                return SearchResult { best_move: Some(mv), score: Value(1), pv: vec![mv], depth: 1, ..SearchResult::default() };
            }
        }

        let mut depth_limit = if params.depth == 0 { DEPTH_MAX } else { (params.depth as Depth).min(DEPTH_MAX) };
        if legal.len() <= 1 { depth_limit = depth_limit.min(1); }
        let limits = Self::time_limits(pos, &params);
        let node_limit = params.max_nodes;

        self.tt.inc_date();
        self.tables.clear_killers();

        let ctx = Arc::new(self.context(params, limits, depth_limit, node_limit));
        let mut worker = SearchWorker::new(0, Arc::clone(&ctx));
        let mut root_pos = pos.clone();

        let trans = if params.use_tt { self.tt.retrieve(pos.key(), true).and_then(|h| h.mv) } else { None };
        let mut list = RootList::new(score_root_moves(pos, &self.tables, trans, 0));
        let multi = params.multi_pv.clamp(1, list.len());

        ctx.pool.wake(0);

        let mut completed = 0;
        for depth in 1..DEPTH_MAX {
            worker.root.bad_1 = false;
            worker.root.change = false;
            worker.root.research = false;

            let kind = if multi > 1 {
                RootKind::Multi
            } else if depth <= SHORT_SEARCH_DEPTH {
                RootKind::Short
            } else {
                RootKind::Normal
            };

            let finished = Self::search_root(&mut worker, &mut root_pos, &mut list, depth, kind);
            if finished { completed = depth; }
            self.report(&ctx, &worker, multi, &mut on_iteration);

            worker.root.can_stop = true;
            if ctx.search_stop.load(Ordering::Relaxed) { break; }

            if depth == 1 && list.len() >= 2 && list.values[0] >= list.values[1] + EASY_THRESHOLD {
                worker.root.easy = true;
            }
            if depth > 1 {
                worker.root.bad_2 = worker.root.bad_1;
                worker.root.bad_1 = false;
            }
            if let Some(best) = worker.root.best.as_ref() { worker.root.last_value = best.value; }

            let root = &mut worker.root;
            if depth >= depth_limit { root.flag = true; }
            if let Some(limits) = limits {
                let time = ctx.elapsed();
                if time >= limits.limit_1 && !root.bad_2 { root.flag = true; }
                if root.easy && time >= limits.limit_1.mul_f64(EASY_RATIO) { root.flag = true; }
                if time >= limits.limit_1.mul_f64(EARLY_RATIO) && !root.bad_2 && !root.change { root.flag = true; }
            }
            if let Some(n) = node_limit {
                if ctx.nodes() >= n { root.flag = true; }
            }

            debug!(
                "depth {depth} done: nodes {} time {:?} easy {} bad {} change {}",
                ctx.nodes(),
                ctx.elapsed(),
                root.easy,
                root.bad_2,
                root.change
            );

            if root.can_stop && (self.control.stop_requested() || (root.flag && !self.control.is_infinite())) {
                break;
            }
        }

        ctx.pool.sleep();
        self.result(&ctx, &worker, pos, completed)
    }

    /// Aspiration loop around one root iteration. False when stopped.
    fn search_root(worker: &mut SearchWorker, pos: &mut Position, list: &mut RootList, depth: Depth, kind: RootKind) -> bool {
        let params = worker.params();
        let delta = params.aspiration_window.max(1);
        let aspiration_depth = params.aspiration_depth as Depth;
        let use_aspiration = params.use_aspiration;

        let (mut alpha, mut beta) = if depth < aspiration_depth || !use_aspiration || kind == RootKind::Multi {
            (-Value::INF, Value::INF)
        } else if !worker.root.last_value.is_win() {
            (worker.root.last_value - delta, worker.root.last_value + delta)
        } else {
            (-Value::INF, Value::INF)
        };

        let mut recursion = WIDTH_START;
        let mut previous: Option<(Bound, Move)> = None;
        let mut value = Value::DRAW;

        loop {
            let bound = worker.root.best.as_ref().map(|b| b.bound);
            if !value.is_win() {
                match bound {
                    Some(Bound::Upper) => alpha = (alpha - delta * recursion).max(-Value::INF),
                    Some(Bound::Lower) => beta = (beta + delta * recursion).min(Value::INF),
                    _ => {}
                }
            } else {
                alpha = -Value::INF;
                beta = Value::INF;
            }

            match worker.full_root(pos, list, alpha, beta, depth * ONE_PLY, kind) {
                Some(v) => value = v,
                None => return false,
            }

            let Some(best) = worker.root.best.as_ref() else { return true };
            let current = (best.bound, best.mv);
            if recursion == WIDTH_START || previous == Some(current) {
                recursion += WIDTH_FACTOR;
            } else {
                recursion = WIDTH_START;
            }
            previous = Some(current);

            if !(use_aspiration && best.bound != Bound::Exact && depth >= aspiration_depth) {
                return true;
            }
        }
    }

    fn report<F: FnMut(&IterationInfo)>(&self, ctx: &SearchContext, worker: &SearchWorker, multi: usize, on_iteration: &mut F) {
        let seldepth = ctx.seldepth.load(Ordering::Relaxed).max(worker.seldepth());
        let hashfull = self.tt.hashfull();
        let lines: Vec<_> = if multi > 1 {
            worker.root.lines.iter().take(multi).cloned().collect()
        } else {
            worker.root.best.iter().cloned().collect()
        };
        for (i, line) in lines.into_iter().enumerate() {
            on_iteration(&IterationInfo {
                depth: line.depth as u32,
                seldepth,
                multipv: i + 1,
                score: line.value,
                bound: line.bound,
                pv: line.pv,
                nodes: ctx.nodes(),
                elapsed: ctx.elapsed(),
                hashfull,
            });
        }
    }

    fn result(&self, ctx: &SearchContext, worker: &SearchWorker, pos: &Position, completed: Depth) -> SearchResult {
        let Some(best) = worker.root.best.as_ref() else {
            return SearchResult { nodes: ctx.nodes(), elapsed: ctx.elapsed(), ..SearchResult::default() };
        };
        let mut ponder_move = best.pv.get(1).copied();
        if ponder_move.is_none() && ctx.params.use_tt {
            let mut next = pos.clone();
            next.make_move(best.mv);
            ponder_move = self.tt.retrieve(next.key(), false).and_then(|h| h.mv).filter(|&mv| next.is_legal(mv));
        }
        debug!("search done: best {} score {} nodes {}", pos.move_to_uci(best.mv), best.value, ctx.nodes());
        SearchResult {
            best_move: Some(best.mv),
            ponder_move,
            score: best.value,
            pv: best.pv.clone(),
            depth: completed.max(best.depth) as u32,
            seldepth: ctx.seldepth.load(Ordering::Relaxed),
            nodes: ctx.nodes(),
            elapsed: ctx.elapsed(),
        }
    }
}
