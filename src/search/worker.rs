use cozy_chess::{Move, Piece};
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::board::cozy::relative_rank;
use crate::board::Position;
use super::engine::{SearchContext, SearchParams};
use super::see::see;
use super::sort::{is_killer, is_prime, MoveSorter};
use super::threads::{SplitPoint, SplitState};
use super::value::{Depth, Value, HEIGHT_MAX, ONE_PLY};

pub const CHECK_INC: i64 = 10_000;

const RAZOR_DEPTH: Depth = 4 * ONE_PLY;
const RAZOR_MARGIN: [i32; 8] = [0, 100, 200, 300, 400, 500, 600, 700];
const STATIC_NULL_DEPTH: Depth = 4 * ONE_PLY;
const STATIC_NULL_MARGIN: [i32; 8] = [0, 100, 200, 300, 400, 500, 600, 700];

const NULL_DEPTH: Depth = 2 * ONE_PLY;
const NULL_REDUCTION: Depth = 3 * ONE_PLY;
const NULL_MARGIN: i32 = 100;
const VER_REDUCTION: Depth = 5 * ONE_PLY;

const IID_DEPTH: Depth = 3 * ONE_PLY;
const IID_REDUCTION: Depth = 2 * ONE_PLY;

const LMR_DEPTH: Depth = 4 * ONE_PLY;
const LMR_DEPTH_MAX: usize = 128;
const LMR_MOVES: usize = 256;

const FUTILITY_DEPTH: Depth = 5 * ONE_PLY;
const FUTILITY_MARGIN: [i32; 16] = [
    0, 0, 0, 0, 50, 75, 100, 200, 300, 450, 600,
    Value::INF.0, Value::INF.0, Value::INF.0, Value::INF.0, Value::INF.0,
];

pub const THREAD_DEPTH: Depth = 4 * ONE_PLY;
const TB_DEPTH: Depth = 8 * ONE_PLY;
const DELTA_MARGIN: i32 = 50;

/// A new best root value this far below the previous iteration's marks a
/// bad iteration.
pub const BAD_THRESHOLD: i32 = 50;

/// Node classification by expected outcome. Children of PV nodes on the
/// first move stay PV; cut and all nodes alternate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    All,
    Pv,
    Cut,
}

impl NodeType {
    pub fn opp(self) -> NodeType {
        match self {
            NodeType::All => NodeType::Cut,
            NodeType::Pv => NodeType::Pv,
            NodeType::Cut => NodeType::All,
        }
    }

    pub fn is_pv(self) -> bool { self == NodeType::Pv }

    fn lmr_flag(self) -> usize { if self.is_pv() { 0 } else { 1 } }
}

/// How a root value relates to its search window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RootKind {
    /// Full window on every move; used for the first iteration.
    Short,
    Normal,
    Multi,
}

/// One searched root move with its line.
#[derive(Clone, Debug)]
pub struct RootLine {
    pub mv: Move,
    pub value: Value,
    pub depth: Depth,
    pub bound: Bound,
    pub pv: Vec<Move>,
    pub nodes: u64,
    pub elapsed: Duration,
}

/// Root move list; values hold the window-clamped result of the last pass.
pub(crate) struct RootList {
    pub moves: Vec<Move>,
    pub values: Vec<Value>,
}

impl RootList {
    pub fn new(moves: Vec<Move>) -> Self {
        let values = vec![Value::NONE; moves.len()];
        Self { moves, values }
    }

    pub fn len(&self) -> usize { self.moves.len() }

    /// Stable sort, best value first.
    fn sort(&mut self) {
        let mut pairs: Vec<(Move, Value)> = self.moves.iter().copied().zip(self.values.iter().copied()).collect();
        pairs.sort_by_key(|&(_, v)| std::cmp::Reverse(v));
        for (i, (m, v)) in pairs.into_iter().enumerate() {
            self.moves[i] = m;
            self.values[i] = v;
        }
    }
}

/// Iteration state the coordinator and the in-search time check share.
#[derive(Default)]
pub(crate) struct RootState {
    pub depth: Depth,
    pub move_pos: usize,
    pub last_value: Value,
    pub best: Option<RootLine>,
    /// Lines of the current pass, best first (multi-PV).
    pub lines: Vec<RootLine>,
    pub bad_1: bool,
    pub bad_2: bool,
    pub change: bool,
    pub easy: bool,
    pub flag: bool,
    pub research: bool,
    pub can_stop: bool,
}

#[derive(Clone, Copy)]
struct Frame {
    eval: Value,
    /// History index of the quiet move being searched from this height.
    played: Option<usize>,
}

impl Default for Frame {
    fn default() -> Self { Self { eval: Value::NONE, played: None } }
}

/// Bookkeeping a full-width node carries from its move loop into the cut.
struct NodeState {
    old_alpha: Value,
    beta: Value,
    depth: Depth,
    height: usize,
    eval: Value,
}

fn lmr_table() -> &'static [u8] {
    static TABLE: OnceLock<Vec<u8>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = vec![0u8; 2 * LMR_DEPTH_MAX * LMR_MOVES];
        for depth in 0..LMR_DEPTH_MAX {
            for moves in 0..LMR_MOVES {
                let base = (depth as f64 - 1.0).sqrt() + (moves as f64 - 1.0).sqrt();
                // NaN for the first row and column saturates to 0
                table[depth * LMR_MOVES + moves] = (base * 2.0 / 3.0) as u8;
                table[(LMR_DEPTH_MAX + depth) * LMR_MOVES + moves] = base as u8;
            }
        }
        table
    })
}

fn lmr_reduction(node_type: NodeType, depth: Depth, played: usize) -> Depth {
    let depth = (depth.max(0) as usize).min(LMR_DEPTH_MAX - 1);
    let played = played.min(LMR_MOVES - 1);
    lmr_table()[(node_type.lmr_flag() * LMR_DEPTH_MAX + depth) * LMR_MOVES + played] as Depth
}

fn depth_new(depth: Depth, new_depth: Depth, reduction: Depth) -> Depth {
    if depth >= 3 * ONE_PLY { (new_depth - reduction).max(ONE_PLY) } else { new_depth }
}

fn pv_cat(pv: &mut Vec<Move>, tail: &[Move], mv: Move) {
    pv.clear();
    pv.push(mv);
    pv.extend_from_slice(tail);
}

/// Quiet pawn push the pruning rules leave alone.
fn move_is_dangerous(pos: &Position, mv: Move) -> bool {
    pos.moving_piece(mv) == Some(Piece::Pawn)
        && (relative_rank(mv.to, pos.side_to_move()) >= 5 || pos.is_passed_push(mv))
}

fn capture_is_dangerous(pos: &Position, mv: Move) -> bool {
    if move_is_dangerous(pos, mv) { return true; }
    match pos.captured_piece(mv) {
        Some(Piece::Queen) => true,
        Some(Piece::Pawn) => relative_rank(mv.to, pos.side_to_move()) <= 1,
        _ => false,
    }
}

/// Quiet, non-castling moves feed the history-eval table.
fn quiet_index(pos: &Position, mv: Move) -> Option<usize> {
    if pos.is_tactical(mv) || pos.is_castle(mv) { None } else { Some(pos.history_index(mv)) }
}

/// Static eval sharpened by stored bounds that already prove a side of it.
fn tune_eval(min_value: Value, max_value: Value, alpha: Value, beta: Value, height: usize, eval: Value) -> Value {
    let min_value = min_value.from_trans(height);
    let max_value = max_value.from_trans(height);
    if min_value >= beta && min_value > eval { return min_value; }
    if max_value <= alpha && max_value < eval { return max_value; }
    eval
}

pub(crate) fn full_new_depth(pos: &Position, depth: Depth, mv: Move, single_reply: bool, in_pv: bool) -> Depth {
    let tactical = pos.is_tactical(mv);
    let extend = single_reply
        || (in_pv && tactical && see(pos.board(), mv) > 0)
        || (in_pv
            && !tactical
            && pos.moving_piece(mv) == Some(Piece::Pawn)
            && pos.is_passed_push(mv)
            && (relative_rank(mv.to, pos.side_to_move()) >= 5 || see(pos.board(), mv) >= 0))
        || pos.enters_pawn_endgame(mv)
        || pos.gives_check(mv);
    if extend { depth } else { depth - ONE_PLY }
}

/// Per-thread search state. The main worker (id 0) also runs the root and
/// the periodic time check; helpers only ever search split points.
pub struct SearchWorker {
    id: usize,
    ctx: Arc<SearchContext>,
    check_nb: i64,
    seldepth: usize,
    active: Option<Arc<SplitPoint>>,
    frames: Vec<Frame>,
    pub(crate) root: RootState,
}

impl SearchWorker {
    pub fn new(id: usize, ctx: Arc<SearchContext>) -> Self {
        let check_nb = ctx.check_inc;
        Self {
            id,
            ctx,
            check_nb,
            seldepth: 0,
            active: None,
            frames: vec![Frame::default(); HEIGHT_MAX + 1],
            root: RootState::default(),
        }
    }

    pub fn id(&self) -> usize { self.id }

    fn draw(&self) -> Value { self.ctx.draw }

    /// Global stop, or a cutoff at any split point this thread is working
    /// under.
    pub(crate) fn is_stopped(&self) -> bool {
        if self.ctx.search_stop.load(Ordering::Relaxed) { return true; }
        let mut split = self.active.as_deref();
        while let Some(sp) = split {
            if sp.is_cut() { return true; }
            split = sp.parent.as_deref();
        }
        false
    }

    fn evaluate(&self, ctx: &SearchContext, pos: &Position) -> Value { ctx.evaluator.evaluate(pos, self.id) }

    fn enter_node(&mut self, ctx: &SearchContext, height: usize) {
        ctx.nodes.fetch_add(1, Ordering::Relaxed);
        if height > self.seldepth {
            self.seldepth = height;
            ctx.seldepth.fetch_max(height, Ordering::Relaxed);
        }
        if self.id == 0 {
            self.check_nb -= 1;
            if self.check_nb <= 0 {
                self.check_nb += ctx.check_inc;
                self.check(ctx);
            }
        }
    }

    /// Periodic limit check, main thread only.
    pub(crate) fn search_check(&mut self) {
        let ctx = Arc::clone(&self.ctx);
        self.check(&ctx);
    }

    fn check(&mut self, ctx: &SearchContext) {
        let root = &mut self.root;
        if root.depth > ctx.depth_limit { root.flag = true; }
        if let Some(limit) = ctx.node_limit {
            if root.depth > 1 && ctx.nodes() >= limit { root.flag = true; }
        }
        if let Some(limits) = ctx.limits {
            let time = ctx.elapsed();
            if time >= limits.limit_2 {
                root.flag = true;
            } else if time >= limits.limit_3 && root.research {
                root.flag = true;
            } else if time >= limits.limit_1 && !root.bad_1 && !root.bad_2 && !root.research && root.move_pos == 0 {
                root.flag = true;
            }
        }
        let stop = ctx.control.stop_requested();
        if root.can_stop && (stop || (root.flag && !ctx.control.is_infinite())) {
            ctx.search_stop.store(true, Ordering::Relaxed);
        }
    }

    /// Mate-distance pruning on `(alpha, beta)`; `Some` when the window closes.
    fn mate_distance(pos: &Position, alpha: &mut Value, beta: &mut Value, height: usize) -> Option<Value> {
        let mut value = Value::mated_in(height + 2);
        if value > *alpha && pos.is_mate() { value = Value::mated_in(height); }
        if value > *alpha {
            *alpha = value;
            if value >= *beta { return Some(value); }
        }
        let value = -Value::mated_in(height + 1);
        if value < *beta {
            *beta = value;
            if value <= *alpha { return Some(value); }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn full_search(
        &mut self,
        ctx: &SearchContext,
        pos: &mut Position,
        mut alpha: Value,
        mut beta: Value,
        depth: Depth,
        height: usize,
        pv: &mut Vec<Move>,
        mut node_type: NodeType,
        null_ok: bool,
    ) -> Value {
        debug_assert!(alpha < beta);
        if depth <= 1 {
            return self.quiescence(ctx, pos, alpha, beta, 0, height, pv, node_type);
        }

        self.enter_node(ctx, height);
        pv.clear();

        if self.is_stopped() { return self.draw(); }
        if pos.is_draw() { return self.draw(); }
        if let Some(v) = Self::mate_distance(pos, &mut alpha, &mut beta, height) { return v; }

        let params = &ctx.params;
        let is_pv = node_type.is_pv();
        let key = pos.key();

        let mut trans_move = None;
        let mut hit = None;
        if params.use_tt {
            if let Some(h) = ctx.tt.retrieve(key, true) {
                trans_move = h.mv;
                if !is_pv {
                    let mut min_depth = h.min_depth;
                    let mut max_depth = h.max_depth;
                    // proven mates are deep enough at any depth
                    if h.min_value > Value::EVAL_INF && min_depth < depth { min_depth = depth; }
                    if h.max_value < -Value::EVAL_INF && max_depth < depth { max_depth = depth; }

                    let mut min_value = -Value::INF;
                    if min_depth >= depth {
                        min_value = h.min_value.from_trans(height);
                        if min_value >= beta { return min_value; }
                    }
                    let mut max_value = Value::INF;
                    if max_depth >= depth {
                        max_value = h.max_value.from_trans(height);
                        if max_value <= alpha { return max_value; }
                    }
                    if min_value == max_value { return min_value; }
                }
                hit = Some(h);
            }
        }

        if params.use_tablebase
            && self.id == 0
            && pos.piece_count() <= ctx.probes.tablebase_pieces()
            && (beta.0 != alpha.0 + 1 || (!is_pv && depth >= TB_DEPTH))
        {
            if let Some(value) = ctx.probes.probe_tablebase(pos) {
                if params.use_tt { ctx.tt.store(key, None, depth, value, value, Value::NONE); }
                return value.from_trans(height);
            }
        }

        if height >= HEIGHT_MAX - 1 { return self.evaluate(ctx, pos); }

        let old_alpha = alpha;
        let mut best_value = Value::NONE;
        let mut best_move = None;
        let mut new_pv = Vec::new();
        let in_check = pos.in_check();
        let me = pos.side_to_move();

        let (eval, tune) = if in_check {
            (Value::NONE, Value::NONE)
        } else {
            let eval = match hit {
                Some(h) if !h.eval.is_none() => h.eval,
                _ => self.evaluate(ctx, pos),
            };
            if height > 0 {
                let parent = self.frames[height - 1];
                if let Some(index) = parent.played {
                    if !parent.eval.is_none() { ctx.tables.move_eval(index, -(parent.eval + eval)); }
                }
            }
            let tune = hit.map_or(eval, |h| tune_eval(h.min_value, h.max_value, alpha, beta, height, eval));
            (eval, tune)
        };
        self.frames[height] = Frame::default();

        if params.use_razor
            && depth < RAZOR_DEPTH
            && !is_pv
            && !in_check
            && !null_ok
            && !beta.is_mate()
            && trans_move.is_none()
            && tune + RAZOR_MARGIN[depth as usize] < beta
            && !pos.pawn_on_seventh(me)
        {
            let opt = beta - RAZOR_MARGIN[depth as usize];
            let value = self.quiescence(ctx, pos, opt - 1, opt, 0, height, pv, node_type);
            if value < opt { return value; }
        }

        if params.use_static_null
            && depth < STATIC_NULL_DEPTH
            && !is_pv
            && !in_check
            && null_ok
            && !beta.is_mate()
            && pos.has_piece(me)
            && tune - STATIC_NULL_MARGIN[depth as usize] >= beta
            && !pos.pawn_on_seventh(!me)
        {
            return tune - STATIC_NULL_MARGIN[depth as usize];
        }

        let node = NodeState { old_alpha, beta, depth, height, eval };

        if params.use_null
            && null_ok
            && depth >= NULL_DEPTH
            && !is_pv
            && !in_check
            && !beta.is_mate()
            && pos.has_piece(me)
            && tune >= beta
        {
            let mut new_depth = depth - NULL_REDUCTION - ONE_PLY;
            if depth > VER_REDUCTION && tune - NULL_MARGIN > beta { new_depth -= ONE_PLY; }

            if let Some(undo) = pos.make_null_move() {
                let mut value =
                    -self.full_search(ctx, pos, -beta, -beta + 1, new_depth, height + 1, &mut new_pv, node_type.opp(), false);
                pos.undo_null_move(undo);

                if value >= beta {
                    // unproven mates stay out of the tree
                    if value > Value::EVAL_INF { value = Value::EVAL_INF; }
                    if depth > VER_REDUCTION {
                        value = self.full_search(ctx, pos, alpha, beta, depth - VER_REDUCTION, height, &mut new_pv, NodeType::Cut, false);
                    }
                    if value >= beta {
                        return self.finish_node(ctx, pos, &node, value, None, &[]);
                    }
                }
            }
        }

        if params.use_iid && depth >= IID_DEPTH && is_pv && trans_move.is_none() {
            let new_depth = depth - IID_REDUCTION;
            let value = self.full_search(ctx, pos, alpha, beta, new_depth, height, &mut new_pv, node_type, false);
            if !params.use_aspiration && value <= alpha {
                self.full_search(ctx, pos, -Value::INF, beta, new_depth, height, &mut new_pv, node_type, false);
                trans_move = new_pv.first().copied();
            } else if let Some(&mv) = new_pv.first() {
                trans_move = Some(mv);
            }
        }

        self.frames[height] = Frame { eval, played: None };
        let use_fp = params.use_futility && depth <= FUTILITY_DEPTH && !is_pv && !in_check;
        let lmr_type = node_type;
        let single_reply = in_check && pos.legal_moves_count() == 1;

        let mut sorter = MoveSorter::new(pos, &ctx.tables, trans_move, height, self.id);
        let mut played: Vec<Move> = Vec::with_capacity(32);

        while let Some(mv) = sorter.next(pos, &ctx.tables) {
            let score = sorter.score();
            let new_depth = full_new_depth(pos, depth, mv, single_reply, is_pv);

            let mut reduction = 0;
            if params.use_lmr && !is_pv && !in_check && played.len() >= 3 && !is_prime(score) && !is_killer(score) {
                let r = lmr_reduction(lmr_type, depth, played.len());
                reduction = if new_depth >= depth { r.min(ONE_PLY) } else { r };
                if depth < LMR_DEPTH && depth - reduction < 0 && new_depth < depth && !move_is_dangerous(pos, mv) {
                    continue;
                }
            }
            let reduced = reduction != 0;

            if use_fp && new_depth < depth && !pos.is_tactical(mv) && !move_is_dangerous(pos, mv) {
                let mut opt_depth = depth;
                if played.len() as Depth >= 1 + depth && score < 16384 {
                    if score < 2054 {
                        opt_depth -= 3 * ONE_PLY;
                    } else if score < 4108 {
                        opt_depth -= 2 * ONE_PLY;
                    } else if score < 8217 {
                        opt_depth -= ONE_PLY;
                    }
                }
                let value = eval + FUTILITY_MARGIN[(opt_depth + 2 * ONE_PLY) as usize];
                if value <= alpha {
                    if value > best_value {
                        best_value = value;
                        pv.clear();
                    }
                    continue;
                }
            }

            self.frames[height].played = quiet_index(pos, mv);
            let undo = pos.make_move(mv);
            let search_depth = depth_new(depth, new_depth, reduction);

            let mut value = if !is_pv || best_value.is_none() {
                -self.full_search(ctx, pos, -beta, -alpha, search_depth, height + 1, &mut new_pv, node_type.opp(), true)
            } else {
                let value =
                    -self.full_search(ctx, pos, -alpha - 1, -alpha, search_depth, height + 1, &mut new_pv, NodeType::Cut, true);
                if value > alpha {
                    -self.full_search(ctx, pos, -beta, -alpha, search_depth, height + 1, &mut new_pv, NodeType::Pv, false)
                } else {
                    value
                }
            };

            if reduced && value >= beta {
                value = -self.full_search(ctx, pos, -beta, -alpha, new_depth, height + 1, &mut new_pv, node_type.opp(), true);
            }

            pos.undo_move(undo);
            played.push(mv);

            if value > best_value {
                best_value = value;
                pv_cat(pv, &new_pv, mv);
                if value > alpha {
                    alpha = value;
                    best_move = Some(mv);
                    if value >= beta { break; }
                }
            }

            if node_type == NodeType::Cut { node_type = NodeType::All; }

            if ctx.pool.size() > 1
                && depth >= THREAD_DEPTH
                && !single_reply
                && !beta.is_mate()
                && !self.is_stopped()
                && ctx.pool.has_idle()
            {
                if let Some(slaves) = ctx.pool.book(self.id) {
                    let state = SplitState { sorter, alpha, best_value, best_move, played, pv: pv.clone(), end: false };
                    return self.split(ctx, pos, &node, node_type, in_check, slaves, state, pv);
                }
            }
        }

        if best_value.is_none() {
            return if in_check { Value::mated_in(height) } else { self.draw() };
        }

        self.finish_node(ctx, pos, &node, best_value, best_move, &played)
    }

    /// Ordering-table and table updates once a node is resolved.
    fn finish_node(
        &self,
        ctx: &SearchContext,
        pos: &Position,
        node: &NodeState,
        best_value: Value,
        best_move: Option<Move>,
        played: &[Move],
    ) -> Value {
        if self.is_stopped() { return best_value; }

        if let Some(best) = best_move {
            let cut = best_value >= node.beta;
            ctx.tables.record_cutoff(best, pos, node.depth, node.height, self.id, cut);
            if cut && !pos.is_tactical(best) {
                for &mv in played.iter().filter(|&&mv| mv != best) {
                    ctx.tables.record_failure(mv, pos, node.depth);
                }
            }
        }

        if ctx.params.use_tt {
            let min = if best_value > node.old_alpha { best_value.to_trans(node.height) } else { -Value::INF };
            let max = if best_value < node.beta { best_value.to_trans(node.height) } else { Value::INF };
            ctx.tt.store(pos.key(), best_move, node.depth, min, max, node.eval);
        }
        best_value
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn quiescence(
        &mut self,
        ctx: &SearchContext,
        pos: &mut Position,
        mut alpha: Value,
        mut beta: Value,
        mut depth: Depth,
        height: usize,
        pv: &mut Vec<Move>,
        node_type: NodeType,
    ) -> Value {
        debug_assert!(alpha < beta);
        debug_assert!(depth <= 0);

        self.enter_node(ctx, height);
        pv.clear();

        if self.is_stopped() { return self.draw(); }
        if pos.is_draw() { return self.draw(); }
        if let Some(v) = Self::mate_distance(pos, &mut alpha, &mut beta, height) { return v; }

        let params = &ctx.params;
        let is_pv = node_type.is_pv();
        let in_check = pos.in_check();
        let mut trans_depth: Depth = if in_check {
            depth += 1;
            0
        } else if depth >= 0 {
            -63
        } else {
            -64
        };

        let mut trans_move = None;
        let mut trans_eval = Value::NONE;
        if params.use_tt {
            if let Some(h) = ctx.tt.retrieve(pos.key(), false) {
                trans_move = h.mv;
                trans_eval = h.eval;

                let mut min_value = -Value::INF;
                if h.min_depth >= trans_depth {
                    min_value = h.min_value.from_trans(height);
                    if min_value >= beta && !is_pv { return min_value; }
                }
                let mut max_value = Value::INF;
                if h.max_depth >= trans_depth {
                    max_value = h.max_value.from_trans(height);
                    if max_value <= alpha && !is_pv { return max_value; }
                }
                if min_value == max_value && is_pv { return min_value; }
            }
        }

        if height >= HEIGHT_MAX - 1 { return self.evaluate(ctx, pos); }

        let old_alpha = alpha;
        let mut best_value = Value::NONE;
        let mut best_move = None;
        let mut opt_value = Value::INF;
        let mut eval = Value::NONE;

        if !in_check {
            if pos.is_corner_stalemate() { return self.draw(); }

            eval = if trans_eval.is_none() { self.evaluate(ctx, pos) } else { trans_eval };
            best_value = eval;
            if best_value > alpha {
                alpha = best_value;
                if best_value >= beta {
                    trans_depth = -126;
                    return self.finish_quiescence(ctx, pos, trans_depth, old_alpha, beta, height, eval, best_value, best_move);
                }
            }
            if params.use_delta { opt_value = eval + DELTA_MARGIN; }
        }

        let mut sorter = MoveSorter::new_qs(pos, trans_move, depth, is_pv);
        let mut new_pv = Vec::new();

        while let Some(mv) = sorter.next(pos, &ctx.tables) {
            if params.use_delta
                && !is_pv
                && !in_check
                && Some(mv) != trans_move
                && !pos.gives_check(mv)
                && !capture_is_dangerous(pos, mv)
            {
                let value = opt_value + pos.captured_piece(mv).map_or(0, Value::piece);
                if value <= alpha {
                    if value > best_value {
                        best_value = value;
                        pv.clear();
                    }
                    continue;
                }
            }

            let undo = pos.make_move(mv);
            let value = -self.quiescence(ctx, pos, -beta, -alpha, depth - 1, height + 1, &mut new_pv, node_type);
            pos.undo_move(undo);

            if value > best_value {
                best_value = value;
                pv_cat(pv, &new_pv, mv);
                if value > alpha {
                    alpha = value;
                    best_move = Some(mv);
                    if value >= beta { break; }
                }
            }
        }

        if best_value.is_none() {
            debug_assert!(in_check);
            return Value::mated_in(height);
        }

        self.finish_quiescence(ctx, pos, trans_depth, old_alpha, beta, height, eval, best_value, best_move)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_quiescence(
        &self,
        ctx: &SearchContext,
        pos: &Position,
        trans_depth: Depth,
        old_alpha: Value,
        beta: Value,
        height: usize,
        eval: Value,
        best_value: Value,
        best_move: Option<Move>,
    ) -> Value {
        if self.is_stopped() { return best_value; }
        if ctx.params.use_tt {
            let min = if best_value > old_alpha { best_value.to_trans(height) } else { -Value::INF };
            let max = if best_value < beta { best_value.to_trans(height) } else { Value::INF };
            ctx.tt.store(pos.key(), best_move, trans_depth, min, max, eval);
        }
        best_value
    }

    /// Hands the rest of this node's moves to a split point, searches it
    /// alongside the booked helpers and returns the node value.
    #[allow(clippy::too_many_arguments)]
    fn split(
        &mut self,
        ctx: &SearchContext,
        pos: &Position,
        node: &NodeState,
        node_type: NodeType,
        in_check: bool,
        slaves: u32,
        state: SplitState,
        pv: &mut Vec<Move>,
    ) -> Value {
        let split = Arc::new(SplitPoint::new(
            Arc::clone(&self.ctx),
            self.id,
            self.active.clone(),
            pos.clone(),
            (node.old_alpha, node.beta),
            node.depth,
            node.height,
            node_type,
            node.eval,
            in_check,
            slaves,
            state,
        ));

        for id in (0..ctx.pool.size()).filter(|&id| split.has_slave(id)) {
            ctx.tables.killer_copy(id, self.id, node.height + 1, self.seldepth + 1);
        }

        ctx.pool.start(&split);
        let saved = self.active.replace(Arc::clone(&split));
        self.run_split(ctx, &split);
        ctx.pool.wait(self, &split);
        self.active = saved;

        let (best_value, best_move, played) = {
            let state = split.lock();
            pv.clone_from(&state.pv);
            (state.best_value, state.best_move, state.played.clone())
        };
        self.finish_node(ctx, &split.pos, node, best_value, best_move, &played)
    }

    /// Searches `split` as one of its participants. Used by helpers and by a
    /// waiting master that was booked into another thread's split.
    pub(crate) fn help(&mut self, split: &Arc<SplitPoint>) {
        let ctx = Arc::clone(&split.ctx);
        let frames = self.frames.clone();
        let saved = self.active.replace(Arc::clone(split));
        self.run_split(&ctx, split);
        self.active = saved;
        self.frames = frames;
    }

    /// Split-node move loop: moves come from the shared sorter under the
    /// split lock; results are published back under the same lock.
    fn run_split(&mut self, ctx: &SearchContext, split: &SplitPoint) {
        let mut pos = split.pos.clone();
        let mut new_pv = Vec::new();
        let mut line = Vec::new();
        let depth = split.depth;
        let height = split.height;
        let beta = split.beta;
        let node_type = split.node_type;
        let is_pv = node_type.is_pv();
        let params = &ctx.params;
        let use_fp = params.use_futility && depth <= FUTILITY_DEPTH && !is_pv && !split.in_check;

        self.frames[height] = Frame { eval: split.eval, played: None };

        let mut state = split.lock();
        let mut alpha = state.alpha;
        loop {
            if state.end || self.is_stopped() { break; }
            let Some(mv) = state.sorter.next(&pos, &ctx.tables) else {
                state.end = true;
                break;
            };
            let score = state.sorter.score();
            let played_nb = state.played.len();
            drop(state);

            let new_depth = full_new_depth(&pos, depth, mv, false, is_pv);

            let mut reduction = 0;
            if params.use_lmr && !is_pv && !split.in_check && played_nb >= 3 && !is_prime(score) && !is_killer(score) {
                let r = lmr_reduction(node_type, depth, played_nb);
                reduction = if new_depth >= depth { r.min(ONE_PLY) } else { r };
            }
            let reduced = reduction != 0;

            if use_fp && new_depth < depth && !pos.is_tactical(mv) && !move_is_dangerous(&pos, mv) {
                let mut opt_depth = depth;
                if played_nb as Depth >= 1 + depth && score < 16384 {
                    if score < 2054 {
                        opt_depth -= 3 * ONE_PLY;
                    } else if score < 4108 {
                        opt_depth -= 2 * ONE_PLY;
                    } else if score < 8217 {
                        opt_depth -= ONE_PLY;
                    }
                }
                let value = split.eval + FUTILITY_MARGIN[(opt_depth + 2 * ONE_PLY) as usize];
                if value <= alpha {
                    state = split.lock();
                    alpha = state.alpha;
                    if value > state.best_value {
                        state.best_value = value;
                        state.pv.clear();
                    }
                    continue;
                }
            }

            self.frames[height].played = quiet_index(&pos, mv);
            let undo = pos.make_move(mv);
            let search_depth = depth_new(depth, new_depth, reduction);

            let mut value = if !is_pv {
                -self.full_search(ctx, &mut pos, -beta, -alpha, search_depth, height + 1, &mut new_pv, node_type.opp(), true)
            } else {
                let value =
                    -self.full_search(ctx, &mut pos, -alpha - 1, -alpha, search_depth, height + 1, &mut new_pv, NodeType::Cut, true);
                if value > alpha {
                    -self.full_search(ctx, &mut pos, -beta, -alpha, search_depth, height + 1, &mut new_pv, NodeType::Pv, false)
                } else {
                    value
                }
            };

            if reduced && value >= beta {
                value = -self.full_search(ctx, &mut pos, -beta, -alpha, new_depth, height + 1, &mut new_pv, node_type.opp(), true);
            }

            pos.undo_move(undo);

            state = split.lock();
            if self.is_stopped() { break; }

            state.played.push(mv);
            if value > state.best_value {
                state.best_value = value;
                pv_cat(&mut line, &new_pv, mv);
                state.pv.clone_from(&line);
                if value > state.alpha {
                    state.alpha = value;
                    state.best_move = Some(mv);
                    if value >= beta {
                        split.set_cut();
                        break;
                    }
                }
            }
            alpha = state.alpha;
        }
        drop(state);

        ctx.pool.leave(split, self.id);
    }

    /// One pass over the root moves with window `(alpha, beta)` at `depth`
    /// half-plies. `None` when the search was stopped part way.
    pub(crate) fn full_root(
        &mut self,
        pos: &mut Position,
        list: &mut RootList,
        mut alpha: Value,
        beta: Value,
        depth: Depth,
        kind: RootKind,
    ) -> Option<Value> {
        let ctx = Arc::clone(&self.ctx);
        ctx.nodes.fetch_add(1, Ordering::Relaxed);
        self.check_nb -= 1;

        list.values.iter_mut().for_each(|v| *v = Value::NONE);
        self.root.lines.clear();

        let old_alpha = alpha;
        let mut best_value = Value::NONE;
        let root_depth = depth / ONE_PLY;
        let multi = ctx.params.multi_pv.clamp(1, list.len().max(1));
        let in_check = pos.in_check();
        let single_reply = in_check && list.len() == 1;
        let mut new_pv = Vec::new();

        let eval = if in_check { Value::NONE } else { self.evaluate(&ctx, pos) };
        self.frames[0] = Frame { eval, played: None };

        for i in 0..list.len() {
            let mv = list.moves[i];
            self.root.depth = root_depth;
            self.root.move_pos = i;

            let new_depth = full_new_depth(pos, depth, mv, single_reply, true);
            self.frames[0].played = quiet_index(pos, mv);
            let undo = pos.make_move(mv);

            let value = if kind == RootKind::Short || best_value.is_none() || i < multi {
                -self.full_search(&ctx, pos, -beta, -alpha, new_depth, 1, &mut new_pv, NodeType::Pv, false)
            } else {
                let value = -self.full_search(&ctx, pos, -alpha - 1, -alpha, new_depth, 1, &mut new_pv, NodeType::Cut, true);
                if value > alpha {
                    self.root.change = true;
                    self.root.easy = false;
                    self.root.flag = false;
                    -self.full_search(&ctx, pos, -beta, -alpha, new_depth, 1, &mut new_pv, NodeType::Pv, false)
                } else {
                    value
                }
            };

            pos.undo_move(undo);

            if ctx.search_stop.load(Ordering::Relaxed) { return None; }

            let bound = if value <= alpha {
                list.values[i] = old_alpha;
                Bound::Upper
            } else if value >= beta {
                list.values[i] = beta;
                Bound::Lower
            } else {
                list.values[i] = value;
                Bound::Exact
            };

            let mut line_pv = Vec::with_capacity(new_pv.len() + 1);
            pv_cat(&mut line_pv, &new_pv, mv);
            let line = RootLine { mv, value, depth: root_depth, bound, pv: line_pv, nodes: ctx.nodes(), elapsed: ctx.elapsed() };

            let pos_in_lines = self.root.lines.partition_point(|l| l.value >= value);
            self.root.lines.insert(pos_in_lines, line.clone());

            if kind == RootKind::Multi {
                if value > alpha && (depth > ONE_PLY || i + 1 >= multi) {
                    let top = self.root.lines[0].clone();
                    self.update_best(top);
                }
            } else if value > best_value && (best_value.is_none() || value > alpha) {
                self.update_best(line);
            }

            if value > best_value { best_value = value; }

            if value > alpha {
                if kind == RootKind::Normal { alpha = value; }
                if kind == RootKind::Multi && i + 1 >= multi {
                    alpha = self.root.lines[multi - 1].value;
                }
                if value >= beta {
                    self.root.research = true;
                    break;
                }
                self.root.research = false;
            } else if kind == RootKind::Normal && i == 0 {
                self.root.research = true;
                break;
            }
        }

        list.sort();

        if ctx.params.use_tt && best_value > old_alpha && best_value < beta {
            if let Some(best) = self.root.best.as_ref() {
                let line = best.pv.clone();
                self.pv_fill(&ctx, pos, &line);
            }
        }

        Some(best_value)
    }

    fn update_best(&mut self, line: RootLine) {
        let root = &mut self.root;
        if line.depth > 1 {
            if line.value <= root.last_value - BAD_THRESHOLD {
                root.bad_1 = true;
                root.easy = false;
                root.flag = false;
            } else {
                root.bad_1 = false;
            }
        }
        root.best = Some(line);
    }

    /// Stores the principal variation so the next iteration finds it first.
    fn pv_fill(&self, ctx: &SearchContext, pos: &mut Position, line: &[Move]) {
        let Some((&mv, rest)) = line.split_first() else { return };
        if !pos.is_legal(mv) { return; }
        let undo = pos.make_move(mv);
        self.pv_fill(ctx, pos, rest);
        pos.undo_move(undo);

        let eval = if pos.in_check() { Value::NONE } else { self.evaluate(ctx, pos) };
        ctx.tt.store(pos.key(), Some(mv), -127, -Value::INF, Value::INF, eval);
    }

    pub(crate) fn seldepth(&self) -> usize { self.seldepth }

    pub(crate) fn params(&self) -> SearchParams { self.ctx.params }
}
