use cozy_chess::{Move, Piece};

use crate::board::Position;
use super::history::MoveOrderingTables;
use super::see::see;
use super::value::{Depth, Value};

/// Score attached to moves that bypass history (trans, captures, evasions).
pub const SCORE_DEFAULT: i32 = 65536;
pub const SCORE_KILLER: i32 = 32768;

const TRANS_SCORE: i32 = 32766;
const GOOD_SCORE: i32 = 30000;
const KILLER_SCORE: i32 = 28000;
const BAD_SCORE: i32 = -28000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gen {
    Trans,
    Capture,
    Killer,
    Quiet,
    Bad,
    Evasion,
    EvasionQs,
    TransQs,
    CaptureQs,
    CheckQs,
    End,
}

const FULL_STAGES: &[Gen] = &[Gen::Trans, Gen::Capture, Gen::Killer, Gen::Quiet, Gen::Bad, Gen::End];
const EVASION_STAGES: &[Gen] = &[Gen::Evasion, Gen::End];
const QS_EVASION_STAGES: &[Gen] = &[Gen::EvasionQs, Gen::End];
const QS_CHECK_STAGES: &[Gen] = &[Gen::TransQs, Gen::CaptureQs, Gen::CheckQs, Gen::End];
const QS_CAPTURE_STAGES: &[Gen] = &[Gen::TransQs, Gen::CaptureQs, Gen::End];

/// Is a move scored as trans, capture or evasion rather than by history.
pub fn is_prime(score: i32) -> bool { score > SCORE_KILLER }

pub fn is_killer(score: i32) -> bool { score == SCORE_KILLER }

fn order(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 0,
        Piece::Knight => 1,
        Piece::Bishop => 2,
        Piece::Rook => 3,
        Piece::Queen => 4,
        Piece::King => 5,
    }
}

/// Most valuable victim, least valuable attacker; plain promotions rank by
/// the promoted piece below every capture.
pub fn mvv_lva(pos: &Position, mv: Move) -> i32 {
    if pos.is_en_passant(mv) { return 5; }
    if let Some(victim) = pos.captured_piece(mv) {
        let attacker = pos.moving_piece(mv).unwrap_or(Piece::Pawn);
        return order(victim) * 6 - order(attacker) + 5;
    }
    mv.promotion.map_or(0, |p| order(p) - 5)
}

pub fn capture_is_good(pos: &Position, mv: Move) -> bool {
    if pos.is_en_passant(mv) { return true; }
    if matches!(mv.promotion, Some(p) if p != Piece::Queen) { return false; }
    if let Some(victim) = pos.captured_piece(mv) {
        if mv.promotion.is_some() { return true; }
        let attacker = pos.moving_piece(mv).unwrap_or(Piece::Pawn);
        if Value::piece(victim) >= Value::piece(attacker) { return true; }
    }
    see(pos.board(), mv) >= 0
}

/// Full ordering key used for evasions and the root list.
pub fn move_value(pos: &Position, tables: &MoveOrderingTables, mv: Move, trans: Option<Move>, killers: [Option<Move>; 2]) -> i32 {
    if Some(mv) == trans {
        TRANS_SCORE
    } else if pos.is_tactical(mv) {
        let v = mvv_lva(pos, mv);
        if capture_is_good(pos, mv) { v + GOOD_SCORE } else { v + BAD_SCORE }
    } else if Some(mv) == killers[0] {
        KILLER_SCORE
    } else if Some(mv) == killers[1] {
        KILLER_SCORE - 1
    } else {
        tables.quiet_score(pos.history_index(mv))
    }
}

fn move_value_simple(pos: &Position, tables: &MoveOrderingTables, mv: Move, trans: Option<Move>) -> i32 {
    if Some(mv) == trans {
        TRANS_SCORE
    } else if pos.is_tactical(mv) {
        GOOD_SCORE + mvv_lva(pos, mv)
    } else {
        tables.quiet_score(pos.history_index(mv))
    }
}

/// Descending by score, ties keep generation order.
fn sort_list(list: &mut [(Move, i32)]) {
    list.sort_by_key(|&(_, v)| std::cmp::Reverse(v));
}

/// Staged move picker. Moves come out trans first, then captures by
/// MVV-LVA, killers, quiets by history and finally losing captures; in check
/// all evasions come out in one scored batch. No move is yielded twice.
pub struct MoveSorter {
    stages: &'static [Gen],
    next_gen: usize,
    gen: Gen,
    list: Vec<(Move, i32)>,
    pos: usize,
    bad: Vec<Move>,
    trans: Option<Move>,
    killers: [Option<Move>; 2],
    value: i32,
    depth: Depth,
    pv: bool,
}

impl MoveSorter {
    fn empty(stages: &'static [Gen], trans: Option<Move>) -> Self {
        Self {
            stages,
            next_gen: 0,
            gen: Gen::End,
            list: Vec::with_capacity(64),
            pos: 0,
            bad: Vec::new(),
            trans,
            killers: [None, None],
            value: SCORE_DEFAULT,
            depth: 0,
            pv: true,
        }
    }

    /// Full-width node at `height` for `thread`.
    pub fn new(pos: &Position, tables: &MoveOrderingTables, trans: Option<Move>, height: usize, thread: usize) -> Self {
        let killers = tables.killers(thread, height);
        if pos.in_check() {
            let mut sorter = Self::empty(EVASION_STAGES, trans);
            sorter.killers = killers;
            let mut moves = Vec::with_capacity(16);
            pos.gen_legal(&mut moves);
            sorter.list = moves.into_iter().map(|m| (m, 0)).collect();
            if sorter.list.len() >= 2 {
                for entry in sorter.list.iter_mut() {
                    entry.1 = move_value(pos, tables, entry.0, trans, killers);
                }
                sort_list(&mut sorter.list);
            }
            sorter.gen = Gen::Evasion;
            sorter.next_gen = 1;
            return sorter;
        }
        let mut sorter = Self::empty(FULL_STAGES, trans);
        sorter.killers = killers;
        sorter
    }

    /// Quiescence node. Quiet checks are tried while `depth >= 0`; losing
    /// captures are skipped away from the principal variation.
    pub fn new_qs(pos: &Position, trans: Option<Move>, depth: Depth, pv: bool) -> Self {
        let stages = if pos.in_check() {
            QS_EVASION_STAGES
        } else if depth >= 0 {
            QS_CHECK_STAGES
        } else {
            QS_CAPTURE_STAGES
        };
        let mut sorter = Self::empty(stages, trans);
        sorter.depth = depth;
        sorter.pv = pv;
        sorter
    }

    /// Ordering class of the last move returned by `next`: `SCORE_DEFAULT`
    /// for trans, captures and evasions, `SCORE_KILLER` for killers,
    /// otherwise the history cutoff probability.
    pub fn score(&self) -> i32 { self.value }

    pub fn next(&mut self, pos: &Position, tables: &MoveOrderingTables) -> Option<Move> {
        loop {
            while self.pos < self.list.len() {
                let mv = self.list[self.pos].0;
                self.pos += 1;
                self.value = SCORE_DEFAULT;
                if self.accept(pos, tables, mv) { return Some(mv); }
            }
            if !self.advance(pos, tables) { return None; }
        }
    }

    fn accept(&mut self, pos: &Position, tables: &MoveOrderingTables, mv: Move) -> bool {
        match self.gen {
            Gen::Evasion | Gen::EvasionQs => true,
            Gen::Trans => pos.is_legal(mv),
            Gen::TransQs => {
                pos.is_legal(mv) && (pos.is_tactical(mv) || (self.depth >= 0 && pos.gives_check(mv)))
            }
            Gen::Capture => {
                if Some(mv) == self.trans { return false; }
                if !capture_is_good(pos, mv) {
                    self.bad.push(mv);
                    return false;
                }
                true
            }
            Gen::Killer => {
                if Some(mv) == self.trans || pos.is_tactical(mv) || !pos.is_legal(mv) { return false; }
                self.value = SCORE_KILLER;
                true
            }
            Gen::Quiet => {
                if Some(mv) == self.trans || Some(mv) == self.killers[0] || Some(mv) == self.killers[1] {
                    return false;
                }
                self.value = tables.history_prob(pos.history_index(mv));
                true
            }
            Gen::Bad => true,
            Gen::CaptureQs => Some(mv) != self.trans && (self.pv || capture_is_good(pos, mv)),
            Gen::CheckQs => Some(mv) != self.trans && see(pos.board(), mv) >= 0,
            Gen::End => false,
        }
    }

    /// Moves to the next stage, filling `list`. False once exhausted.
    fn advance(&mut self, pos: &Position, tables: &MoveOrderingTables) -> bool {
        let Some(&gen) = self.stages.get(self.next_gen) else { return false };
        self.next_gen += 1;
        self.gen = gen;
        self.pos = 0;
        self.list.clear();
        let mut moves = Vec::with_capacity(48);
        match gen {
            Gen::Trans | Gen::TransQs => moves.extend(self.trans),
            Gen::Capture | Gen::CaptureQs => {
                pos.gen_tactical(&mut moves);
                self.list.extend(moves.drain(..).map(|m| (m, mvv_lva(pos, m))));
                sort_list(&mut self.list);
            }
            Gen::Killer => moves.extend(self.killers.iter().flatten().copied()),
            Gen::Quiet => {
                pos.gen_quiet(&mut moves);
                self.list.extend(moves.drain(..).map(|m| (m, tables.quiet_score(pos.history_index(m)))));
                sort_list(&mut self.list);
            }
            Gen::Bad => moves.append(&mut self.bad),
            Gen::EvasionQs => {
                pos.gen_legal(&mut moves);
                let trans = self.trans;
                self.list.extend(moves.drain(..).map(|m| (m, move_value_simple(pos, tables, m, trans))));
                sort_list(&mut self.list);
            }
            Gen::CheckQs => pos.gen_quiet_checks(&mut moves),
            Gen::Evasion => {}
            Gen::End => return false,
        }
        self.list.extend(moves.into_iter().map(|m| (m, 0)));
        true
    }
}

/// Root list ordering: every legal move scored like an evasion list.
pub fn score_root_moves(pos: &Position, tables: &MoveOrderingTables, trans: Option<Move>, thread: usize) -> Vec<Move> {
    let killers = tables.killers(thread, 0);
    let mut list: Vec<(Move, i32)> =
        pos.legal_moves().into_iter().map(|m| (m, move_value(pos, tables, m, trans, killers))).collect();
    sort_list(&mut list);
    list.into_iter().map(|(m, _)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mvv_lva_prefers_big_victims() {
        let pos = Position::from_fen("4k3/8/2q1r3/3P4/8/8/8/K7 w - - 0 1").unwrap();
        let pxq = pos.parse_uci_move("d5c6").unwrap();
        let pxr = pos.parse_uci_move("d5e6").unwrap();
        assert!(mvv_lva(&pos, pxq) > mvv_lva(&pos, pxr));
    }

    #[test]
    fn trans_move_comes_first() {
        let pos = Position::startpos();
        let tables = MoveOrderingTables::new();
        let trans = pos.parse_uci_move("b1c3").ok();
        let mut sorter = MoveSorter::new(&pos, &tables, trans, 0, 0);
        assert_eq!(sorter.next(&pos, &tables), trans);
        assert_eq!(sorter.score(), SCORE_DEFAULT);
        let mut rest = 0;
        while let Some(mv) = sorter.next(&pos, &tables) {
            assert_ne!(Some(mv), trans, "trans move yielded twice");
            rest += 1;
        }
        assert_eq!(rest, 19);
    }
}
