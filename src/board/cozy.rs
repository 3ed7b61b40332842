use cozy_chess::{BitBoard, Board as CozyBoard, Color, File, Move, Piece, Rank, Square};
use crate::error::EngineError;

const FILE_A: u64 = 0x0101_0101_0101_0101;

fn file_bb(file: usize) -> u64 { FILE_A << file }

fn rank_bb(rank: usize) -> u64 { 0xFFu64 << (8 * rank) }

/// Squares strictly in front of `rank` from `color`'s point of view.
fn ahead_of(rank: usize, color: Color) -> u64 {
    match color {
        Color::White => if rank >= 7 { 0 } else { !0u64 << (8 * (rank + 1)) },
        Color::Black => (1u64 << (8 * rank)) - 1,
    }
}

/// Rank index 0..8 seen from `color`'s side of the board.
pub fn relative_rank(sq: Square, color: Color) -> usize {
    let r = sq.rank() as usize;
    if color == Color::White { r } else { 7 - r }
}

/// Search-side view of a board: a `cozy_chess::Board` plus the key history
/// needed for repetition detection. Moves are applied copy-make style, the
/// undo record simply holds the previous board.
#[derive(Clone, Debug)]
pub struct Position {
    board: CozyBoard,
    keys: Vec<u64>,
}

#[derive(Clone, Debug)]
pub struct Undo {
    board: CozyBoard,
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default(), keys: Vec::new() }
    }

    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        CozyBoard::from_fen(fen, false)
            .map(Self::from_board)
            .map_err(|e| EngineError::Fen { fen: fen.to_string(), reason: format!("{e:?}") })
    }

    pub fn from_board(board: CozyBoard) -> Self { Self { board, keys: Vec::new() } }

    pub fn board(&self) -> &CozyBoard { &self.board }

    pub fn side_to_move(&self) -> Color { self.board.side_to_move() }

    pub fn key(&self) -> u64 { self.board.hash() }

    pub fn in_check(&self) -> bool { !self.board.checkers().is_empty() }

    pub fn piece_count(&self) -> usize { self.board.occupied().len() as usize }

    /// Same position seen an even number of plies ago, within the reversible
    /// part of the game.
    pub fn is_repetition(&self) -> bool {
        let reversible = (self.board.halfmove_clock() as usize).min(self.keys.len());
        let key = self.key();
        let mut back = 4;
        while back <= reversible {
            if self.keys[self.keys.len() - back] == key { return true; }
            back += 2;
        }
        false
    }

    /// Neither side can possibly mate: bare kings or a single minor piece.
    pub fn is_material_draw(&self) -> bool {
        let b = &self.board;
        let heavy = b.pieces(Piece::Pawn) | b.pieces(Piece::Rook) | b.pieces(Piece::Queen);
        if !heavy.is_empty() { return false; }
        (b.pieces(Piece::Knight) | b.pieces(Piece::Bishop)).len() <= 1
    }

    pub fn is_draw(&self) -> bool {
        (self.board.halfmove_clock() >= 100 && !self.is_mate()) || self.is_repetition() || self.is_material_draw()
    }

    pub fn make_move(&mut self, mv: Move) -> Undo {
        debug_assert!(self.board.is_legal(mv), "illegal move {mv} fed to make_move");
        let prev = self.board.clone();
        self.keys.push(prev.hash());
        self.board.play_unchecked(mv);
        Undo { board: prev }
    }

    pub fn undo_move(&mut self, undo: Undo) {
        self.board = undo.board;
        self.keys.pop();
    }

    /// `None` when the side to move is in check.
    pub fn make_null_move(&mut self) -> Option<Undo> {
        let next = self.board.null_move()?;
        let prev = std::mem::replace(&mut self.board, next);
        self.keys.push(prev.hash());
        Some(Undo { board: prev })
    }

    pub fn undo_null_move(&mut self, undo: Undo) { self.undo_move(undo) }

    pub fn is_legal(&self, mv: Move) -> bool { self.board.is_legal(mv) }

    pub fn has_legal_moves(&self) -> bool {
        self.board.generate_moves(|_| true)
    }

    pub fn is_mate(&self) -> bool { self.in_check() && !self.has_legal_moves() }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut out = Vec::with_capacity(64);
        self.gen_legal(&mut out);
        out
    }

    pub fn legal_moves_count(&self) -> usize {
        let mut ct = 0usize;
        self.board.generate_moves(|moves| { ct += moves.len(); false });
        ct
    }

    pub fn gen_legal(&self, out: &mut Vec<Move>) {
        self.board.generate_moves(|moves| { out.extend(moves); false });
    }

    /// Captures (en passant included) and every promotion.
    pub fn gen_tactical(&self, out: &mut Vec<Move>) {
        let (enemy, pawn_extra) = self.tactical_masks();
        self.board.generate_moves(|mut moves| {
            moves.to &= if moves.piece == Piece::Pawn { enemy | pawn_extra } else { enemy };
            out.extend(moves);
            false
        });
    }

    /// Everything `gen_tactical` leaves out, castling included.
    pub fn gen_quiet(&self, out: &mut Vec<Move>) {
        let (enemy, pawn_extra) = self.tactical_masks();
        self.board.generate_moves(|mut moves| {
            moves.to &= if moves.piece == Piece::Pawn { !(enemy | pawn_extra) } else { !enemy };
            out.extend(moves);
            false
        });
    }

    pub fn gen_quiet_checks(&self, out: &mut Vec<Move>) {
        let start = out.len();
        self.gen_quiet(out);
        let mut keep = start;
        for i in start..out.len() {
            if self.gives_check(out[i]) { out[keep] = out[i]; keep += 1; }
        }
        out.truncate(keep);
    }

    fn tactical_masks(&self) -> (BitBoard, BitBoard) {
        let stm = self.side_to_move();
        let enemy = self.board.colors(!stm);
        let promo_rank = if stm == Color::White { 7 } else { 0 };
        let ep = self.ep_square().map_or(BitBoard::EMPTY, |sq| sq.bitboard());
        (enemy, ep | BitBoard(rank_bb(promo_rank)))
    }

    pub fn ep_square(&self) -> Option<Square> {
        let rank = if self.side_to_move() == Color::White { Rank::Sixth } else { Rank::Third };
        self.board.en_passant().map(|file| Square::new(file, rank))
    }

    pub fn moving_piece(&self, mv: Move) -> Option<Piece> { self.board.piece_on(mv.from) }

    pub fn is_en_passant(&self, mv: Move) -> bool {
        self.board.piece_on(mv.from) == Some(Piece::Pawn)
            && mv.from.file() != mv.to.file()
            && self.board.piece_on(mv.to).is_none()
    }

    pub fn is_castle(&self, mv: Move) -> bool {
        self.board.piece_on(mv.from) == Some(Piece::King) && self.board.colors(self.side_to_move()).has(mv.to)
    }

    /// Piece removed by `mv`, pawn for en passant.
    pub fn captured_piece(&self, mv: Move) -> Option<Piece> {
        if self.board.colors(!self.side_to_move()).has(mv.to) { return self.board.piece_on(mv.to); }
        if self.is_en_passant(mv) { Some(Piece::Pawn) } else { None }
    }

    fn is_capture(&self, mv: Move) -> bool { self.captured_piece(mv).is_some() }

    pub fn is_tactical(&self, mv: Move) -> bool { mv.promotion.is_some() || self.is_capture(mv) }

    pub fn gives_check(&self, mv: Move) -> bool {
        let mut next = self.board.clone();
        next.play_unchecked(mv);
        !next.checkers().is_empty()
    }

    /// Colour-and-piece (0..12) by destination square (0..64), used by the
    /// history tables.
    pub fn history_index(&self, mv: Move) -> usize {
        let piece = self.board.piece_on(mv.from).map_or(0, |p| p as usize);
        let color = self.side_to_move() as usize;
        (color * 6 + piece) * 64 + mv.to as usize
    }

    /// True when the side to move owns more than its king and pawns.
    pub fn has_piece(&self, color: Color) -> bool {
        let own = self.board.colors(color);
        !(own & !(self.board.pieces(Piece::Pawn) | self.board.pieces(Piece::King))).is_empty()
    }

    pub fn pawn_on_seventh(&self, color: Color) -> bool {
        let rank = if color == Color::White { 6 } else { 1 };
        !(self.board.colored_pieces(color, Piece::Pawn) & BitBoard(rank_bb(rank))).is_empty()
    }

    /// Pawn move landing on a square from which no pawn can stop it. The
    /// seventh rank always counts, promotion squares never do.
    pub fn is_passed_push(&self, mv: Move) -> bool {
        let me = self.side_to_move();
        let rank = relative_rank(mv.to, me);
        if rank == 7 { return false; }
        if rank == 6 { return true; }
        let file = mv.to.file() as usize;
        let ahead = ahead_of(mv.to.rank() as usize, me);
        let pawns = self.board.pieces(Piece::Pawn).0;
        let theirs = self.board.colored_pieces(!me, Piece::Pawn).0;
        if pawns & file_bb(file) & ahead != 0 { return false; }
        let mut sides = 0u64;
        if file > 0 { sides |= file_bb(file - 1); }
        if file < 7 { sides |= file_bb(file + 1); }
        theirs & sides & ahead == 0
    }

    /// Capturing the last non-pawn piece so only kings and pawns remain.
    pub fn enters_pawn_endgame(&self, mv: Move) -> bool {
        if !self.board.colors(!self.side_to_move()).has(mv.to) { return false; }
        if self.board.piece_on(mv.to) == Some(Piece::Pawn) || mv.promotion.is_some() { return false; }
        let non_pawn = self.board.occupied() & !self.board.pieces(Piece::Pawn);
        non_pawn.len() - 1 == 2
    }

    /// Bare king stuck in a corner without a legal move.
    pub fn is_corner_stalemate(&self) -> bool {
        let me = self.side_to_move();
        if self.board.colors(me).len() != 1 { return false; }
        let king = self.board.king(me);
        if !matches!(king, Square::A1 | Square::H1 | Square::A8 | Square::H8) { return false; }
        !self.in_check() && !self.has_legal_moves()
    }

    pub fn move_to_uci(&self, mv: Move) -> String {
        if self.is_castle(mv) {
            let file = if (mv.to.file() as usize) > (mv.from.file() as usize) { File::G } else { File::C };
            return format!("{}{}", mv.from, Square::new(file, mv.from.rank()));
        }
        format!("{}", mv)
    }

    /// UCI text of a line played from this position; stops at the first
    /// illegal move.
    pub fn line_to_uci(&self, line: &[Move]) -> Vec<String> {
        let mut pos = self.clone();
        let mut out = Vec::with_capacity(line.len());
        for &mv in line {
            if !pos.is_legal(mv) { break; }
            out.push(pos.move_to_uci(mv));
            pos.make_move(mv);
        }
        out
    }

    pub fn parse_uci_move(&self, text: &str) -> Result<Move, EngineError> {
        let mut mv: Move = text.parse().map_err(|_| EngineError::BadMove(text.to_string()))?;
        let own = self.board.colors(self.side_to_move());
        let king_step = (mv.from.file() as i32 - mv.to.file() as i32).abs();
        if self.board.piece_on(mv.from) == Some(Piece::King) && own.has(mv.from) && king_step == 2 && !own.has(mv.to) {
            let file = if (mv.to.file() as usize) > (mv.from.file() as usize) { File::H } else { File::A };
            mv.to = Square::new(file, mv.from.rank());
        }
        if self.board.is_legal(mv) { Ok(mv) } else { Err(EngineError::IllegalMove(text.to_string())) }
    }

    pub fn make_move_uci(&mut self, mv_uci: &str) -> Result<(), EngineError> {
        let mv = self.parse_uci_move(mv_uci)?;
        self.make_move(mv);
        Ok(())
    }

    pub fn set_from_start_and_moves(moves: &[String]) -> Result<Self, EngineError> {
        let mut pos = Self::startpos();
        for m in moves { pos.make_move_uci(m)?; }
        Ok(pos)
    }

    /// Same position with colours swapped and the board flipped top to bottom.
    pub fn mirrored(&self) -> Result<Self, EngineError> {
        let fen = format!("{}", self.board);
        let mut fields = fen.split_whitespace();
        let placement = fields.next().unwrap_or_default();
        let stm = fields.next().unwrap_or("w");
        let castling = fields.next().unwrap_or("-");
        let ep = fields.next().unwrap_or("-");
        let rest: Vec<&str> = fields.collect();
        let swap = |c: char| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c.to_ascii_uppercase() };
        let rows: Vec<String> = placement.split('/').rev().map(|row| row.chars().map(swap).collect()).collect();
        let stm = if stm == "w" { "b" } else { "w" };
        let castling: String = if castling == "-" { "-".into() } else {
            let mut c: Vec<char> = castling.chars().map(swap).collect();
            c.sort_by_key(|ch| (ch.is_ascii_lowercase(), *ch != 'K' && *ch != 'k'));
            c.into_iter().collect()
        };
        let ep: String = ep.chars().map(|c| match c { '3' => '6', '6' => '3', other => other }).collect();
        let fen = format!("{} {} {} {} {}", rows.join("/"), stm, castling, ep, rest.join(" "));
        Self::from_fen(fen.trim())
    }
}
