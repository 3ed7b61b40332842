use rayon::prelude::*;

use super::Position;

/// Leaf count of the legal move tree `depth` plies below `pos`.
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 { return 1; }
    let moves = pos.legal_moves();
    if depth == 1 { return moves.len() as u64; }
    let mut nodes = 0;
    for mv in moves {
        let undo = pos.make_move(mv);
        nodes += perft(pos, depth - 1);
        pos.undo_move(undo);
    }
    nodes
}

/// Same count, generating tactical and quiet moves separately the way the
/// move sorter does. Disagreement with `perft` means the two generators
/// overlap or miss a move.
pub fn perft_staged(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 { return 1; }
    let mut moves = Vec::with_capacity(64);
    pos.gen_tactical(&mut moves);
    pos.gen_quiet(&mut moves);
    let mut nodes = 0;
    for mv in moves {
        let undo = pos.make_move(mv);
        nodes += perft_staged(pos, depth - 1);
        pos.undo_move(undo);
    }
    nodes
}

/// `perft` with the root moves spread over the rayon pool.
pub fn perft_parallel(pos: &Position, depth: u32) -> u64 {
    if depth <= 1 { return perft(&mut pos.clone(), depth); }
    pos.legal_moves()
        .par_iter()
        .map(|&mv| {
            let mut child = pos.clone();
            child.make_move(mv);
            perft(&mut child, depth - 1)
        })
        .sum()
}

/// Per root move counts, sorted by UCI text.
pub fn divide(pos: &Position, depth: u32) -> Vec<(String, u64)> {
    let mut out: Vec<_> = pos
        .legal_moves()
        .par_iter()
        .map(|&mv| {
            let mut child = pos.clone();
            child.make_move(mv);
            (pos.move_to_uci(mv), perft(&mut child, depth.saturating_sub(1)))
        })
        .collect();
    out.sort();
    out
}
