use splitbot::board::Position;
use splitbot::search::{IterationInfo, SearchParams, Searcher};
use std::collections::HashSet;

#[test]
fn reports_k_distinct_lines_best_first() {
    let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 2 3").unwrap();
    let mut searcher = Searcher::default();
    let params = SearchParams { depth: 4, multi_pv: 3, ..SearchParams::default() };
    let mut infos: Vec<IterationInfo> = Vec::new();
    let res = searcher.search_with_callback(&pos, params, |info| infos.push(info.clone()));

    let last_depth = infos.iter().map(|i| i.depth).max().unwrap();
    let last: Vec<&IterationInfo> = infos.iter().filter(|i| i.depth == last_depth).collect();
    let tail = &last[last.len() - 3..];
    assert_eq!(tail.iter().map(|i| i.multipv).collect::<Vec<_>>(), vec![1, 2, 3]);

    let firsts: HashSet<_> = tail.iter().map(|i| i.pv[0]).collect();
    assert_eq!(firsts.len(), 3, "lines must start with different moves");
    assert!(tail[0].score >= tail[1].score && tail[1].score >= tail[2].score);
    assert_eq!(res.best_move, Some(tail[0].pv[0]));
}

#[test]
fn multipv_is_capped_by_legal_moves() {
    let pos = Position::from_fen("k7/8/8/8/8/8/1r6/K7 w - - 0 1").unwrap();
    let mut searcher = Searcher::default();
    let mut lines = 0;
    let params = SearchParams { depth: 3, multi_pv: 5, ..SearchParams::default() };
    let res = searcher.search_with_callback(&pos, params, |_| lines += 1);
    assert!(res.best_move.is_some());
    assert_eq!(lines, 1);
}
