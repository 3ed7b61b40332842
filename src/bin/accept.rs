use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use rayon::prelude::*;
use serde::Deserialize;
use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One suite entry: a position and the expected best move in UCI text.
#[derive(Debug, Deserialize)]
struct Case {
    fen: String,
    best: String,
}

#[derive(Parser, Debug)]
#[command(name = "splitbot-accept", version, about = "Run a JSON-lines best-move suite")]
struct Args {
    /// Suite file, one {"fen": ..., "best": ...} object per line
    suite: PathBuf,

    /// First depth tried for each case
    #[arg(long, default_value_t = 5)]
    depth: u32,

    /// Deepest retry before a case counts as failed
    #[arg(long)]
    max_depth: Option<u32>,

    /// Threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Node cap per search
    #[arg(long)]
    max_nodes: Option<u64>,

    /// Transposition table size in MB
    #[arg(long, default_value_t = 64)]
    hash_mb: usize,

    /// Cases searched at once, each with its own engine
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Print a line for every solved case
    #[arg(long)]
    verbose: bool,
}

fn load_suite(path: &Path) -> Result<Vec<Case>> {
    let file = File::open(path).with_context(|| format!("failed to open suite {}", path.display()))?;
    let mut cases = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() { continue; }
        let case: Case = serde_json::from_str(line).with_context(|| format!("{}:{}: bad record", path.display(), n + 1))?;
        cases.push(case);
    }
    Ok(cases)
}

/// Solved when the search finds the expected move or any forced mate.
fn solves(searcher: &mut Searcher, pos: &Position, params: SearchParams, best: &str) -> (bool, u64) {
    let res = searcher.search_with_params(pos, params);
    let found = res.best_move.map(|m| pos.move_to_uci(m));
    let solved = found.as_deref() == Some(best) || (res.score.is_mate() && res.score.0 > 0);
    (solved, res.nodes)
}

/// First depth at which the case is solved, and the nodes spent on it.
fn run_case(searcher: &mut Searcher, case: &Case, args: &Args, max_depth: u32) -> Result<(Option<u32>, u64)> {
    let pos = Position::from_fen(&case.fen)?;
    searcher.new_game();
    let mut nodes = 0;
    for depth in args.depth..=max_depth {
        let params = SearchParams { depth, max_nodes: args.max_nodes, threads: args.threads, ..SearchParams::default() };
        let (solved, n) = solves(searcher, &pos, params, &case.best);
        nodes += n;
        if solved { return Ok((Some(depth), nodes)); }
    }
    Ok((None, nodes))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let cases = load_suite(&args.suite)?;
    let max_depth = args.max_depth.unwrap_or(args.depth).max(args.depth);

    let t0 = Instant::now();
    let outcomes: Vec<Result<(Option<u32>, u64)>> = if args.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(args.jobs).build().context("failed to build thread pool")?;
        pool.install(|| {
            cases
                .par_iter()
                .map_init(|| Searcher::new(args.hash_mb, args.threads), |searcher, case| run_case(searcher, case, &args, max_depth))
                .collect()
        })
    } else {
        let mut searcher = Searcher::new(args.hash_mb, args.threads);
        cases.iter().map(|case| run_case(&mut searcher, case, &args, max_depth)).collect()
    };

    let mut nodes = 0u64;
    let mut failures = Vec::new();
    for (i, (case, outcome)) in cases.iter().zip(outcomes).enumerate() {
        let (solved_at, n) = outcome.with_context(|| format!("case {i}"))?;
        nodes += n;
        match solved_at {
            Some(depth) if args.verbose => println!("ok idx={i} depth={depth}"),
            Some(_) => {}
            None => failures.push(format!("idx={i} fen={} expect={}", case.fen, case.best)),
        }
    }

    let dt = t0.elapsed().as_secs_f64();
    info!("suite finished in {dt:.3}s");
    println!(
        "summary: cases={} failed={} nodes={} elapsed={:.3}s depth={}..{} threads={} jobs={}",
        cases.len(),
        failures.len(),
        nodes,
        dt,
        args.depth,
        max_depth,
        args.threads,
        args.jobs.max(1)
    );
    if !failures.is_empty() {
        eprintln!("failures ({}):\n{}", failures.len(), failures.join("\n"));
        bail!("{} of {} cases failed", failures.len(), cases.len());
    }
    Ok(())
}
