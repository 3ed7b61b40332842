use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use splitbot::board::Position;
use splitbot::search::{SearchParams, Searcher};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "2r3k1/pp3ppp/8/3p4/3P4/8/PP3PPP/2R3K1 w - - 0 1",
];

#[derive(Parser, Debug)]
#[command(name = "splitbot-bench", version, about = "Fixed-depth search benchmark")]
struct Args {
    /// File with one FEN per line; the built-in list when absent
    #[arg(long)]
    positions: Option<PathBuf>,

    /// Search depth in plies
    #[arg(long, default_value_t = 8)]
    depth: u32,

    /// Movetime in milliseconds per position (replaces the depth limit)
    #[arg(long)]
    movetime: Option<u64>,

    /// Threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Transposition table size in MB
    #[arg(long, default_value_t = 64)]
    hash_mb: usize,

    /// Write one JSON record per position to this file
    #[arg(long)]
    jsonl: Option<PathBuf>,
}

#[derive(Serialize)]
struct BenchRecord {
    fen: String,
    best: Option<String>,
    score: String,
    depth: u32,
    seldepth: usize,
    nodes: u64,
    elapsed_ms: u128,
}

fn load_positions(args: &Args) -> Result<Vec<String>> {
    let Some(path) = args.positions.as_ref() else {
        return Ok(BENCH_POSITIONS.iter().map(|s| s.to_string()).collect());
    };
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') { out.push(line.to_string()); }
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let fens = load_positions(&args)?;

    let mut searcher = Searcher::new(args.hash_mb, args.threads);
    let mut params = SearchParams { threads: args.threads, ..SearchParams::default() };
    match args.movetime {
        Some(ms) => params.movetime = Some(Duration::from_millis(ms)),
        None => params.depth = args.depth,
    }

    let mut out = match args.jsonl.as_ref() {
        Some(path) => Some(BufWriter::new(File::create(path).with_context(|| format!("failed to create {}", path.display()))?)),
        None => None,
    };

    let progress = ProgressBar::new(fens.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );

    let t0 = Instant::now();
    let mut total_nodes = 0u64;
    for fen in &fens {
        let pos = Position::from_fen(fen)?;
        searcher.new_game();
        let res = searcher.search_with_params(&pos, params);
        total_nodes += res.nodes;
        progress.set_message(format!("{} nodes", total_nodes));
        progress.inc(1);
        if let Some(out) = out.as_mut() {
            let record = BenchRecord {
                fen: fen.clone(),
                best: res.best_move.map(|m| pos.move_to_uci(m)),
                score: res.score.to_string(),
                depth: res.depth,
                seldepth: res.seldepth,
                nodes: res.nodes,
                elapsed_ms: res.elapsed.as_millis(),
            };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }
    }
    progress.finish_and_clear();
    if let Some(mut out) = out { out.flush()?; }

    let dt = t0.elapsed().as_secs_f64();
    let nps = if dt > 0.0 { total_nodes as f64 / dt } else { 0.0 };
    println!("positions={} nodes={} elapsed={:.3}s nps={:.0} threads={}", fens.len(), total_nodes, dt, nps, searcher.threads());
    Ok(())
}
