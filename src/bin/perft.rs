use anyhow::{Context, Result};
use clap::Parser;
use splitbot::board::perft::{divide, perft_parallel};
use splitbot::board::Position;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "splitbot-perft", about = "Count legal move paths to check the move generator")]
struct Args {
    /// Depth in plies
    #[arg(value_name = "DEPTH")]
    depth: u32,
    /// FEN string or "startpos"
    #[arg(value_name = "FEN", default_value = "startpos")]
    fen: String,
    /// Rayon threads for the root split
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Print the count below each root move
    #[arg(long)]
    divide: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let pos = if args.fen == "startpos" { Position::startpos() } else { Position::from_fen(&args.fen)? };

    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads.max(1)).build().context("failed to build thread pool")?;
    let t0 = Instant::now();
    let nodes = pool.install(|| {
        if args.divide {
            let counts = divide(&pos, args.depth);
            for (mv, n) in &counts {
                println!("{mv}: {n}");
            }
            counts.iter().map(|(_, n)| n).sum()
        } else {
            perft_parallel(&pos, args.depth)
        }
    });
    let dt = t0.elapsed().as_secs_f64();
    println!("nodes: {nodes} elapsed: {dt:.3}s nps: {:.0}", nodes as f64 / dt.max(f64::EPSILON));
    Ok(())
}
