use clap::Parser;
use log::info;
use splitbot::search::threads::THREAD_MAX;
use splitbot::search::tt::HASH_MB_DEFAULT;
use splitbot::uci::UciEngine;

#[derive(Parser, Debug)]
#[command(author, version, about = "SplitBot UCI chess engine", long_about = None)]
struct Args {
    /// Transposition table size in MB
    #[arg(long, default_value_t = HASH_MB_DEFAULT)]
    hash: usize,

    /// Search threads, including the main one
    #[arg(long, default_value_t = 1)]
    threads: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    info!("starting with {} MB hash and {} threads", args.hash, args.threads.clamp(1, THREAD_MAX));
    let mut engine = UciEngine::with_config(args.hash, args.threads);
    engine.run_loop();
}
