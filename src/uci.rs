use log::{debug, warn};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::board::Position;
use crate::error::EngineError;
use crate::search::engine::{IterationInfo, SearchControl, SearchParams, SearchResult, Searcher};
use crate::search::threads::{THREAD_MAX, THREAD_STACK};
use crate::search::tt::{HASH_MB_DEFAULT, HASH_MB_MAX, HASH_MB_MIN};
use crate::search::worker::Bound;

const NODES_MIN: u64 = 1000;
const MULTI_PV_MAX: usize = 10;

/// UCI front end. Searches run on a background thread so `stop` and
/// `ponderhit` are served while the engine thinks.
pub struct UciEngine {
    pos: Position,
    searcher: Arc<Mutex<Searcher>>,
    control: Arc<SearchControl>,
    search: Option<JoinHandle<()>>,
    options: SearchParams,
}

impl Default for UciEngine {
    fn default() -> Self { Self::new() }
}

impl UciEngine {
    pub fn new() -> Self { Self::with_config(HASH_MB_DEFAULT, 1) }

    pub fn with_config(hash_mb: usize, threads: usize) -> Self {
        let searcher = Searcher::new(hash_mb, threads);
        let control = searcher.stop_handle();
        Self {
            pos: Position::startpos(),
            searcher: Arc::new(Mutex::new(searcher)),
            control,
            search: None,
            options: SearchParams::default(),
        }
    }

    pub fn position(&self) -> &Position { &self.pos }

    fn with_searcher<R>(&mut self, f: impl FnOnce(&mut Searcher) -> R) -> R {
        self.join_search();
        let mut searcher = self.searcher.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut searcher)
    }

    fn join_search(&mut self) {
        if let Some(handle) = self.search.take() {
            let _ = handle.join();
        }
    }

    fn cmd_uci(&self) {
        println!("id name SplitBot {}", env!("CARGO_PKG_VERSION"));
        println!("id author PieBot Team");
        println!("option name Hash type spin default {HASH_MB_DEFAULT} min {HASH_MB_MIN} max {HASH_MB_MAX}");
        println!("option name Threads type spin default 1 min 1 max {THREAD_MAX}");
        println!("option name MultiPV type spin default 1 min 1 max {MULTI_PV_MAX}");
        println!("option name Contempt Factor type spin default 0 min -1000 max 1000");
        println!("option name Aspiration Window type spin default {} min 1 max 500", self.options.aspiration_window);
        println!("option name Ponder type check default false");
        println!("uciok");
    }

    fn cmd_isready(&self) { println!("readyok"); }

    fn cmd_ucinewgame(&mut self) {
        self.pos = Position::startpos();
        self.with_searcher(|s| s.new_game());
    }

    fn cmd_setoption(&mut self, args: &str) -> Result<(), EngineError> {
        let rest = args.trim_start().strip_prefix("name ").unwrap_or(args);
        let (name, value) = match rest.split_once(" value ") {
            Some((n, v)) => (n.trim(), v.trim()),
            None => (rest.trim(), ""),
        };
        let bad = || EngineError::BadOption { name: name.to_string(), value: value.to_string() };
        match name.to_ascii_lowercase().as_str() {
            "hash" => {
                let mb: usize = value.parse().map_err(|_| bad())?;
                self.with_searcher(|s| s.set_hash_mb(mb.clamp(HASH_MB_MIN, HASH_MB_MAX)));
            }
            "threads" => {
                let n: usize = value.parse().map_err(|_| bad())?;
                self.with_searcher(|s| s.set_threads(n));
            }
            "multipv" => {
                let n: usize = value.parse().map_err(|_| bad())?;
                self.options.multi_pv = n.clamp(1, MULTI_PV_MAX);
            }
            "contempt factor" => self.options.contempt = value.parse().map_err(|_| bad())?,
            "aspiration window" => {
                let w: i32 = value.parse().map_err(|_| bad())?;
                self.options.aspiration_window = w.max(1);
            }
            "ponder" => {}
            _ => return Err(bad()),
        }
        debug!("option {name} = {value}");
        Ok(())
    }

    fn cmd_position(&mut self, args: &str) -> Result<(), EngineError> {
        let (setup, moves) = match args.split_once("moves") {
            Some((s, m)) => (s.trim(), Some(m)),
            None => (args.trim(), None),
        };
        let mut pos = if setup == "startpos" {
            Position::startpos()
        } else if let Some(fen) = setup.strip_prefix("fen ") {
            Position::from_fen(fen.trim())?
        } else {
            return Err(EngineError::Fen { fen: setup.to_string(), reason: "expected startpos or fen".into() });
        };
        for mv in moves.into_iter().flat_map(str::split_whitespace) {
            pos.make_move_uci(mv)?;
        }
        self.pos = pos;
        Ok(())
    }

    fn parse_go(&self, args: &str) -> SearchParams {
        let mut params = self.options;
        let mut tokens = args.split_whitespace();
        let ms = |t: Option<&str>| t.and_then(|s| s.parse::<i64>().ok()).map(|v| Duration::from_millis(v.max(0) as u64));
        while let Some(tok) = tokens.next() {
            match tok {
                "depth" => params.depth = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(0),
                "mate" => {
                    if let Some(n) = tokens.next().and_then(|s| s.parse::<u32>().ok()) {
                        params.depth = (2 * n).saturating_sub(1).max(1);
                    }
                }
                "nodes" => params.max_nodes = tokens.next().and_then(|s| s.parse::<u64>().ok()).map(|n| n.max(NODES_MIN)),
                "movetime" => params.movetime = ms(tokens.next()),
                "wtime" => params.wtime = ms(tokens.next()),
                "btime" => params.btime = ms(tokens.next()),
                "winc" => params.winc = ms(tokens.next()),
                "binc" => params.binc = ms(tokens.next()),
                "movestogo" => params.movestogo = tokens.next().and_then(|s| s.parse().ok()),
                "infinite" => params.infinite = true,
                "ponder" => params.ponder = true,
                "searchmoves" => break,
                other => warn!("ignoring go token {other}"),
            }
        }
        params
    }

    fn cmd_go(&mut self, args: &str) {
        self.join_search();
        let params = self.parse_go(args);
        let pos = self.pos.clone();
        let searcher = Arc::clone(&self.searcher);
        let control = Arc::clone(&self.control);
        control.arm(params.infinite || params.ponder);
        let spawned = std::thread::Builder::new().name("splitbot-search".into()).stack_size(THREAD_STACK).spawn(move || {
            let mut searcher = searcher.lock().unwrap_or_else(|e| e.into_inner());
            let result = searcher.search_armed(&pos, params, |info| print_info(&pos, info));
            // bestmove may only follow a stop or ponderhit while pondering
            while control.is_infinite() && !control.stop_requested() {
                std::thread::sleep(Duration::from_millis(1));
            }
            print_bestmove(&pos, &result);
        });
        match spawned {
            Ok(handle) => self.search = Some(handle),
            Err(e) => warn!("could not start search thread: {e}"),
        }
    }

    /// Handles one command line. Returns false on `quit`.
    pub fn handle(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (cmd, args) = line.split_once(' ').unwrap_or((line, ""));
        let outcome = match cmd {
            "" => Ok(()),
            "uci" => {
                self.cmd_uci();
                Ok(())
            }
            "isready" => {
                self.cmd_isready();
                Ok(())
            }
            "ucinewgame" => {
                self.cmd_ucinewgame();
                Ok(())
            }
            "setoption" => self.cmd_setoption(args),
            "position" => self.cmd_position(args),
            "go" => {
                self.cmd_go(args);
                Ok(())
            }
            "stop" => {
                self.control.stop();
                Ok(())
            }
            "ponderhit" => {
                self.control.ponderhit();
                Ok(())
            }
            "quit" => {
                self.control.stop();
                self.join_search();
                return false;
            }
            other => {
                warn!("unknown command {other}");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!("{cmd}: {e}");
        }
        true
    }

    pub fn run_loop(&mut self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if !self.handle(&line) { break; }
        }
        self.control.stop();
        self.join_search();
    }
}

fn print_info(pos: &Position, info: &IterationInfo) {
    let bound = match info.bound {
        Bound::Exact => "",
        Bound::Lower => " lowerbound",
        Bound::Upper => " upperbound",
    };
    let ms = info.elapsed.as_millis().max(1) as u64;
    let pv = pos.line_to_uci(&info.pv);
    println!(
        "info depth {} seldepth {} multipv {} score {}{} time {} nodes {} nps {} hashfull {} pv {}",
        info.depth,
        info.seldepth,
        info.multipv,
        info.score,
        bound,
        ms,
        info.nodes,
        info.nodes * 1000 / ms,
        info.hashfull,
        pv.join(" ")
    );
    let _ = io::stdout().flush();
}

fn print_bestmove(pos: &Position, result: &SearchResult) {
    match (result.best_move, result.ponder_move) {
        (Some(best), Some(ponder)) => {
            let mut next = pos.clone();
            next.make_move(best);
            println!("bestmove {} ponder {}", pos.move_to_uci(best), next.move_to_uci(ponder));
        }
        (Some(best), None) => println!("bestmove {}", pos.move_to_uci(best)),
        _ => println!("bestmove 0000"),
    }
    let _ = io::stdout().flush();
}
