// Split-point parallel alpha-beta engine over cozy-chess
pub mod board;
pub mod error;
pub mod search;
pub mod uci;

pub use board::Position;
pub use error::EngineError;
pub use search::{SearchParams, SearchResult, Searcher};
