pub mod engine;
pub mod eval;
pub mod history;
pub mod probe;
pub mod see;
pub mod sort;
pub mod threads;
pub mod time;
pub mod tt;
pub mod value;
pub mod worker;

pub use engine::{IterationInfo, SearchControl, SearchParams, SearchResult, Searcher};
pub use value::Value;
pub use worker::Bound;
