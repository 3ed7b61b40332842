use thiserror::Error;

/// Errors raised at the protocol and board-input surface. The search itself
/// never fails: it always answers with a value and, when one exists, a move.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid FEN '{fen}': {reason}")]
    Fen { fen: String, reason: String },

    #[error("unparsable move '{0}'")]
    BadMove(String),

    #[error("illegal move '{0}'")]
    IllegalMove(String),

    #[error("invalid value '{value}' for option '{name}'")]
    BadOption { name: String, value: String },
}
