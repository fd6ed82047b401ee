use thiserror::Error;

use crate::game::Direction;

/// Errors surfaced by the search core.
///
/// Programming bugs (`IllegalMove`, `NotTerminal`, `Usage`) fail fast and
/// abort the whole search. External-dependency failures are caught at the
/// evaluator boundary, downgraded to per-simulation drops, and only surfaced
/// when no simulation of a decision could complete.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("illegal move {action:?} for player {player}")]
    IllegalMove { action: Direction, player: i8 },

    #[error("terminal value requested on a non-terminal position")]
    NotTerminal,

    #[error("evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    #[error("evaluator closed")]
    EvaluatorClosed,

    #[error("usage error: {0}")]
    Usage(String),
}

/// Evaluator-boundary errors. Anything the external network reports is
/// collapsed to a string here; the coordinator re-surfaces it to waiters as
/// `SearchError::EvaluatorUnavailable`.
#[derive(Error, Debug, Clone)]
pub enum NetError {
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("batch size mismatch: sent {sent}, received {received}")]
    SizeMismatch { sent: usize, received: usize },
}

/// Replay-sink transport errors.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("replay sink i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay sink serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SearchResult<T> = Result<T, SearchError>;
pub type NetResult<T> = Result<T, NetError>;
pub type SinkResult<T> = Result<T, SinkError>;

impl SearchError {
    pub fn illegal_move(action: Direction, player: i8) -> Self {
        Self::IllegalMove { action, player }
    }

    pub fn unavailable(details: impl Into<String>) -> Self {
        Self::EvaluatorUnavailable(details.into())
    }

    pub fn usage(details: impl Into<String>) -> Self {
        Self::Usage(details.into())
    }

    /// True for the transient evaluator failure that drops a single
    /// simulation without aborting the search.
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::EvaluatorUnavailable(_))
    }
}

impl From<NetError> for SearchError {
    fn from(e: NetError) -> Self {
        SearchError::EvaluatorUnavailable(e.to_string())
    }
}
