// snakezero - AlphaZero-style self-play engine for simultaneous-move snake.
//
// This file is the central organization point: it exports the game rules,
// the search core, the batched-inference plumbing and the self-play driver.

// Game rules
pub mod game;

// Search core: adapter, tree, MCTS engine, leaf evaluators
pub mod search;

// Network boundary: evaluator contract, feature encoder, batching
pub mod net;

// Self-play driver and replay plumbing
pub mod replay;
pub mod self_play;

// Error taxonomy
pub mod errors;

// Re-export common types for convenient access
pub use crate::errors::{NetError, SearchError, SinkError};
pub use crate::game::{Direction, GameStatus, Snake, SnakeBoard};
pub use crate::net::{Batcher, EvalHandle, Features, PolicyValueNet, Prediction, UniformNet};
pub use crate::replay::{DiscardSink, MemorySink, ReplaySink, StoreRequest, TcpSink};
pub use crate::search::{GameAdapter, LeafEvaluator, Mcts, ScorePolicy};
pub use crate::self_play::{play_game, run_scheduler, GameRecord};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
