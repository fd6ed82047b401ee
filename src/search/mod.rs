// The search core: the sequentializing game adapter, the owned search tree,
// the MCTS engine and its pluggable leaf evaluators.

pub mod adapter;
pub mod evaluator;
pub mod mcts;
pub(crate) mod tree;

pub use self::adapter::GameAdapter;
pub use self::evaluator::{Evaluation, LeafEvaluator, NetworkEvaluator, RolloutEvaluator};
pub use self::mcts::{Mcts, ScorePolicy};
