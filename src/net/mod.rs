// Network-facing side of the search: the evaluator contract, the feature
// encoder, and the batching coordinator that multiplexes one network across
// every in-flight search fiber.

pub mod batcher;
pub mod encoder;
pub mod types;

pub use self::batcher::{Batcher, BatcherPhase, EvalHandle};
pub use self::encoder::{encode_board, Features, FEATURE_LEN, FEATURE_PLANES};
pub use self::types::{PolicyValueNet, Prediction, UniformNet};
