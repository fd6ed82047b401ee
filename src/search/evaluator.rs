use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::SearchResult;
use crate::game::types::ACTION_COUNT;
use crate::net::batcher::EvalHandle;
use crate::net::encoder::encode_board;
use crate::search::adapter::GameAdapter;

/// What a leaf evaluation produced: a scalar value in player-1's frame, and
/// optionally a policy to install as priors when the leaf expands.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub policy: Option<[f64; ACTION_COUNT]>,
    pub value: f64,
}

/// The pluggable "evaluate a leaf" seam. Two variants exist: a random
/// rollout that never leaves the fiber, and the batched network client that
/// suspends until the coordinator replies.
#[async_trait(?Send)]
pub trait LeafEvaluator {
    async fn evaluate(&mut self, adapter: &GameAdapter) -> SearchResult<Evaluation>;
}

/// Plays uniformly random valid moves to the end of the game and reports
/// the terminal value. No policy, no I/O, no suspension.
pub struct RolloutEvaluator {
    rng: StdRng,
}

impl RolloutEvaluator {
    pub fn new(seed: u64) -> RolloutEvaluator {
        RolloutEvaluator {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait(?Send)]
impl LeafEvaluator for RolloutEvaluator {
    async fn evaluate(&mut self, adapter: &GameAdapter) -> SearchResult<Evaluation> {
        let mut rollout = adapter.clone();
        while !rollout.is_terminal() {
            let actions = rollout.valid_actions();
            let pick = self.rng.gen_range(0..actions.len());
            let action = actions
                .iter()
                .nth(pick)
                .expect("valid_actions is never empty off-terminal");
            rollout.execute(action)?;
        }
        Ok(Evaluation {
            policy: None,
            value: rollout.value()?,
        })
    }
}

/// The network-backed evaluator: encodes the position, pushes one request
/// into the fiber's channel and suspends until the batching coordinator
/// delivers the prediction.
pub struct NetworkEvaluator {
    handle: EvalHandle,
}

impl NetworkEvaluator {
    pub fn new(handle: EvalHandle) -> NetworkEvaluator {
        NetworkEvaluator { handle }
    }
}

#[async_trait(?Send)]
impl LeafEvaluator for NetworkEvaluator {
    async fn evaluate(&mut self, adapter: &GameAdapter) -> SearchResult<Evaluation> {
        let features = encode_board(adapter.board());
        let prediction = self.handle.evaluate(features).await?;
        Ok(Evaluation {
            policy: Some(prediction.policy.map(f64::from)),
            value: f64::from(prediction.value),
        })
    }
}
