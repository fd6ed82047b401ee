use crate::errors::NetResult;
use crate::game::types::ACTION_COUNT;
use crate::net::encoder::Features;

/// One policy/value prediction for a single position. The policy is a
/// probability weight per direction (indexed by `Direction::index`); the
/// value is in `[-1, 1]` from player 1's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub policy: [f32; ACTION_COUNT],
    pub value: f32,
}

/// The external network contract. One call evaluates a whole batch; results
/// are positionally aligned with the input. Implementations must tolerate
/// concurrent calls from several coordinator threads.
pub trait PolicyValueNet: Send + Sync {
    fn predict_batch(&self, batch: &[Features]) -> NetResult<Vec<Prediction>>;
}

/// Uniform priors and zero value. Stands in for the real accelerator-backed
/// model, which lives outside this crate.
pub struct UniformNet;

impl PolicyValueNet for UniformNet {
    fn predict_batch(&self, batch: &[Features]) -> NetResult<Vec<Prediction>> {
        let p = 1.0f32 / (ACTION_COUNT as f32);
        Ok(batch
            .iter()
            .map(|_| Prediction {
                policy: [p; ACTION_COUNT],
                value: 0.0,
            })
            .collect())
    }
}
