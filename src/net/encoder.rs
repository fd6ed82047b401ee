use serde::{Deserialize, Serialize};

use crate::game::{SnakeBoard, ARENA_SIZE};

/// Feature planes: player-1 body, player-2 body, apple.
pub const FEATURE_PLANES: usize = 3;
pub const FEATURE_LEN: usize = ARENA_SIZE * ARENA_SIZE * FEATURE_PLANES;

/// A flattened `ARENA_SIZE x ARENA_SIZE x FEATURE_PLANES` float tensor,
/// indexed `(x + ARENA_SIZE * y) * FEATURE_PLANES + plane`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features(pub Vec<f32>);

impl Features {
    pub fn zeroed() -> Features {
        Features(vec![0.0; FEATURE_LEN])
    }

    pub fn at(&self, x: usize, y: usize, plane: usize) -> f32 {
        self.0[(x + ARENA_SIZE * y) * FEATURE_PLANES + plane]
    }

    fn set(&mut self, x: usize, y: usize, plane: usize, v: f32) {
        self.0[(x + ARENA_SIZE * y) * FEATURE_PLANES + plane] = v;
    }
}

/// Projects a position into network input. Snake bodies are enumerated
/// head-first with increasing weights so the network can read segment order;
/// the apple is a single unit spike on its own plane.
pub fn encode_board(board: &SnakeBoard) -> Features {
    let mut features = Features::zeroed();

    let view = board.p1_view();
    for (i, p) in view.snake.points().enumerate() {
        features.set(p.x as usize, p.y as usize, 0, (i + 1) as f32);
    }
    for (i, p) in view.opponent.points().enumerate() {
        features.set(p.x as usize, p.y as usize, 1, (i + 1) as f32);
    }
    let apple = board.apple_position();
    features.set(apple.x as usize, apple.y as usize, 2, 1.0);

    features
}
