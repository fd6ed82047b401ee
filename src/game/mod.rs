// Game rules for two-player simultaneous-move snake on a 16x16 arena.

pub mod board;
pub mod snake;
pub mod types;

pub use self::board::{PlayerView, SnakeBoard, ARENA_SIZE, STARVATION_LIMIT};
pub use self::snake::Snake;
pub use self::types::{ActionSet, Direction, GameStatus, Point, ACTION_COUNT};
