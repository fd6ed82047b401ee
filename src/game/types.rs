use serde::{Deserialize, Serialize};

/// The fixed action set. Every decision in the game picks one of these four
/// directions; slot arrays throughout the search are indexed by
/// `Direction::index`.
///
/// Coordinate system:
/// ```text
///             UP
///             -y
///             |
/// LEFT -x ---------- +x RIGHT
///             |
///             +y
///            DOWN
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

pub const ACTION_COUNT: usize = 4;

impl Direction {
    pub const ALL: [Direction; ACTION_COUNT] =
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        Direction::ALL.get(index).copied()
    }
}

/// A subset of the four directions, packed into a nibble.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet(0);
    pub const ALL: ActionSet = ActionSet((1 << ACTION_COUNT) - 1);

    pub fn insert(&mut self, d: Direction) {
        self.0 |= 1 << d.index();
    }

    pub fn contains(self, d: Direction) -> bool {
        self.0 & (1 << d.index()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Directions in index order (lowest first).
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Direction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = ActionSet::EMPTY;
        for d in iter {
            set.insert(d);
        }
        set
    }
}

/// An arena coordinate. Signed so that off-board probes stay representable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i8,
    pub y: i8,
}

impl Point {
    pub fn new(x: i8, y: i8) -> Point {
        Point { x, y }
    }

    /// The neighbouring point one step in direction `d`.
    pub fn peek(self, d: Direction) -> Point {
        match d {
            Direction::Up => Point::new(self.x, self.y - 1),
            Direction::Down => Point::new(self.x, self.y + 1),
            Direction::Left => Point::new(self.x - 1, self.y),
            Direction::Right => Point::new(self.x + 1, self.y),
        }
    }

    /// Manhattan distance.
    pub fn mdist(self, other: Point) -> i32 {
        (i32::from(self.x) - i32::from(other.x)).abs()
            + (i32::from(self.y) - i32::from(other.y)).abs()
    }
}

/// Outcome of a game round, from player 1's perspective where signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Running,
    P1Win,
    P2Win,
    Draw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Running
    }

    /// `+1` / `-1` / `0` from player 1's perspective; `None` while running.
    pub fn value(self) -> Option<i8> {
        match self {
            GameStatus::Running => None,
            GameStatus::P1Win => Some(1),
            GameStatus::P2Win => Some(-1),
            GameStatus::Draw => Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d.index()), Some(d));
        }
        assert_eq!(Direction::from_index(ACTION_COUNT), None);
    }

    #[test]
    fn test_action_set_iteration_order() {
        let mut set = ActionSet::EMPTY;
        set.insert(Direction::Right);
        set.insert(Direction::Up);
        let order: Vec<Direction> = set.iter().collect();
        assert_eq!(order, vec![Direction::Up, Direction::Right]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_peek_follows_screen_coordinates() {
        let p = Point::new(3, 4);
        assert_eq!(p.peek(Direction::Up), Point::new(3, 3));
        assert_eq!(p.peek(Direction::Down), Point::new(3, 5));
        assert_eq!(p.peek(Direction::Left), Point::new(2, 4));
        assert_eq!(p.peek(Direction::Right), Point::new(4, 4));
    }

    #[test]
    fn test_status_values() {
        assert_eq!(GameStatus::P1Win.value(), Some(1));
        assert_eq!(GameStatus::P2Win.value(), Some(-1));
        assert_eq!(GameStatus::Draw.value(), Some(0));
        assert_eq!(GameStatus::Running.value(), None);
        assert!(!GameStatus::Running.is_terminal());
        assert!(GameStatus::Draw.is_terminal());
    }
}
