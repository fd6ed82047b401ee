use rand::Rng;

use super::snake::Snake;
use super::types::{ActionSet, Direction, GameStatus, Point};

pub const ARENA_SIZE: usize = 16;
const CELL_COUNT: usize = ARENA_SIZE * ARENA_SIZE;

/// A snake dies after this many moves without eating.
pub const STARVATION_LIMIT: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    P1,
    P2,
    Apple,
}

/// Picks the cell for the next apple. Injectable so tests can pin the apple
/// to a known position.
pub type AppleSpawner = fn(&SnakeBoard) -> Option<Point>;

/// The full game position: both snakes, the apple, and a pixel grid kept in
/// sync for O(1) occupancy checks. Both players move at once through
/// [`SnakeBoard::step`].
#[derive(Clone, Debug)]
pub struct SnakeBoard {
    p1: Snake,
    p2: Snake,
    apple: Point,
    cells: [Cell; CELL_COUNT],
    status: GameStatus,
    spawner: AppleSpawner,
}

/// One player's reading of the board: `snake` is "me", `opponent` the other.
pub struct PlayerView<'a> {
    pub snake: &'a Snake,
    pub opponent: &'a Snake,
    board: &'a SnakeBoard,
}

impl<'a> PlayerView<'a> {
    /// A move is valid when the head lands on a free or apple cell inside
    /// the arena.
    pub fn valid_move(&self, d: Direction) -> bool {
        self.board.is_unoccupied(self.snake.peek(d))
    }

    /// The set of rule-valid moves. A boxed-in player is permitted every
    /// direction: all of them lose, and the move resolution decides the
    /// outcome. The set is therefore never empty.
    pub fn valid_moves(&self) -> ActionSet {
        let set: ActionSet = Direction::ALL
            .into_iter()
            .filter(|d| self.valid_move(*d))
            .collect();
        if set.is_empty() {
            ActionSet::ALL
        } else {
            set
        }
    }
}

impl Default for SnakeBoard {
    fn default() -> Self {
        SnakeBoard::new(
            Snake::new(Point::new((ARENA_SIZE / 4) as i8, (ARENA_SIZE / 2) as i8)),
            Snake::new(Point::new((3 * ARENA_SIZE / 4) as i8, (ARENA_SIZE / 2) as i8)),
            random_free_position,
        )
    }
}

impl SnakeBoard {
    pub fn new(p1: Snake, p2: Snake, spawner: AppleSpawner) -> SnakeBoard {
        let mut board = SnakeBoard {
            p1,
            p2,
            apple: Point::default(),
            cells: [Cell::Empty; CELL_COUNT],
            status: GameStatus::Running,
            spawner,
        };
        for p in board.p1.points().collect::<Vec<_>>() {
            board.set(p, Cell::P1);
        }
        for p in board.p2.points().collect::<Vec<_>>() {
            board.set(p, Cell::P2);
        }
        board.spawn_apple();
        board
    }

    pub fn at(&self, p: Point) -> Cell {
        self.cells[p.x as usize + ARENA_SIZE * p.y as usize]
    }

    fn set(&mut self, p: Point, cell: Cell) {
        self.cells[p.x as usize + ARENA_SIZE * p.y as usize] = cell;
    }

    pub fn is_oob(&self, p: Point) -> bool {
        p.x < 0 || p.y < 0 || p.x as usize >= ARENA_SIZE || p.y as usize >= ARENA_SIZE
    }

    /// Free to move into: inside the arena and not covered by a snake.
    pub fn is_unoccupied(&self, p: Point) -> bool {
        !self.is_oob(p) && matches!(self.at(p), Cell::Empty | Cell::Apple)
    }

    pub fn p1_view(&self) -> PlayerView<'_> {
        PlayerView {
            snake: &self.p1,
            opponent: &self.p2,
            board: self,
        }
    }

    pub fn p2_view(&self) -> PlayerView<'_> {
        PlayerView {
            snake: &self.p2,
            opponent: &self.p1,
            board: self,
        }
    }

    pub fn apple_position(&self) -> Point {
        self.apple
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Advances both snakes one tick. Death and victory resolve as
    /// follows:
    /// - head-on collision, or both dying at once, compares lengths
    ///   (longer wins, equal draws);
    /// - otherwise a lone death hands the win to the survivor;
    /// - eating grows the snake and respawns the apple;
    /// - a snake starving past [`STARVATION_LIMIT`] counts as dead.
    pub fn step(&mut self, p1_dir: Direction, p2_dir: Direction) -> GameStatus {
        let p1_next = self.p1.peek(p1_dir);
        let p2_next = self.p2.peek(p2_dir);

        let p1_alive = self.is_unoccupied(p1_next)
            && self.p1.moves_since_last_apple() < STARVATION_LIMIT;
        let p2_alive = self.is_unoccupied(p2_next)
            && self.p2.moves_since_last_apple() < STARVATION_LIMIT;

        if p1_next == p2_next || (!p1_alive && !p2_alive) {
            self.status = match self.p1.len().cmp(&self.p2.len()) {
                std::cmp::Ordering::Greater => GameStatus::P1Win,
                std::cmp::Ordering::Less => GameStatus::P2Win,
                std::cmp::Ordering::Equal => GameStatus::Draw,
            };
            return self.status;
        }

        if p1_alive != p2_alive {
            self.status = if p1_alive {
                GameStatus::P1Win
            } else {
                GameStatus::P2Win
            };
            return self.status;
        }

        let mut apple_consumed = false;
        if self.at(p1_next) == Cell::Apple {
            apple_consumed = true;
            self.p1.grow(p1_dir);
        } else {
            let vacated = self.p1.advance(p1_dir);
            self.set(vacated, Cell::Empty);
        }
        if self.at(p2_next) == Cell::Apple {
            apple_consumed = true;
            self.p2.grow(p2_dir);
        } else {
            let vacated = self.p2.advance(p2_dir);
            self.set(vacated, Cell::Empty);
        }

        self.set(p1_next, Cell::P1);
        self.set(p2_next, Cell::P2);

        if apple_consumed {
            self.spawn_apple();
        }

        self.status = GameStatus::Running;
        self.status
    }

    fn spawn_apple(&mut self) {
        if let Some(p) = (self.spawner)(self) {
            self.apple = p;
            self.set(p, Cell::Apple);
        }
    }

    /// ASCII rendering for logs: `.` empty, `1`/`2` snakes, `a` apple.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(CELL_COUNT + ARENA_SIZE);
        for y in 0..ARENA_SIZE {
            for x in 0..ARENA_SIZE {
                out.push(match self.cells[x + ARENA_SIZE * y] {
                    Cell::Empty => '.',
                    Cell::P1 => '1',
                    Cell::P2 => '2',
                    Cell::Apple => 'a',
                });
            }
            out.push('\n');
        }
        out
    }
}

/// Default apple spawner: a uniformly random free cell, probed linearly
/// from a random start.
fn random_free_position(board: &SnakeBoard) -> Option<Point> {
    let mut rng = rand::thread_rng();
    let start = rng.gen_range(0..CELL_COUNT);
    let mut pos = start;
    loop {
        if board.cells[pos] == Cell::Empty {
            return Some(Point::new((pos % ARENA_SIZE) as i8, (pos / ARENA_SIZE) as i8));
        }
        pos = (pos + 1) % CELL_COUNT;
        if pos == start {
            return None;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Deterministic spawner: the last free cell in scan order, which is
    /// the far corner on an open board.
    pub fn corner_apple(board: &SnakeBoard) -> Option<Point> {
        (0..CELL_COUNT).rev().find_map(|index| {
            (board.cells[index] == Cell::Empty)
                .then(|| Point::new((index % ARENA_SIZE) as i8, (index / ARENA_SIZE) as i8))
        })
    }

    /// The two-short-snakes opening used throughout the search tests.
    pub fn two_snakes_board() -> SnakeBoard {
        let p1 = Snake::from_points([
            Point::new(0, 3),
            Point::new(0, 2),
            Point::new(0, 1),
            Point::new(0, 0),
        ]);
        let p2 = Snake::from_points([
            Point::new(1, 5),
            Point::new(1, 4),
            Point::new(1, 3),
            Point::new(1, 2),
        ]);
        SnakeBoard::new(p1, p2, corner_apple)
    }
}
