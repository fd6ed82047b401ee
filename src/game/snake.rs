use std::collections::VecDeque;

use super::types::{Direction, Point};

/// One snake: an ordered chain of occupied points, head first.
#[derive(Clone, Debug)]
pub struct Snake {
    points: VecDeque<Point>,
    moves_since_last_apple: u32,
}

impl Snake {
    pub fn new(head: Point) -> Snake {
        let mut points = VecDeque::new();
        points.push_back(head);
        Snake {
            points,
            moves_since_last_apple: 0,
        }
    }

    /// Builds a snake from explicit segments, head first.
    pub fn from_points(segments: impl IntoIterator<Item = Point>) -> Snake {
        let points: VecDeque<Point> = segments.into_iter().collect();
        assert!(!points.is_empty(), "a snake has at least a head");
        Snake {
            points,
            moves_since_last_apple: 0,
        }
    }

    pub fn head(&self) -> Point {
        *self.points.front().expect("snake is never empty")
    }

    /// Where the head would land moving in direction `d`.
    pub fn peek(&self, d: Direction) -> Point {
        self.head().peek(d)
    }

    /// Slides one step in direction `d` and returns the vacated tail cell.
    pub fn advance(&mut self, d: Direction) -> Point {
        let vacated = *self.points.back().expect("snake is never empty");
        let next = self.peek(d);
        self.points.push_front(next);
        self.points.pop_back();
        self.moves_since_last_apple += 1;
        vacated
    }

    /// Extends the head in direction `d` without moving the tail.
    pub fn grow(&mut self, d: Direction) {
        let next = self.peek(d);
        self.points.push_front(next);
        self.moves_since_last_apple = 0;
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn moves_since_last_apple(&self) -> u32 {
        self.moves_since_last_apple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_extends_head() {
        let mut snake = Snake::new(Point::new(3, 4));
        snake.grow(Direction::Left);
        assert_eq!(snake.len(), 2);
        let points: Vec<Point> = snake.points().collect();
        assert_eq!(points, vec![Point::new(2, 4), Point::new(3, 4)]);
        assert_eq!(snake.head(), Point::new(2, 4));
    }

    #[test]
    fn test_advance_keeps_length_and_returns_tail() {
        let mut snake = Snake::from_points([
            Point::new(0, 3),
            Point::new(0, 2),
            Point::new(0, 1),
        ]);
        let vacated = snake.advance(Direction::Down);
        assert_eq!(vacated, Point::new(0, 1));
        assert_eq!(snake.len(), 3);
        assert_eq!(snake.head(), Point::new(0, 4));
        assert_eq!(snake.moves_since_last_apple(), 1);
    }

    #[test]
    fn test_grow_resets_starvation_counter() {
        let mut snake = Snake::new(Point::new(5, 5));
        snake.advance(Direction::Right);
        snake.advance(Direction::Right);
        assert_eq!(snake.moves_since_last_apple(), 2);
        snake.grow(Direction::Right);
        assert_eq!(snake.moves_since_last_apple(), 0);
    }
}
