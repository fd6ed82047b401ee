use crate::errors::{SearchError, SearchResult};
use crate::game::{ActionSet, Direction, SnakeBoard};

/// Wraps the simultaneous-move game into a sequential decision interface.
///
/// A game round becomes two plies: player 1's choice is latched without
/// touching the board; player 2's choice commits both moves at once. Vanilla
/// MCTS then applies unchanged — this is an information-set search where the
/// second player does not see the first player's latched move.
///
/// Adapters are frozen once inserted into the search tree; new positions are
/// produced by cloning and executing.
#[derive(Clone, Debug)]
pub struct GameAdapter {
    board: SnakeBoard,
    queued: Option<Direction>,
}

impl GameAdapter {
    pub fn new(board: SnakeBoard) -> GameAdapter {
        GameAdapter {
            board,
            queued: None,
        }
    }

    pub fn board(&self) -> &SnakeBoard {
        &self.board
    }

    /// Player 1's latched half of the current round, if any.
    pub fn queued_move(&self) -> Option<Direction> {
        self.queued
    }

    /// Whose ply the next decision is: `-1` for player 1 (nothing latched),
    /// `+1` for player 2. This is the sign that lets UCB alternate per ply.
    pub fn player(&self) -> i8 {
        if self.queued.is_some() {
            1
        } else {
            -1
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.board.is_terminal()
    }

    /// Raw rule check for a single move of the ply owner. Unlike
    /// [`valid_actions`](Self::valid_actions) this carries no boxed-in
    /// fallback, so it can be false for every direction.
    pub fn valid_action(&self, d: Direction) -> bool {
        match self.queued {
            Some(_) => self.board.p2_view().valid_move(d),
            None => self.board.p1_view().valid_move(d),
        }
    }

    /// The ply owner's move set. Non-empty unless the position is terminal.
    pub fn valid_actions(&self) -> ActionSet {
        match self.queued {
            Some(_) => self.board.p2_view().valid_moves(),
            None => self.board.p1_view().valid_moves(),
        }
    }

    /// Latches player 1's move, or commits the full round with player 2's.
    pub fn execute(&mut self, d: Direction) -> SearchResult<()> {
        if self.is_terminal() || !self.valid_actions().contains(d) {
            return Err(SearchError::illegal_move(d, self.player()));
        }
        match self.queued.take() {
            Some(p1_dir) => {
                self.board.step(p1_dir, d);
            }
            None => self.queued = Some(d),
        }
        Ok(())
    }

    /// Terminal value in `{-1, 0, +1}` from player 1's perspective.
    pub fn value(&self) -> SearchResult<f64> {
        self.board
            .status()
            .value()
            .map(f64::from)
            .ok_or(SearchError::NotTerminal)
    }
}
