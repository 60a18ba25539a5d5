use std::fmt;

use bevy_math::USizeVec2;
use serde::{Deserialize, Serialize};

/// Side length of the grid.
pub const SIZE: usize = 3;

/// Every line that wins the game, in the order they are checked.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub type Cell = Option<Mark>;

/// Row-major 3x3 grid. Serializes as a flat array of nine `null | "X" | "O"` entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    pub cell: [Cell; SIZE * SIZE],
}

impl Board {
    pub fn winner(&self) -> Option<Mark> {
        check_winner(self)
    }

    pub fn is_full(&self) -> bool {
        is_board_full(self)
    }

    pub fn is_tie(&self) -> bool {
        is_end_game(self)
    }

    /// Index of the cell at column `pos.x`, row `pos.y`, or `None` if off the grid.
    pub fn index_of(pos: USizeVec2) -> Option<usize> {
        (pos.x < SIZE && pos.y < SIZE).then(|| pos.y * SIZE + pos.x)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cell.chunks(SIZE)
    }
}

/// First line (in [`LINES`] order) holding three equal marks.
pub fn check_winner(board: &Board) -> Option<Mark> {
    LINES.iter().find_map(|&[a, b, c]| match board.cell[a] {
        Some(mark) if board.cell[b] == Some(mark) && board.cell[c] == Some(mark) => Some(mark),
        _ => None,
    })
}

pub fn is_board_full(board: &Board) -> bool {
    board.cell.iter().all(Option::is_some)
}

/// A full board with nobody holding a line.
pub fn is_end_game(board: &Board) -> bool {
    is_board_full(board) && check_winner(board).is_none()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(&self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Where a board stands. Derived from the cells, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    InProgress,
    Won(Mark),
    Tie,
}

impl Outcome {
    pub fn of(board: &Board) -> Self {
        // A full board with a line is a win, so the line check goes first.
        match check_winner(board) {
            Some(mark) => Outcome::Won(mark),
            None if is_board_full(board) => Outcome::Tie,
            None => Outcome::InProgress,
        }
    }

    pub fn is_over(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// The unit of persistence: a board plus whose move is next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub turn: Mark,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            board: Board::default(),
            turn: Mark::X,
        }
    }
}

impl GameState {
    pub fn reset() -> Self {
        Self::default()
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::of(&self.board)
    }

    /// Returns the state after the current player marks `index`. `self` is consumed, so a
    /// rejected move leaves the caller's copy exactly as it was.
    pub fn try_apply(mut self, index: usize) -> Result<Self, InvalidMove> {
        if self.outcome().is_over() {
            return Err(InvalidMove::GameOver);
        }
        let cell = self.board.cell.get_mut(index).ok_or(InvalidMove::OutOfBounds)?;
        if cell.is_some() {
            return Err(InvalidMove::CellOccupied);
        }
        *cell = Some(self.turn);
        self.turn = self.turn.opponent();
        Ok(self)
    }

    pub fn apply_move(&mut self, index: usize) -> Result<(), InvalidMove> {
        *self = self.try_apply(index)?;
        Ok(())
    }

    /// Like [`GameState::apply_move`], but also requires `mark` to be the player on turn.
    pub fn play_as(&mut self, mark: Mark, index: usize) -> Result<(), InvalidMove> {
        if mark != self.turn {
            return Err(InvalidMove::NotYourTurn);
        }
        self.apply_move(index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidMove {
    OutOfBounds,
    CellOccupied,
    GameOver,
    NotYourTurn,
}

impl fmt::Display for InvalidMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidMove::OutOfBounds => write!(f, "Cell index must be between 0 and 8"),
            InvalidMove::CellOccupied => write!(f, "The cell is already occupied"),
            InvalidMove::GameOver => write!(f, "The game is already over"),
            InvalidMove::NotYourTurn => write!(f, "It is not your turn"),
        }
    }
}

impl std::error::Error for InvalidMove {}
