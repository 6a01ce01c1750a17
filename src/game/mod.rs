//! Othello rules: the 8x8 board with capture and flip logic, player colors,
//! and the turn orchestrator that handles passes and the turn cap.

mod board;
mod player;
mod state;

pub use board::{Board, Cell, Move, MoveError, ParseMoveError, Scores, SIZE};
pub use player::Player;
pub use state::{Game, DEFAULT_MAX_TURNS};
