use tracing::{debug, warn};

use super::{Board, Move, MoveError, Player};
use crate::ai::QAgent;

pub const DEFAULT_MAX_TURNS: usize = 100;

/// Turn orchestration for one episode: a fresh board, the two agents (black
/// first), pass handling and the turn cap. Once ended it stays ended.
pub struct Game<'a> {
    board: Board,
    agents: [&'a mut QAgent; 2],
    current_player: Player,
    move_count: usize,
    max_turns: usize,
    game_ended: bool,
}

impl<'a> Game<'a> {
    pub fn new(black: &'a mut QAgent, white: &'a mut QAgent, max_turns: usize) -> Self {
        debug!(black = black.name(), white = white.name(), "starting new game");
        Game {
            board: Board::new(),
            agents: [black, white],
            current_player: Player::Black,
            move_count: 0,
            max_turns,
            game_ended: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn agent(&self, player: Player) -> &QAgent {
        &*self.agents[player.index()]
    }

    pub fn agent_mut(&mut self, player: Player) -> &mut QAgent {
        &mut *self.agents[player.index()]
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    pub fn is_ended(&self) -> bool {
        self.game_ended
    }

    /// Hand the turn to the opponent, skipping anyone with no legal move.
    /// Two passes in a row end the game.
    pub fn switch_player(&mut self) {
        self.set_turn(self.current_player.other());
        debug!(player = self.current_player.name(), "switched player");

        let mut passes = 0;
        while !self.game_ended && self.board.available_moves().is_empty() {
            warn!(player = self.current_player.name(), "no legal move, passing");
            self.set_turn(self.current_player.other());
            passes += 1;

            if passes >= 2 {
                debug!("both players passed, game over");
                self.game_ended = true;
            }
        }
    }

    fn set_turn(&mut self, player: Player) {
        self.current_player = player;
        self.board.set_current_player(player);
    }

    /// Play one ply for the current player. `None`, or a position with no
    /// legal move, is a pass. An illegal move leaves everything but the move
    /// counter untouched.
    pub fn play_move(&mut self, mv: Option<Move>) -> Result<Vec<Move>, MoveError> {
        self.move_count += 1;
        debug!(
            turn = self.move_count,
            player = self.current_player.name(),
            "playing turn"
        );

        let mv = match mv {
            Some(mv) if !self.board.available_moves().is_empty() => mv,
            _ => {
                warn!(player = self.current_player.name(), "cannot move");
                if !self.is_game_over() {
                    self.switch_player();
                }
                return Ok(Vec::new());
            }
        };

        match self.board.make_move(mv) {
            Ok(flipped) => {
                debug!("\n{}", self.board);
                self.switch_player();
                Ok(flipped)
            }
            Err(err) => {
                warn!(%mv, %err, "illegal move selected");
                Err(err)
            }
        }
    }

    /// True iff neither color has a legal move on the current grid,
    /// regardless of whose turn it is.
    pub fn is_game_over(&mut self) -> bool {
        let original = self.board.current_player();

        self.board.set_current_player(Player::Black);
        let black_moves = self.board.available_moves();
        self.board.set_current_player(Player::White);
        let white_moves = self.board.available_moves();

        self.board.set_current_player(original);

        let over = black_moves.is_empty() && white_moves.is_empty();
        if over && !self.game_ended {
            self.game_ended = true;
            let scores = self.board.scores();
            debug!(black = scores.black, white = scores.white, "game over");
        }
        over
    }

    pub fn has_reached_turn_limit(&self) -> bool {
        self.move_count >= self.max_turns
    }

    /// Release the agents along with the final board.
    pub fn into_parts(self) -> (Board, [&'a mut QAgent; 2]) {
        (self.board, self.agents)
    }
}
