use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::ai::{EpsilonGreedy, QAgent};
use crate::game::{Game, Player};
use crate::training::metrics::EpisodeResult;

/// +1 for the strictly higher score, -1 for the strictly lower, 0 on a tie.
pub fn terminal_reward(own: u32, opponent: u32) -> f64 {
    match own.cmp(&opponent) {
        Ordering::Greater => 1.0,
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
    }
}

/// Play one self-play game between `black` and `white`, then apply each
/// agent's terminal update from its own perspective. Stops early once the
/// turn cap is hit; the reward still comes from the score at that point.
pub fn play_episode(
    black: &mut QAgent,
    white: &mut QAgent,
    policy: &mut EpsilonGreedy,
    max_turns: usize,
) -> EpisodeResult {
    // An agent that never moves this episode must not be updated from an
    // earlier episode's trace.
    black.clear_trace();
    white.clear_trace();

    let mut game = Game::new(black, white, max_turns);

    while !game.is_game_over() && !game.has_reached_turn_limit() {
        let player = game.current_player();
        let state = game.board().state_key();

        match policy.select(game.board(), game.agent(player)) {
            Some(selection) => {
                let mv = selection.mv();
                game.agent_mut(player).record_action(state, mv);
                if let Err(err) = game.play_move(Some(mv)) {
                    warn!(%mv, %err, player = player.name(), "policy chose an illegal move");
                }
                let next = game.board().state_key();
                game.agent_mut(player).record_result(next);
            }
            None => {
                warn!(player = player.name(), "no legal move, skipping turn");
                if let Err(err) = game.play_move(None) {
                    warn!(%err, player = player.name(), "pass rejected");
                }
            }
        }

        if game.has_reached_turn_limit() {
            debug!(turns = game.move_count(), "turn limit reached");
            break;
        }
    }

    let game_length = game.move_count();
    let (board, [black, white]) = game.into_parts();
    let scores = board.scores();

    let black_reward = terminal_reward(scores.black, scores.white);
    let white_reward = terminal_reward(scores.white, scores.black);
    let q_delta = black
        .apply_terminal_reward(black_reward, &board)
        .unwrap_or(0.0)
        + white
            .apply_terminal_reward(white_reward, &board)
            .unwrap_or(0.0);

    let winner = match scores.black.cmp(&scores.white) {
        Ordering::Greater => Some(Player::Black),
        Ordering::Less => Some(Player::White),
        Ordering::Equal => None,
    };

    debug!(
        black = scores.black,
        white = scores.white,
        turns = game_length,
        "episode finished"
    );

    EpisodeResult {
        winner,
        game_length,
        scores,
        q_delta,
    }
}
