use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::game::{Board, Move};

use super::agent::QAgent;

/// How a move was chosen, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    Explore(Move),
    Exploit { mv: Move, value: f64 },
    Fallback(Move),
}

impl Selection {
    pub fn mv(self) -> Move {
        match self {
            Selection::Explore(mv) | Selection::Fallback(mv) => mv,
            Selection::Exploit { mv, .. } => mv,
        }
    }
}

/// Epsilon-greedy selection over an agent's Q-values.
pub struct EpsilonGreedy {
    epsilon: f64,
    rng: StdRng,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        EpsilonGreedy { epsilon, rng }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Multiply epsilon by `factor`; never resets upward on its own.
    pub fn decay(&mut self, factor: f64) -> f64 {
        self.epsilon *= factor;
        self.epsilon
    }

    /// Pick a move for the board's current player. `None` when there is no
    /// legal move.
    pub fn select(&mut self, board: &Board, agent: &QAgent) -> Option<Selection> {
        let moves = board.available_moves();
        if moves.is_empty() {
            return None;
        }

        if self.rng.random::<f64>() < self.epsilon {
            let mv = self.random_move(&moves);
            debug!(%mv, "exploring");
            return Some(Selection::Explore(mv));
        }

        let state = board.state_key();
        let mut best: Option<(Move, f64)> = None;
        for &mv in &moves {
            let value = agent.q_value(&state, mv);
            // Strict comparison keeps the first maximum in scan order.
            if value.is_finite() && best.is_none_or(|(_, b)| value > b) {
                best = Some((mv, value));
            }
        }

        match best {
            Some((mv, value)) => {
                debug!(%mv, value, "exploiting");
                Some(Selection::Exploit { mv, value })
            }
            None => {
                let mv = self.random_move(&moves);
                debug!(%mv, "no finite value, picking at random");
                Some(Selection::Fallback(mv))
            }
        }
    }

    fn random_move(&mut self, moves: &[Move]) -> Move {
        moves[self.rng.random_range(0..moves.len())]
    }
}
