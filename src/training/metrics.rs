use std::collections::VecDeque;

use crate::checkpoint::AverageScores;
use crate::game::{Player, Scores};

/// Result of a single episode.
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    pub winner: Option<Player>,
    pub game_length: usize,
    pub scores: Scores,
    /// Sum of the absolute Q-value changes made by the terminal updates.
    pub q_delta: f64,
}

/// Rolling window over recent episodes, used for progress logs and stats.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    fn recent(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> + '_ {
        self.episode_results.iter().rev().take(last_n)
    }

    fn window(&self, last_n: usize) -> usize {
        self.episode_results.len().min(last_n)
    }

    /// Win rate for Black in the last N episodes.
    pub fn black_win_rate(&self, last_n: usize) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let wins = self
            .recent(n)
            .filter(|r| r.winner == Some(Player::Black))
            .count();
        wins as f64 / n as f64
    }

    /// Draw rate in the last N episodes.
    pub fn draw_rate(&self, last_n: usize) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let draws = self.recent(n).filter(|r| r.winner.is_none()).count();
        draws as f64 / n as f64
    }

    /// Average game length over the last N episodes.
    pub fn average_game_length(&self, last_n: usize) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self.recent(n).map(|r| r.game_length).sum();
        total as f64 / n as f64
    }

    /// Mean final disk counts over the last N episodes.
    pub fn average_scores(&self, last_n: usize) -> AverageScores {
        let n = self.window(last_n);
        if n == 0 {
            return AverageScores::default();
        }
        let (black, white) = self
            .recent(n)
            .fold((0u64, 0u64), |(b, w), r| {
                (b + r.scores.black as u64, w + r.scores.white as u64)
            });
        AverageScores {
            black: black as f64 / n as f64,
            white: white as f64 / n as f64,
        }
    }

    /// Mean absolute Q-value change per episode; trends to zero as the
    /// tables settle.
    pub fn average_q_delta(&self, last_n: usize) -> f64 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: f64 = self.recent(n).map(|r| r.q_delta).sum();
        total / n as f64
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(winner: Option<Player>, black: u32, white: u32) -> EpisodeResult {
        EpisodeResult {
            winner,
            game_length: 60,
            scores: Scores { black, white },
            q_delta: 0.0,
        }
    }

    #[test]
    fn test_black_win_rate() {
        let mut m = TrainingMetrics::new();
        for _ in 0..7 {
            m.record_episode(result(Some(Player::Black), 40, 24));
        }
        for _ in 0..3 {
            m.record_episode(result(Some(Player::White), 24, 40));
        }
        assert!((m.black_win_rate(10) - 0.7).abs() < 1e-9);
        // Only the last 3 (all white wins)
        assert_eq!(m.black_win_rate(3), 0.0);
    }

    #[test]
    fn test_draw_rate() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(None, 32, 32));
        m.record_episode(result(Some(Player::Black), 40, 24));
        assert!((m.draw_rate(10) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_average_game_length() {
        let mut m = TrainingMetrics::new();
        let mut short = result(None, 32, 32);
        short.game_length = 20;
        let mut long = result(None, 32, 32);
        long.game_length = 30;
        m.record_episode(short);
        m.record_episode(long);
        assert!((m.average_game_length(10) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_scores_and_delta() {
        let mut m = TrainingMetrics::new();
        let mut a = result(Some(Player::Black), 40, 24);
        a.q_delta = 0.2;
        let mut b = result(Some(Player::White), 20, 44);
        b.q_delta = 0.4;
        m.record_episode(a);
        m.record_episode(b);

        let avg = m.average_scores(10);
        assert_eq!(avg, AverageScores { black: 30.0, white: 34.0 });
        assert!((m.average_q_delta(10) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_caps_window_not_total() {
        let mut m = TrainingMetrics::with_capacity(2);
        for _ in 0..5 {
            m.record_episode(result(None, 32, 32));
        }
        assert_eq!(m.total_episodes(), 5);
        assert_eq!(m.average_scores(100), AverageScores { black: 32.0, white: 32.0 });
    }

    #[test]
    fn test_empty_metrics() {
        let m = TrainingMetrics::default();
        assert_eq!(m.black_win_rate(10), 0.0);
        assert_eq!(m.average_q_delta(10), 0.0);
        assert_eq!(m.average_scores(10), AverageScores::default());
    }
}
