use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::ai::{EpsilonGreedy, QAgent, QTable};
use crate::checkpoint::{CheckpointManager, ModelRecord, TrainingStats};
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::game::Player;
use crate::training::episode::play_episode;
use crate::training::metrics::{EpisodeResult, TrainingMetrics};

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Index of the last episode to run; a resumed run stops at the same one.
    pub num_episodes: usize,
    pub initial_epsilon: f64,
    pub epsilon_decay: f64,
    /// Episodes between model and stats saves.
    pub save_interval: usize,
    pub checkpoint_interval: usize,
    pub log_interval: usize,
    pub start_from_checkpoint: bool,
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 100_000,
            initial_epsilon: 0.3,
            epsilon_decay: 0.9999,
            save_interval: 100,
            checkpoint_interval: 100,
            log_interval: 100,
            start_from_checkpoint: true,
            seed: None,
        }
    }
}

/// What a call to [`Trainer::train`] got through.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub first_episode: usize,
    /// `None` when the checkpoint was already at or past `num_episodes`.
    pub last_episode: Option<usize>,
    pub epsilon: f64,
    pub interrupted: bool,
}

/// Self-play trainer for two independent tabular agents.
pub struct Trainer {
    config: AppConfig,
    agents: [QAgent; 2],
    policy: EpsilonGreedy,
    checkpoint_manager: CheckpointManager,
    stats: TrainingStats,
    metrics: TrainingMetrics,
    interrupt: Arc<AtomicBool>,
}

impl Trainer {
    /// Build a trainer, loading any existing model and stats. Unreadable or
    /// invalid files are logged and replaced by empty state; an invalid
    /// config is an error.
    pub fn new(config: AppConfig, interrupt: Arc<AtomicBool>) -> Result<Self, ConfigError> {
        config.validate()?;

        let checkpoint_manager = CheckpointManager::new(config.paths.clone());
        let mut agents = [
            QAgent::new(Player::Black.name(), config.agent),
            QAgent::new(Player::White.name(), config.agent),
        ];

        match checkpoint_manager.load_model() {
            Ok(Some(model)) => match restore_tables(&model) {
                Ok([black, white]) => {
                    info!(
                        black_states = black.state_count(),
                        white_states = white.state_count(),
                        "loaded existing model"
                    );
                    agents[0].replace_table(black);
                    agents[1].replace_table(white);
                }
                Err(e) => error!("invalid model file, starting fresh: {e}"),
            },
            Ok(None) => info!("no model file, starting fresh"),
            Err(e) => error!("failed to load model, starting fresh: {e}"),
        }

        let stats = match checkpoint_manager.load_stats() {
            Ok(Some(stats)) => {
                info!(samples = stats.len(), "loaded existing stats");
                stats
            }
            Ok(None) => TrainingStats::default(),
            Err(e) => {
                error!("failed to load stats, starting fresh: {e}");
                TrainingStats::default()
            }
        };

        let policy = EpsilonGreedy::new(config.training.initial_epsilon, config.training.seed);
        let metrics = TrainingMetrics::with_capacity(config.training.log_interval);

        Ok(Trainer {
            config,
            agents,
            policy,
            checkpoint_manager,
            stats,
            metrics,
            interrupt,
        })
    }

    pub fn agent(&self, player: Player) -> &QAgent {
        &self.agents[player.index()]
    }

    pub fn epsilon(&self) -> f64 {
        self.policy.epsilon()
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    /// Episode to start from. A checkpoint at episode `E` resumes at `E + 1`
    /// and restores its epsilon verbatim.
    pub fn resume_from_checkpoint(&mut self) -> usize {
        if !self.config.training.start_from_checkpoint {
            return 1;
        }
        match self.checkpoint_manager.load_checkpoint() {
            Ok(Some(checkpoint)) => {
                self.policy.set_epsilon(checkpoint.epsilon);
                let start = checkpoint.episode + 1;
                info!(
                    episode = start,
                    epsilon = checkpoint.epsilon,
                    saved_at = %checkpoint.timestamp,
                    "resuming from checkpoint"
                );
                start
            }
            Ok(None) => 1,
            Err(e) => {
                error!("failed to load checkpoint, starting at episode 1: {e}");
                1
            }
        }
    }

    /// Play one episode with the current policy and update both agents.
    pub fn run_episode(&mut self) -> EpisodeResult {
        let [black, white] = &mut self.agents;
        play_episode(black, white, &mut self.policy, self.config.game.max_turns)
    }

    /// Run the episode loop up to `num_episodes`. The interrupt flag is only
    /// checked between episodes.
    pub fn train(&mut self) -> TrainingSummary {
        let first_episode = self.resume_from_checkpoint();
        let end_episode = self.config.training.num_episodes;
        let training = self.config.training.clone();

        info!(
            first = first_episode,
            last = end_episode,
            epsilon = self.epsilon(),
            "starting training"
        );

        let mut last_episode = None;
        let mut interrupted = false;

        for episode in first_episode..=end_episode {
            let result = self.run_episode();
            debug!(
                episode,
                black = result.scores.black,
                white = result.scores.white,
                "episode complete"
            );
            self.metrics.record_episode(result);

            let epsilon = self.policy.decay(training.epsilon_decay);
            last_episode = Some(episode);

            if episode % training.log_interval == 0 {
                self.record_progress(episode, end_episode, epsilon);
            }

            if episode % training.save_interval == 0 {
                self.save_model();
                self.save_stats();
            }

            if episode % training.checkpoint_interval == 0 {
                self.save_checkpoint(episode);
            }

            if self.interrupt.load(Ordering::Relaxed) {
                warn!(episode, "interrupted, saving checkpoint and stopping");
                self.save_checkpoint(episode);
                interrupted = true;
                break;
            }
        }

        if !interrupted {
            info!(total = self.metrics.total_episodes(), "training complete");
        }

        TrainingSummary {
            first_episode,
            last_episode,
            epsilon: self.epsilon(),
            interrupted,
        }
    }

    fn record_progress(&mut self, episode: usize, end_episode: usize, epsilon: f64) {
        let window = self.config.training.log_interval;
        let scores = self.metrics.average_scores(window);
        let convergence = self.metrics.average_q_delta(window);
        self.stats.push(episode, convergence, scores);

        info!(
            "Episode {}/{} ({:.1}%) | eps: {:.4} | black win: {:.1}% | draw: {:.1}% | avg score {:.1}-{:.1} | avg len: {:.1} | dQ: {:.5}",
            episode,
            end_episode,
            episode as f64 / end_episode as f64 * 100.0,
            epsilon,
            self.metrics.black_win_rate(window) * 100.0,
            self.metrics.draw_rate(window) * 100.0,
            scores.black,
            scores.white,
            self.metrics.average_game_length(window),
            convergence,
        );
    }

    /// Persist both value tables. Failures are logged; returns whether the
    /// write landed.
    pub fn save_model(&self) -> bool {
        let model = ModelRecord::new(
            self.agents[0].table().to_record(),
            self.agents[1].table().to_record(),
        );
        match self.checkpoint_manager.save_model(&model) {
            Ok(path) => {
                info!(path = %path.display(), "model saved");
                true
            }
            Err(e) => {
                error!("failed to save model: {e}");
                false
            }
        }
    }

    pub fn save_stats(&self) -> bool {
        match self.checkpoint_manager.save_stats(&self.stats) {
            Ok(path) => {
                debug!(path = %path.display(), "stats saved");
                true
            }
            Err(e) => {
                error!("failed to save stats: {e}");
                false
            }
        }
    }

    pub fn save_checkpoint(&self, episode: usize) -> bool {
        match self
            .checkpoint_manager
            .save_checkpoint(episode, self.epsilon(), &self.config)
        {
            Ok(_) => {
                info!(episode, "checkpoint saved");
                true
            }
            Err(e) => {
                error!(episode, "failed to save checkpoint: {e}");
                false
            }
        }
    }
}

fn restore_tables(model: &ModelRecord) -> Result<[QTable; 2], crate::error::PersistenceError> {
    Ok([
        QTable::from_record(&model.player1)?,
        QTable::from_record(&model.player2)?,
    ])
}
