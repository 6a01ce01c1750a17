use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Dispatch};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use othello_qlearn::config::AppConfig;
use othello_qlearn::training::trainer::Trainer;

/// Train two Othello agents against each other with tabular Q-learning.
#[derive(Parser)]
#[command(name = "train", about = "Train Othello Q-learning agents via self-play")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the index of the last episode
    #[arg(long)]
    episodes: Option<usize>,

    /// Ignore any saved checkpoint and start at episode 1
    #[arg(long)]
    fresh: bool,

    /// Seed the exploration RNG for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_default_config {
        return match AppConfig::default_toml() {
            Ok(toml) => {
                print!("{toml}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to render default config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()));

    // A broken config still gets a logger, built from the default settings.
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    let (dispatch, file_error) = init_logging(&level, logging.file.as_ref());

    tracing::dispatcher::with_default(&dispatch, || {
        if let Some(e) = file_error {
            warn!("log file unavailable, logging to console only: {e:#}");
        }
        install_panic_hook();

        let result = config.and_then(|config| run(cli, config, dispatch.clone()));
        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("fatal: {e:#}");
                ExitCode::FAILURE
            }
        }
    })
}

fn run(cli: Cli, mut config: AppConfig, dispatch: Dispatch) -> Result<()> {
    if let Some(episodes) = cli.episodes {
        config.training.num_episodes = episodes;
    }
    if cli.fresh {
        config.training.start_from_checkpoint = false;
    }
    if let Some(seed) = cli.seed {
        config.training.seed = Some(seed);
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    let mut trainer = Trainer::new(config, interrupt.clone()).context("invalid configuration")?;
    spawn_interrupt_listener(interrupt, dispatch)?;

    let summary = trainer.train();

    match summary.last_episode {
        Some(last) if summary.interrupted => {
            info!(episode = last, "training interrupted, resume to continue")
        }
        Some(last) => info!(
            first = summary.first_episode,
            last,
            epsilon = summary.epsilon,
            "training finished"
        ),
        None => info!(
            next = summary.first_episode,
            "checkpoint already at the final episode, nothing to do"
        ),
    }
    Ok(())
}

/// Console output plus an optional truncated log file. RUST_LOG wins over
/// `level`.
fn init_logging(level: &str, file: Option<&PathBuf>) -> (Dispatch, Option<anyhow::Error>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file, file_error) = match file.map(|path| {
        File::create(path).with_context(|| format!("creating {}", path.display()))
    }) {
        Some(Ok(f)) => (Some(f), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let file_layer = file.map(|f| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(f))
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(file_layer);

    (Dispatch::new(subscriber), file_error)
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        error!("fatal: {info}");
    }));
}

/// First Ctrl-C asks the trainer to stop after the current episode; a second
/// one exits immediately.
fn spawn_interrupt_listener(interrupt: Arc<AtomicBool>, dispatch: Dispatch) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    std::thread::spawn(move || {
        tracing::dispatcher::with_default(&dispatch, || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("interrupt received, stopping after the current episode");
                interrupt.store(true, Ordering::Relaxed);

                if tokio::signal::ctrl_c().await.is_ok() {
                    error!("second interrupt, exiting without saving");
                    std::process::exit(130);
                }
            })
        })
    });
    Ok(())
}
