//! # Othello Q-learning
//!
//! An 8x8 Othello engine and a tabular Q-learning trainer in which two
//! independent agents learn by playing each other.
//!
//! ## Modules
//!
//! - [`game`]: Board rules, move notation, turn and pass handling
//! - [`ai`]: Q-tables, per-agent decision traces, epsilon-greedy policy
//! - [`training`]: Episode driver, rolling metrics, resumable training loop
//! - [`checkpoint`]: JSON persistence for the model, stats and checkpoints
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
