//! Tabular Q-learning agents and the epsilon-greedy move policy that drives
//! them during self-play.

mod agent;
mod policy;

pub use agent::{AgentConfig, AgentTrace, QAgent, QTable};
pub use policy::{EpsilonGreedy, Selection};
