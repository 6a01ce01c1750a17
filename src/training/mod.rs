//! Self-play training: episode driver, rolling metrics and the resumable
//! training loop.

pub mod episode;
pub mod metrics;
pub mod trainer;
