//! The top-level optimisation run.
//!
//! [`RunController`] drives generate → evaluate → update for a configured
//! generation budget, honours external interruption without discarding
//! progress, and finalises every run by replaying the best candidate and
//! persisting the results (and, with transmission tracking, exchanges)
//! artifacts.

mod config;
mod controller;
mod report;

pub use config::RunConfig;
pub use controller::{GenerationStats, RunController, RunSummary};
pub use report::{write_exchanges, write_results};
