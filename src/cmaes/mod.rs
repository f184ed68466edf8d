//! Covariance-matrix-adapting evolution strategy.
//!
//! [`CmaesStrategy`] maintains a multivariate normal search distribution
//! (mean, step size, covariance) over candidate capacity vectors, samples a
//! population per generation, and re-estimates the distribution from the
//! fitness-ranked population. A size-1 hall of fame tracks the best
//! candidate ever evaluated.

mod config;
mod strategy;

pub use config::CmaesConfig;
pub use strategy::CmaesStrategy;
