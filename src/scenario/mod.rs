//! Scenario data model: generators, regions, costs, and the dispatch seam.
//!
//! A [`ScenarioContext`] bundles everything the evaluator needs — the demand
//! time series, the generator roster, inter-region link topology, and the
//! cost model — together with the per-generator outputs the external
//! dispatch simulation writes back. The simulator itself is consumed only
//! through the [`DispatchModel`] trait.

mod context;
mod generator;

pub use context::{DispatchModel, Region, ScenarioContext};
pub use generator::{annuity_factor, CostModel, Generator, Technology};

/// Hours in a year, used to convert simulated horizons into years.
pub const HOURS_PER_YEAR: f64 = 8760.0;
