//! Least-cost electricity generation capacity-mix search.
//!
//! Searches for the cheapest mix of generating capacity that satisfies a
//! time-series demand profile under engineering and policy constraints
//! (reliability, emissions, fuel-share limits, reserves, regional
//! generation shares).
//!
//! The crate couples three pieces:
//!
//! - **CMA-ES search** ([`cmaes`]): a covariance-matrix-adapting evolution
//!   strategy proposes candidate capacity vectors and re-estimates its
//!   search distribution from ranked fitness each generation.
//! - **Penalty/cost evaluation** ([`evaluate`]): each candidate is applied
//!   to the scenario, dispatched by an external simulator, and scored as
//!   annualised cost plus cubic constraint penalties, with violated
//!   constraints reported as a bitmask of reasons.
//! - **Run control and persistence** ([`run`]): a controller drives the
//!   generation loop, survives interruption without discarding progress,
//!   and persists a per-evaluation trace plus results/exchanges artifacts.
//!
//! The time-stepped merit-order dispatch simulation is deliberately
//! external: it is consumed through the
//! [`DispatchModel`](scenario::DispatchModel) trait and must populate the
//! scenario's power, spill, unserved, and exchange outputs in place.
//!
//! # Example
//!
//! ```no_run
//! use capmix::run::{RunConfig, RunController};
//! use capmix::scenario::{DispatchModel, Generator, ScenarioContext, Technology};
//!
//! # struct MyDispatch;
//! # impl DispatchModel for MyDispatch {
//! #     fn dispatch(&self, _ctx: &mut ScenarioContext) -> capmix::error::Result<()> { Ok(()) }
//! # }
//! let mut ctx = ScenarioContext::single_region(vec![950.0; 8760], 1.0);
//! ctx.generators.push(Generator::new("ccgt-1", 0, Technology::Ccgt));
//!
//! let config = RunConfig::default()
//!     .with_generations(100)
//!     .with_seed(42)
//!     .with_trace_path("trace.csv");
//!
//! let summary = RunController::new(&config, &MyDispatch)
//!     .run(&mut ctx)
//!     .expect("run failed");
//! println!("best score: {:.2} $/MWh", summary.result.fitness());
//! ```

pub mod cmaes;
pub mod error;
pub mod evaluate;
pub mod run;
pub mod scenario;
