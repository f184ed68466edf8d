//! Candidate scoring: penalties, costs, and the objective function.
//!
//! [`CandidateEvaluator`] is the optimiser's objective: it applies a
//! candidate vector to a scenario, runs the dispatch model, combines
//! annualised costs with cubic constraint penalties, and optionally appends
//! a trace row per evaluation.

mod constraints;
mod cost;
mod evaluator;
mod penalties;
mod trace;

pub use constraints::{ConstraintSet, PenaltyReport, Reason, ReasonMask};
pub use cost::{symmetrise_exchanges, CostEvaluator, FitnessResult};
pub use evaluator::CandidateEvaluator;
pub use trace::TraceWriter;
