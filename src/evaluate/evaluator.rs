//! The optimiser's objective function.

use rayon::prelude::*;
use std::sync::Mutex;

use super::constraints::ConstraintSet;
use super::cost::{CostEvaluator, FitnessResult};
use super::trace::TraceWriter;
use crate::error::Result;
use crate::run::RunConfig;
use crate::scenario::{DispatchModel, ScenarioContext};

/// Scores one candidate: apply capacities, dispatch, cost, trace.
///
/// Evaluations are independent per candidate. The parallel path clones the
/// base context per candidate so no two evaluations ever share a live
/// context; the sequential path reuses the single context in place. Trace
/// appends are serialized behind a mutex whichever path runs.
pub struct CandidateEvaluator<'a> {
    model: &'a dyn DispatchModel,
    config: &'a RunConfig,
    constraints: ConstraintSet,
    cost: CostEvaluator,
    trace: Option<Mutex<TraceWriter>>,
}

impl<'a> CandidateEvaluator<'a> {
    /// Builds the evaluator, deriving the active constraint set and
    /// creating the trace file when one is configured.
    pub fn new(
        model: &'a dyn DispatchModel,
        config: &'a RunConfig,
        ctx: &ScenarioContext,
    ) -> Result<Self> {
        let trace = match &config.trace_path {
            Some(path) => Some(Mutex::new(TraceWriter::create(path)?)),
            None => None,
        };
        Ok(Self {
            model,
            config,
            constraints: ConstraintSet::from_config(config, ctx),
            cost: CostEvaluator::new(config.transmission),
            trace,
        })
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Evaluates one candidate against the given context.
    ///
    /// Writes the candidate into the roster in the fixed parameter order,
    /// runs the dispatch model (errors propagate, never masked), scores
    /// cost and penalty, and appends a trace row when tracing is on.
    pub fn evaluate(
        &self,
        ctx: &mut ScenarioContext,
        candidate: &[f64],
    ) -> Result<FitnessResult> {
        self.evaluate_inner(ctx, candidate, true)
    }

    /// Re-evaluates a candidate for final reporting without appending a
    /// trace row, keeping the trace at exactly one row per search
    /// evaluation.
    pub fn replay(&self, ctx: &mut ScenarioContext, candidate: &[f64]) -> Result<FitnessResult> {
        self.evaluate_inner(ctx, candidate, false)
    }

    fn evaluate_inner(
        &self,
        ctx: &mut ScenarioContext,
        candidate: &[f64],
        traced: bool,
    ) -> Result<FitnessResult> {
        ctx.apply_candidate(candidate)?;
        self.model.dispatch(ctx)?;
        let result = self.cost.score(ctx, self.config, &self.constraints);
        if traced {
            if let Some(trace) = &self.trace {
                // Appends open, write, and close in one call, so a writer
                // behind a poisoned lock holds no partial state.
                let writer = trace.lock().unwrap_or_else(|e| e.into_inner());
                writer.append(&result, candidate)?;
            }
        }
        Ok(result)
    }

    /// Evaluates one candidate on a private clone of `base`.
    pub fn evaluate_isolated(
        &self,
        base: &ScenarioContext,
        candidate: &[f64],
    ) -> Result<FitnessResult> {
        let mut ctx = base.clone();
        self.evaluate(&mut ctx, candidate)
    }

    /// Scores a whole population, preserving candidate order.
    ///
    /// Parallel evaluation clones the context per candidate; sequential
    /// evaluation reuses the live context. Either way the call returns only
    /// after every candidate is scored, giving the caller the hard barrier
    /// the distribution update requires.
    pub fn evaluate_population(
        &self,
        ctx: &mut ScenarioContext,
        candidates: &[Vec<f64>],
        parallel: bool,
    ) -> Result<Vec<FitnessResult>> {
        if parallel {
            let base: &ScenarioContext = ctx;
            candidates
                .par_iter()
                .map(|candidate| self.evaluate_isolated(base, candidate))
                .collect()
        } else {
            candidates
                .iter()
                .map(|candidate| self.evaluate(ctx, candidate))
                .collect()
        }
    }
}
