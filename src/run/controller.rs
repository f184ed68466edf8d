//! The generation loop and finalisation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::config::RunConfig;
use super::report;
use crate::cmaes::CmaesStrategy;
use crate::error::Result;
use crate::evaluate::{CandidateEvaluator, FitnessResult};
use crate::scenario::{DispatchModel, ScenarioContext};

/// Fitness statistics for one generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationStats {
    pub generation: usize,
    /// Minimum fitness within the generation's population.
    pub population_min: f64,
    /// Hall-of-fame fitness after this generation.
    pub best_ever: f64,
}

/// Outcome of a run, whether it exhausted its budget or was interrupted.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The best candidate found, unclamped (the results artifact holds the
    /// clamped version).
    pub best_candidate: Vec<f64>,
    /// Final cost/penalty/reasons from the verbose replay of the best
    /// candidate.
    pub result: FitnessResult,
    /// Labels of the configured constraints the best candidate violates.
    pub constraints_violated: Vec<&'static str>,
    pub generations_run: usize,
    pub interrupted: bool,
    pub history: Vec<GenerationStats>,
}

/// Drives the search: generate → evaluate → update per generation, then a
/// finalisation pass that always runs, interrupt or not.
pub struct RunController<'a> {
    config: &'a RunConfig,
    model: &'a dyn DispatchModel,
}

impl<'a> RunController<'a> {
    pub fn new(config: &'a RunConfig, model: &'a dyn DispatchModel) -> Self {
        Self { config, model }
    }

    /// Runs to the generation budget.
    pub fn run(&self, ctx: &mut ScenarioContext) -> Result<RunSummary> {
        self.run_with_interrupt(ctx, None)
    }

    /// Runs until the budget is exhausted or `interrupt` is set.
    ///
    /// An interrupt aborts further generations but never the finalisation:
    /// the best candidate found so far is replayed, reported, and
    /// persisted. Configuration errors abort before any generation;
    /// dispatch errors abort wherever they occur.
    pub fn run_with_interrupt(
        &self,
        ctx: &mut ScenarioContext,
        interrupt: Option<Arc<AtomicBool>>,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        ctx.validate()?;

        // Strategy construction performs the remaining setup checks;
        // only a run that passes them may touch the trace file.
        let mut strategy = CmaesStrategy::new(ctx.param_count(), &self.config.search)?;
        let evaluator = CandidateEvaluator::new(self.model, self.config, ctx)?;

        let mut history = Vec::with_capacity(self.config.generations.min(1024));
        let mut interrupted = false;
        let mut generations_run = 0;

        for generation in 0..self.config.generations {
            if let Some(flag) = &interrupt {
                if flag.load(Ordering::Relaxed) {
                    interrupted = true;
                    log::info!("interrupted after {generations_run} generations");
                    break;
                }
            }

            let population = strategy.sample();
            // Hard barrier: every candidate of this generation is scored
            // before the distribution update sees any of them.
            let results =
                evaluator.evaluate_population(ctx, &population, self.config.parallel)?;
            let fitnesses: Vec<f64> = results.iter().map(FitnessResult::fitness).collect();
            strategy.update(&population, &fitnesses);

            let population_min = fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
            let best_ever = strategy
                .best()
                .map(|(_, fitness)| fitness)
                .unwrap_or(f64::INFINITY);
            log::info!(
                "generation {}: population min {population_min:.4} $/MWh, best ever {best_ever:.4} $/MWh",
                generation + 1
            );
            history.push(GenerationStats {
                generation: generation + 1,
                population_min,
                best_ever,
            });
            generations_run = generation + 1;
        }

        // Finalisation: replay the best candidate verbosely on the live
        // context so the persisted outputs match the reported score. With
        // no completed generation the zero centroid stands in.
        let best_candidate = match strategy.best() {
            Some((candidate, _)) => candidate.to_vec(),
            None => vec![0.0; ctx.param_count()],
        };
        let result = evaluator.replay(ctx, &best_candidate)?;
        let constraints_violated = evaluator.constraints().violated_labels(result.reasons);

        log::info!(
            "final score {:.4} $/MWh (cost {:.4}, penalty {:.4})",
            result.fitness(),
            result.cost,
            result.penalty
        );
        for label in &constraints_violated {
            log::info!("constraint violated: {label}");
        }

        report::write_results(
            &self.config.results_path,
            self.config,
            &best_candidate,
            &result,
            constraints_violated.clone(),
        )?;
        if self.config.transmission {
            report::write_exchanges(&self.config.exchanges_path, ctx)?;
        }

        Ok(RunSummary {
            best_candidate,
            result,
            constraints_violated,
            generations_run,
            interrupted,
            history,
        })
    }
}
