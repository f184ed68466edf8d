//! Cost scoring and fitness assembly.

use serde::{Deserialize, Serialize};

use super::constraints::{ConstraintSet, ReasonMask};
use super::penalties;
use crate::run::RunConfig;
use crate::scenario::{annuity_factor, ScenarioContext};

/// The additive components of a candidate's scalar fitness.
///
/// Cost and penalty are both expressed in $/MWh: aggregate dollars over the
/// simulated horizon divided by total demand energy. The optimiser
/// minimises their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessResult {
    /// Annualised capital + operating + transmission cost, $/MWh.
    pub cost: f64,
    /// Aggregate cubic penalty, $/MWh.
    pub penalty: f64,
    /// Constraints violated by this candidate.
    pub reasons: ReasonMask,
}

impl FitnessResult {
    /// The scalar the optimiser sees.
    pub fn fitness(&self) -> f64 {
        self.cost + self.penalty
    }
}

/// Folds each ordered region pair into an undirected capacity: the larger
/// of the forward and reverse maximum flows lands in the lower-triangular
/// cell, the upper-triangular cell is zeroed. Idempotent.
pub fn symmetrise_exchanges(exchanges: &mut [Vec<f64>]) {
    let n = exchanges.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let forward = exchanges[i][j];
            let reverse = exchanges[j][i];
            exchanges[j][i] = forward.max(reverse);
            exchanges[i][j] = 0.0;
        }
    }
}

/// Computes annualised system cost and aggregates penalties into a
/// [`FitnessResult`].
#[derive(Debug, Clone, Copy)]
pub struct CostEvaluator {
    /// When set, the symmetrised exchange matrix is costed as net-new
    /// transmission capacity.
    pub transmission: bool,
}

impl CostEvaluator {
    pub fn new(transmission: bool) -> Self {
        Self { transmission }
    }

    /// Scores the context after a dispatch run.
    ///
    /// Symmetrises the exchange matrix in place when transmission tracking
    /// is enabled, so the finalisation step can serialize the same matrix
    /// it was costed from.
    pub fn score(
        &self,
        ctx: &mut ScenarioContext,
        config: &RunConfig,
        constraints: &ConstraintSet,
    ) -> FitnessResult {
        let years = ctx.years();
        let dt = ctx.dt_hours;

        let mut cost: f64 = {
            let costs = &ctx.costs;
            ctx.generators
                .iter()
                .map(|g| g.annual_capital_cost(costs) * years + g.operating_cost(costs, dt, years))
                .sum()
        };

        if self.transmission {
            symmetrise_exchanges(&mut ctx.exchanges_mw);
            cost += transmission_cost(ctx, years);
        }

        let report = penalties::assess(ctx, config, constraints);
        let energy = ctx.total_demand_energy_mwh();
        FitnessResult {
            cost: cost / energy,
            penalty: report.value / energy,
            reasons: report.reasons,
        }
    }
}

/// Prices net-new undirected link capacity from the symmetrised exchange
/// matrix: existing capacity is subtracted (floored at zero), the remainder
/// priced per MW·km and annualised over the transmission lifetime.
fn transmission_cost(ctx: &ScenarioContext, years: f64) -> f64 {
    let n = ctx.regions.len();
    let af = annuity_factor(ctx.costs.discount_rate, ctx.costs.tx_lifetime_years);
    let mut cost = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let required = ctx.exchanges_mw[j][i];
            let existing = ctx.link_capacity_mw[i][j].max(ctx.link_capacity_mw[j][i]);
            let net_new = (required - existing).max(0.0);
            let distance = ctx.link_distance_km[i][j].max(ctx.link_distance_km[j][i]);
            cost += net_new * distance * ctx.costs.tx_cost_per_mw_km / af * years;
        }
    }
    cost
}
