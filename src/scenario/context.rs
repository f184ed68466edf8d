//! The mutable scenario context and the dispatch simulator seam.

use serde::{Deserialize, Serialize};

use super::generator::{CostModel, Generator};
use super::HOURS_PER_YEAR;
use crate::error::{CapmixError, Result};

/// A demand region (market node) in the scenario topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The external merit-order dispatch simulation.
///
/// Implementations must mutate the context in place, overwriting each
/// generator's power and spill series, the unserved series, and the
/// exchanges matrix. Dispatch must be deterministic for fixed inputs and
/// repeatable on the same context (outputs are overwritten, never
/// accumulated). Errors propagate to the caller and abort the run; a
/// dispatch failure is never converted into a synthetic fitness.
pub trait DispatchModel: Send + Sync {
    fn dispatch(&self, ctx: &mut ScenarioContext) -> Result<()>;
}

/// Everything a candidate evaluation reads and writes.
///
/// Exactly one live context exists per run; it is mutated in place across
/// generations. Sharing one instance across concurrent evaluations is
/// unsafe — each parallel evaluation must clone the context and work on its
/// own copy, merging only the fitness value back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioContext {
    /// Demand in MW, indexed `[region][timestep]`. All regions must have
    /// equal-length series.
    pub demand_mw: Vec<Vec<f64>>,
    /// Length of one time step in hours.
    pub dt_hours: f64,
    /// Ordered generator roster. The candidate parameter order is this
    /// order, each generator contributing `param_count()` slots.
    pub generators: Vec<Generator>,
    pub regions: Vec<Region>,
    pub costs: CostModel,
    /// Percentage of total demand energy permitted to go unserved.
    pub reliability_standard_pct: f64,
    /// Maximum non-synchronous penetration, fraction of demand in [0, 1].
    /// Consumed by the dispatch model, validated here.
    pub nonsynchronous_limit: f64,
    /// Minimum share of each region's demand that must be generated
    /// within the region, in [0, 1]. Zero disables the constraint.
    pub min_regional_share: f64,
    /// Existing inter-region link capacity in MW, `[from][to]`.
    pub link_capacity_mw: Vec<Vec<f64>>,
    /// Link length in km, `[from][to]`, used to price new capacity.
    pub link_distance_km: Vec<Vec<f64>>,

    // Simulation outputs, overwritten by every dispatch call.
    /// Unserved demand in MW per time step.
    #[serde(default)]
    pub unserved_mw: Vec<f64>,
    /// Maximum observed flow in MW for each ordered region pair.
    #[serde(default)]
    pub exchanges_mw: Vec<Vec<f64>>,
}

impl ScenarioContext {
    /// Creates a context with a single region and the given demand series.
    pub fn single_region(demand_mw: Vec<f64>, dt_hours: f64) -> Self {
        let n = 1;
        Self {
            demand_mw: vec![demand_mw],
            dt_hours,
            generators: Vec::new(),
            regions: vec![Region::new("region-1")],
            costs: CostModel::default(),
            reliability_standard_pct: 0.002,
            nonsynchronous_limit: 1.0,
            min_regional_share: 0.0,
            link_capacity_mw: vec![vec![0.0; n]; n],
            link_distance_km: vec![vec![0.0; n]; n],
            unserved_mw: Vec::new(),
            exchanges_mw: vec![vec![0.0; n]; n],
        }
    }

    /// Checks configuration invariants that are fatal at setup.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.nonsynchronous_limit) {
            return Err(CapmixError::Config(format!(
                "non-synchronous limit {} outside [0, 1]",
                self.nonsynchronous_limit
            )));
        }
        if !(0.0..=1.0).contains(&self.min_regional_share) {
            return Err(CapmixError::Config(format!(
                "minimum regional generation share {} outside [0, 1]",
                self.min_regional_share
            )));
        }
        if self.dt_hours <= 0.0 {
            return Err(CapmixError::Config(format!(
                "time step {} hours must be positive",
                self.dt_hours
            )));
        }
        if self.demand_mw.len() != self.regions.len() {
            return Err(CapmixError::Config(format!(
                "{} demand series for {} regions",
                self.demand_mw.len(),
                self.regions.len()
            )));
        }
        let steps = self.timesteps();
        if self.demand_mw.iter().any(|series| series.len() != steps) {
            return Err(CapmixError::Config(
                "regional demand series have unequal lengths".into(),
            ));
        }
        for gen in &self.generators {
            if gen.region >= self.regions.len() {
                return Err(CapmixError::Config(format!(
                    "generator {} references region {} of {}",
                    gen.name,
                    gen.region,
                    self.regions.len()
                )));
            }
        }
        let n = self.regions.len();
        for (name, matrix) in [
            ("link capacity", &self.link_capacity_mw),
            ("link distance", &self.link_distance_km),
        ] {
            if !Self::is_square(matrix, n) {
                return Err(CapmixError::Config(format!(
                    "{name} matrix is not {n} x {n}"
                )));
            }
        }
        // The exchanges matrix is a dispatch output; empty means not yet
        // dispatched, anything else must already have the right shape.
        if !self.exchanges_mw.is_empty() && !Self::is_square(&self.exchanges_mw, n) {
            return Err(CapmixError::Config(format!(
                "exchanges matrix is not {n} x {n}"
            )));
        }
        Ok(())
    }

    fn is_square(matrix: &[Vec<f64>], n: usize) -> bool {
        matrix.len() == n && matrix.iter().all(|row| row.len() == n)
    }

    /// Number of simulated time steps.
    pub fn timesteps(&self) -> usize {
        self.demand_mw.first().map_or(0, Vec::len)
    }

    /// Simulated horizon in years.
    pub fn years(&self) -> f64 {
        self.timesteps() as f64 * self.dt_hours / HOURS_PER_YEAR
    }

    /// System-wide demand in MW at one time step.
    pub fn demand_at(&self, t: usize) -> f64 {
        self.demand_mw.iter().map(|series| series[t]).sum()
    }

    /// Total demand energy over the horizon, MWh. The normaliser for all
    /// $/MWh results.
    pub fn total_demand_energy_mwh(&self) -> f64 {
        self.demand_mw
            .iter()
            .map(|series| series.iter().sum::<f64>())
            .sum::<f64>()
            * self.dt_hours
    }

    /// One region's demand energy over the horizon, MWh.
    pub fn regional_demand_energy_mwh(&self, region: usize) -> f64 {
        self.demand_mw[region].iter().sum::<f64>() * self.dt_hours
    }

    /// Energy generated within one region over the horizon, MWh.
    pub fn regional_generation_mwh(&self, region: usize) -> f64 {
        self.generators
            .iter()
            .filter(|g| g.region == region)
            .map(|g| g.energy_mwh(self.dt_hours))
            .sum()
    }

    /// Total unserved energy reported by the last dispatch, MWh.
    pub fn unserved_energy_mwh(&self) -> f64 {
        self.unserved_mw.iter().sum::<f64>() * self.dt_hours
    }

    /// Length of a valid candidate vector for this roster.
    pub fn param_count(&self) -> usize {
        self.generators.iter().map(Generator::param_count).sum()
    }

    /// Writes a candidate vector into the roster's capacities in the fixed
    /// parameter order. Values are written as-is; clamping to ≥ 0 happens
    /// only when results are serialized.
    pub fn apply_candidate(&mut self, candidate: &[f64]) -> Result<()> {
        let expected = self.param_count();
        if candidate.len() != expected {
            return Err(CapmixError::CandidateLength {
                got: candidate.len(),
                expected,
            });
        }
        let mut offset = 0;
        for gen in &mut self.generators {
            let n = gen.param_count();
            gen.set_params(&candidate[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }

    /// Current roster parameters in candidate-vector order.
    pub fn current_params(&self) -> Vec<f64> {
        self.generators.iter().flat_map(Generator::params).collect()
    }
}
