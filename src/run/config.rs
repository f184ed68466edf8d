//! Run configuration.
//!
//! [`RunConfig`] is the whole configuration surface threaded explicitly
//! into every component that needs it — there is no ambient global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cmaes::CmaesConfig;
use crate::error::{CapmixError, Result};

/// Everything that parameterises one optimisation run.
///
/// Constraint limits default to "unconstrained": infinite emissions, full
/// fossil share, zero reserves, and generous bioenergy/hydro budgets. The
/// corresponding penalty terms only activate when a limit is tightened.
///
/// # Builder Pattern
///
/// ```
/// use capmix::run::RunConfig;
///
/// let config = RunConfig::default()
///     .with_generations(50)
///     .with_emissions_limit_mt(25.0)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Search-distribution parameters (step size, population, seed).
    pub search: CmaesConfig,

    /// Generation budget.
    pub generations: usize,

    /// Evaluate candidates in parallel on cloned contexts.
    pub parallel: bool,

    /// Track and cost inter-region transmission; also enables the
    /// exchanges artifact.
    pub transmission: bool,

    /// Operating reserve requirement in MW. Zero disables the reserves
    /// term.
    pub min_reserves_mw: f64,

    /// Annual CO₂ budget in Mt/y. Infinite disables the emissions term.
    pub emissions_limit_mt: f64,

    /// Maximum fossil share of demand energy in [0, 1]. One disables the
    /// fossil term.
    pub fossil_share_limit: f64,

    /// Annual bioenergy budget in TWh/y.
    pub bioenergy_limit_twh: f64,

    /// Annual hydro budget (excluding pumped storage) in TWh/y.
    pub hydro_limit_twh: f64,

    /// Per-evaluation trace CSV. `None` disables tracing.
    pub trace_path: Option<PathBuf>,

    /// Results artifact path.
    pub results_path: PathBuf,

    /// Exchanges artifact path, written when transmission tracking is on.
    pub exchanges_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            search: CmaesConfig::default(),
            generations: 100,
            parallel: true,
            transmission: false,
            min_reserves_mw: 0.0,
            emissions_limit_mt: f64::INFINITY,
            fossil_share_limit: 1.0,
            bioenergy_limit_twh: 20.0,
            hydro_limit_twh: 12.0,
            trace_path: None,
            results_path: PathBuf::from("results.json"),
            exchanges_path: PathBuf::from("exchanges.json"),
        }
    }
}

impl RunConfig {
    /// Sets the generation budget.
    pub fn with_generations(mut self, n: usize) -> Self {
        self.generations = n;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables transmission tracking and costing.
    pub fn with_transmission(mut self, transmission: bool) -> Self {
        self.transmission = transmission;
        self
    }

    /// Sets the reserve requirement in MW.
    pub fn with_min_reserves_mw(mut self, mw: f64) -> Self {
        self.min_reserves_mw = mw;
        self
    }

    /// Sets the emissions limit in Mt/y.
    pub fn with_emissions_limit_mt(mut self, mt: f64) -> Self {
        self.emissions_limit_mt = mt;
        self
    }

    /// Sets the fossil share limit.
    pub fn with_fossil_share_limit(mut self, share: f64) -> Self {
        self.fossil_share_limit = share;
        self
    }

    /// Sets the bioenergy limit in TWh/y.
    pub fn with_bioenergy_limit_twh(mut self, twh: f64) -> Self {
        self.bioenergy_limit_twh = twh;
        self
    }

    /// Sets the hydro limit in TWh/y.
    pub fn with_hydro_limit_twh(mut self, twh: f64) -> Self {
        self.hydro_limit_twh = twh;
        self
    }

    /// Enables tracing to the given path.
    pub fn with_trace_path(mut self, path: impl AsRef<Path>) -> Self {
        self.trace_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the results artifact path.
    pub fn with_results_path(mut self, path: impl AsRef<Path>) -> Self {
        self.results_path = path.as_ref().to_path_buf();
        self
    }

    /// Sets the exchanges artifact path.
    pub fn with_exchanges_path(mut self, path: impl AsRef<Path>) -> Self {
        self.exchanges_path = path.as_ref().to_path_buf();
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.search = self.search.with_seed(seed);
        self
    }

    /// Sets the initial step size.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.search = self.search.with_sigma(sigma);
        self
    }

    /// Overrides the population size.
    pub fn with_population(mut self, n: usize) -> Self {
        self.search = self.search.with_population(n);
        self
    }

    /// Checks the configuration. Fatal at setup: no partial run is
    /// attempted on an invalid configuration.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.generations == 0 {
            return Err(CapmixError::Config("generations must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.fossil_share_limit) {
            return Err(CapmixError::Config(format!(
                "fossil share limit {} outside [0, 1]",
                self.fossil_share_limit
            )));
        }
        if self.min_reserves_mw < 0.0 {
            return Err(CapmixError::Config(format!(
                "minimum reserves {} MW must be non-negative",
                self.min_reserves_mw
            )));
        }
        if self.emissions_limit_mt < 0.0 {
            return Err(CapmixError::Config(format!(
                "emissions limit {} Mt/y must be non-negative",
                self.emissions_limit_mt
            )));
        }
        if self.bioenergy_limit_twh < 0.0 || self.hydro_limit_twh < 0.0 {
            return Err(CapmixError::Config(
                "bioenergy and hydro limits must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconstrained() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_reserves_mw, 0.0);
        assert!(config.emissions_limit_mt.is_infinite());
        assert_eq!(config.fossil_share_limit, 1.0);
        assert!(!config.transmission);
        assert!(config.trace_path.is_none());
        assert_eq!(config.results_path, PathBuf::from("results.json"));
    }

    #[test]
    fn test_builder_chain() {
        let config = RunConfig::default()
            .with_generations(20)
            .with_sigma(3.0)
            .with_population(16)
            .with_seed(7)
            .with_min_reserves_mw(750.0)
            .with_transmission(true)
            .with_trace_path("trace.csv");
        assert_eq!(config.generations, 20);
        assert_eq!(config.search.sigma, 3.0);
        assert_eq!(config.search.population, Some(16));
        assert_eq!(config.search.seed, Some(7));
        assert_eq!(config.min_reserves_mw, 750.0);
        assert!(config.transmission);
        assert_eq!(config.trace_path, Some(PathBuf::from("trace.csv")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunConfig::default().with_generations(0).validate().is_err());
        assert!(RunConfig::default()
            .with_fossil_share_limit(1.5)
            .validate()
            .is_err());
        assert!(RunConfig::default()
            .with_min_reserves_mw(-1.0)
            .validate()
            .is_err());
        assert!(RunConfig::default()
            .with_emissions_limit_mt(-2.0)
            .validate()
            .is_err());
        assert!(RunConfig::default().with_sigma(0.0).validate().is_err());
    }
}
