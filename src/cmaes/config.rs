//! Search-distribution configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CapmixError, Result};

/// Parameters of the CMA-ES search distribution.
///
/// # Builder Pattern
///
/// ```
/// use capmix::cmaes::CmaesConfig;
///
/// let config = CmaesConfig::default()
///     .with_sigma(2.0)
///     .with_population(20)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmaesConfig {
    /// Initial global step size. The search starts from a zero centroid,
    /// so sigma sets how far the first generations reach into capacity
    /// space.
    pub sigma: f64,

    /// Population size per generation. `None` auto-selects
    /// `4 + ⌊3 ln n⌋` from the parameter dimensionality.
    pub population: Option<usize>,

    /// Random seed for reproducible runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for CmaesConfig {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            population: None,
            seed: None,
        }
    }
}

impl CmaesConfig {
    /// Sets the initial step size.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Overrides the auto-selected population size.
    pub fn with_population(mut self, n: usize) -> Self {
        self.population = Some(n);
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Population size for a given parameter dimensionality.
    pub fn population_for(&self, dimension: usize) -> usize {
        self.population
            .unwrap_or_else(|| 4 + (3.0 * (dimension as f64).ln()).floor() as usize)
    }

    /// Checks parameters that are fatal at setup.
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma > 0.0) {
            return Err(CapmixError::Config(format!(
                "step size {} must be positive",
                self.sigma
            )));
        }
        if self.population == Some(0) || self.population == Some(1) {
            return Err(CapmixError::Config(
                "population must be at least 2".into(),
            ));
        }
        Ok(())
    }
}
