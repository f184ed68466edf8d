//! The CMA-ES distribution update.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use super::config::CmaesConfig;
use crate::error::{CapmixError, Result};

/// Adaptive search distribution over candidate capacity vectors.
///
/// Initialized once from a zero centroid and the configured step size;
/// updated once per generation from the fitness-ranked population. Lower
/// fitness is better throughout. Parameters are unbounded — candidates may
/// go negative during search and are clamped only when results are
/// serialized.
#[derive(Debug)]
pub struct CmaesStrategy {
    dimension: usize,
    population_size: usize,
    /// Number of top-ranked individuals recombined into the new mean.
    mu: usize,
    mean: DVector<f64>,
    sigma: f64,
    covariance: DMatrix<f64>,
    /// Evolution path for covariance adaptation.
    p_c: DVector<f64>,
    /// Evolution path for step-size adaptation.
    p_sigma: DVector<f64>,
    /// Recombination weights for the top-mu individuals (sum to 1).
    weights: DVector<f64>,
    /// Variance-effective selection mass.
    mu_eff: f64,
    c_c: f64,
    c_sigma: f64,
    c_1: f64,
    c_mu: f64,
    d_sigma: f64,
    /// Expected norm of an n-dimensional standard normal vector.
    expected_norm: f64,
    generation: usize,
    rng: StdRng,
    /// Best candidate and fitness seen across all generations.
    hall_of_fame: Option<(Vec<f64>, f64)>,
}

impl CmaesStrategy {
    /// Creates the strategy for `dimension` free parameters.
    pub fn new(dimension: usize, config: &CmaesConfig) -> Result<Self> {
        config.validate()?;
        if dimension == 0 {
            return Err(CapmixError::Config(
                "scenario exposes no settable parameters".into(),
            ));
        }

        let n = dimension as f64;
        let population_size = config.population_for(dimension).max(2);
        let mu = (population_size / 2).max(1);

        // Hansen's standard recombination weights and learning rates.
        let raw_weights: Vec<f64> = (0..mu)
            .map(|i| (mu as f64 + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();
        let w_sum: f64 = raw_weights.iter().sum();
        let weights = DVector::from_iterator(mu, raw_weights.iter().map(|w| w / w_sum));
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let c_sigma = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        let d_sigma = 1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + c_sigma;
        let c_c = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);
        let c_1 = 2.0 / ((n + 1.3).powi(2) + mu_eff);
        let c_mu =
            (2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((n + 2.0).powi(2) + mu_eff)).min(1.0 - c_1);
        let expected_norm = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n.powi(2)));

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            dimension,
            population_size,
            mu,
            mean: DVector::zeros(dimension),
            sigma: config.sigma,
            covariance: DMatrix::identity(dimension, dimension),
            p_c: DVector::zeros(dimension),
            p_sigma: DVector::zeros(dimension),
            weights,
            mu_eff,
            c_c,
            c_sigma,
            c_1,
            c_mu,
            d_sigma,
            expected_norm,
            generation: 0,
            rng,
            hall_of_fame: None,
        })
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Best candidate found so far, with its fitness.
    pub fn best(&self) -> Option<(&[f64], f64)> {
        self.hall_of_fame
            .as_ref()
            .map(|(candidate, fitness)| (candidate.as_slice(), *fitness))
    }

    /// Samples one generation's population from the current distribution.
    pub fn sample(&mut self) -> Vec<Vec<f64>> {
        // C = B D² Bᵀ; candidates are mean + sigma · B D z, z ~ N(0, I).
        let eigen = nalgebra::SymmetricEigen::new(self.covariance.clone());
        let sqrt_eigenvalues = eigen.eigenvalues.map(|v| v.max(1e-20).sqrt());
        let bd = &eigen.eigenvectors * DMatrix::from_diagonal(&sqrt_eigenvalues);

        (0..self.population_size)
            .map(|_| {
                let z = DVector::from_iterator(
                    self.dimension,
                    (0..self.dimension).map(|_| {
                        let v: f64 = StandardNormal.sample(&mut self.rng);
                        v
                    }),
                );
                let x = &self.mean + self.sigma * &bd * z;
                x.iter().copied().collect()
            })
            .collect()
    }

    /// Re-estimates the distribution from the ranked population and
    /// refreshes the hall of fame.
    ///
    /// `fitnesses[i]` must belong to `population[i]`; order within the
    /// slices is otherwise irrelevant. Every fitness must be finite.
    ///
    /// # Panics
    /// Panics if the slices differ in length or do not match the
    /// population size.
    pub fn update(&mut self, population: &[Vec<f64>], fitnesses: &[f64]) {
        assert_eq!(population.len(), fitnesses.len());
        assert_eq!(population.len(), self.population_size);

        // Hall of fame: strict improvement only.
        for (candidate, &fitness) in population.iter().zip(fitnesses) {
            let improves = match &self.hall_of_fame {
                Some((_, incumbent)) => fitness < *incumbent,
                None => true,
            };
            if improves {
                self.hall_of_fame = Some((candidate.clone(), fitness));
            }
        }

        // Rank ascending: minimisation.
        let mut indices: Vec<usize> = (0..self.population_size).collect();
        indices.sort_by(|&a, &b| {
            fitnesses[a]
                .partial_cmp(&fitnesses[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let as_vector = |idx: usize| DVector::from_column_slice(&population[idx]);

        // Weighted recombination of the top-mu candidates.
        let old_mean = self.mean.clone();
        let mut new_mean = DVector::zeros(self.dimension);
        for (w_idx, &pop_idx) in indices.iter().take(self.mu).enumerate() {
            new_mean += self.weights[w_idx] * as_vector(pop_idx);
        }

        // C^{-1/2} for the step-size path.
        let eigen = nalgebra::SymmetricEigen::new(self.covariance.clone());
        let inv_sqrt = eigen.eigenvalues.map(|v| 1.0 / v.max(1e-20).sqrt());
        let c_inv_sqrt =
            &eigen.eigenvectors * DMatrix::from_diagonal(&inv_sqrt) * eigen.eigenvectors.transpose();

        let mean_diff = (&new_mean - &old_mean) / self.sigma;

        self.p_sigma = (1.0 - self.c_sigma) * &self.p_sigma
            + (self.c_sigma * (2.0 - self.c_sigma) * self.mu_eff).sqrt() * &c_inv_sqrt * &mean_diff;

        // h_sigma gates the covariance path while sigma is still adapting.
        let gen_factor = 1.0 - (1.0 - self.c_sigma).powi(2 * (self.generation as i32 + 1));
        let p_sigma_norm = self.p_sigma.norm();
        let h_sigma_threshold = (1.4 + 2.0 / (self.dimension as f64 + 1.0))
            * self.expected_norm
            * gen_factor.sqrt();
        let h_sigma = if p_sigma_norm < h_sigma_threshold {
            1.0
        } else {
            0.0
        };

        self.p_c = (1.0 - self.c_c) * &self.p_c
            + h_sigma * (self.c_c * (2.0 - self.c_c) * self.mu_eff).sqrt() * &mean_diff;

        // Rank-mu update from the top candidates' displacements.
        let mut rank_mu = DMatrix::zeros(self.dimension, self.dimension);
        for (w_idx, &pop_idx) in indices.iter().take(self.mu).enumerate() {
            let y = (as_vector(pop_idx) - &old_mean) / self.sigma;
            rank_mu += self.weights[w_idx] * &y * y.transpose();
        }

        let delta_h = (1.0 - h_sigma) * self.c_c * (2.0 - self.c_c);
        let base = 1.0 - self.c_1 - self.c_mu + self.c_1 * delta_h;
        self.covariance = base * &self.covariance
            + self.c_1 * &self.p_c * self.p_c.transpose()
            + self.c_mu * &rank_mu;

        // Re-symmetrise to contain floating-point drift.
        self.covariance = (&self.covariance + self.covariance.transpose()) * 0.5;

        self.sigma *=
            ((self.c_sigma / self.d_sigma) * (p_sigma_norm / self.expected_norm - 1.0)).exp();
        self.sigma = self.sigma.clamp(1e-12, 1e6);

        self.mean = new_mean;

        if self.mean.iter().any(|v| v.is_nan()) || self.sigma.is_nan() {
            log::warn!(
                "CMA-ES generation {}: NaN in distribution state, resetting",
                self.generation
            );
            self.mean = DVector::zeros(self.dimension);
            self.sigma = 1.0;
            self.covariance = DMatrix::identity(self.dimension, self.dimension);
            self.p_c = DVector::zeros(self.dimension);
            self.p_sigma = DVector::zeros(self.dimension);
        }

        self.generation += 1;
    }
}
