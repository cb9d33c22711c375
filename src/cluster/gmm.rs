//! Gaussian Mixture Model clustering.
//!
//! GMM provides **soft clustering** with probabilistic assignments,
//! allowing items to belong to multiple clusters with different probabilities.
//!
//! # The Probabilistic Model
//!
//! GMM assumes data is generated from K Gaussian distributions:
//!
//! ```text
//! P(x) = Σₖ πₖ × N(x | μₖ, Σₖ)
//! ```
//!
//! Where:
//! - πₖ = mixing weight (probability of cluster k)
//! - μₖ = mean of cluster k
//! - Σₖ = full covariance matrix of cluster k
//!
//! # The EM Algorithm
//!
//! Training starts from a random `K x N` responsibility matrix and alternates:
//!
//! **M-step**: Update parameters using responsibilities γ:
//! - πₖ = Σₙ γₖₙ / Σⱼ Σₙ γⱼₙ
//! - μₖ = Σₙ γₖₙ xₙ / Σₙ γₖₙ
//! - Σₖ = ε·I + Σₙ γₖₙ (xₙ - μₖ)(xₙ - μₖ)ᵀ / Σₙ γₖₙ
//!
//! **E-step**: Compute responsibilities from the new components:
//! ```text
//! γₖₙ = πₖ × N(xₙ | μₖ, Σₖ) / Σⱼ πⱼ × N(xₙ | μⱼ, Σⱼ)
//! ```
//!
//! It stops when no responsibility moves by more than ε, or after
//! `max_iter` rounds. Running out of rounds is not an error: the last
//! components are kept.
//!
//! # Failure Modes
//!
//! - **Local optima**: EM converges to local maxima; initialization matters
//! - **Singular covariance**: the component's density drops to zero for that round
//! - **Starved component**: its responsibilities are refilled with ε
//! - **Label order**: component order depends on the initialization

use super::em;
use super::traits::{Clustering, SoftClustering};
use crate::component::Component;
use crate::error::{Error, Result};
use crate::gaussian::mat_to_rows;
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmConfig {
    /// Convergence threshold and numerical floor.
    pub epsilon: f64,
    /// Number of components (clusters).
    pub n_components: usize,
    /// Maximum EM iterations.
    pub max_iter: usize,
    /// Random seed; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            epsilon: 2e-16,
            n_components: 2,
            max_iter: 1000,
            seed: None,
        }
    }
}

impl EmConfig {
    /// Set the convergence threshold / numerical floor.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set number of components.
    pub fn with_n_components(mut self, n: usize) -> Self {
        self.n_components = n;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration before training.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be finite and > 0",
            });
        }
        if self.n_components == 0 {
            return Err(Error::InvalidParameter {
                name: "n_components",
                message: "must be > 0",
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Parameters of one fitted cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Mixing weight.
    pub weight: f64,
    /// Mean vector.
    pub mean: Vec<f64>,
    /// Covariance matrix, row-major.
    pub covariance: Vec<Vec<f64>>,
    /// Label [`GaussianMixture::predict`] returns for this cluster.
    pub prediction: usize,
}

/// Gaussian Mixture Model fitted by expectation-maximization.
#[derive(Debug, Clone, Default)]
pub struct GaussianMixture {
    config: EmConfig,
    components: Vec<Component>,
}

impl GaussianMixture {
    /// Create an untrained mixture with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an untrained mixture from a configuration.
    pub fn with_config(config: EmConfig) -> Self {
        Self {
            config,
            components: Vec::new(),
        }
    }

    /// Reassemble a fitted mixture.
    pub(crate) fn from_parts(config: EmConfig, components: Vec<Component>) -> Self {
        Self { config, components }
    }

    /// Set number of components.
    pub fn with_n_components(mut self, n: usize) -> Self {
        self.config.n_components = n;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Set the convergence threshold / numerical floor.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Training configuration.
    pub fn config(&self) -> &EmConfig {
        &self.config
    }

    /// Fitted components, empty before training.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Whether the mixture holds fitted components.
    pub fn is_trained(&self) -> bool {
        !self.components.is_empty()
    }

    /// Fit the mixture, seeding the initial responsibilities from `seed`.
    pub fn train(&mut self, features: &[Vec<f64>]) -> Result<()> {
        let mut rng: Box<dyn RngCore> = match self.config.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        self.train_with_rng(features, &mut rng)
    }

    /// Fit the mixture, drawing the initial responsibilities from `rng`.
    ///
    /// Replaces any previously fitted components.
    pub fn train_with_rng<R: Rng + ?Sized>(
        &mut self,
        features: &[Vec<f64>],
        rng: &mut R,
    ) -> Result<()> {
        self.config.validate()?;
        let data = to_array(features)?;

        let n = data.nrows();
        let k = self.config.n_components;
        if k > n {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: n,
            });
        }

        let epsilon = self.config.epsilon;
        let mut responsibilities = em::initial_responsibilities(k, n, rng);
        let mut iterations = 0;

        let (components, delta) = loop {
            let components = em::maximization(&data, &responsibilities, epsilon)?;
            let next = em::expectation(&data, &components);
            let delta = em::max_abs_delta(&next, &responsibilities);
            responsibilities = next;
            iterations += 1;
            trace!(iteration = iterations, delta, "em iteration");

            if delta <= epsilon || iterations >= self.config.max_iter {
                break (components, delta);
            }
        };

        debug!(
            iterations,
            delta,
            converged = delta <= epsilon,
            n_components = k,
            n_points = n,
            "em training finished"
        );

        self.components = components;
        Ok(())
    }

    /// Hard assignment: index of the component with the highest weighted density.
    ///
    /// Ties go to the lowest index.
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>> {
        let data = self.checked_input(features)?;
        Ok(self.labels(&data))
    }

    /// Soft assignment: posterior over components for every point.
    pub fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let data = self.checked_input(features)?;
        Ok(em::posteriors(&data, &self.components))
    }

    /// Weight, mean, covariance and label of every fitted component.
    pub fn cluster_data(&self) -> Vec<ClusterSummary> {
        self.components
            .iter()
            .enumerate()
            .map(|(prediction, c)| ClusterSummary {
                weight: c.weight(),
                mean: c.gaussian().mean().to_vec(),
                covariance: mat_to_rows(c.gaussian().covariance()),
                prediction,
            })
            .collect()
    }

    /// Reorder components by ascending weight, so labels follow weight rank.
    pub fn sort_components_by_weight(&mut self) {
        self.components
            .sort_by(|a, b| a.weight().total_cmp(&b.weight()));
    }

    #[cfg(feature = "parallel")]
    fn labels(&self, data: &Array2<f64>) -> Vec<usize> {
        (0..data.nrows())
            .into_par_iter()
            .map(|i| self.most_likely(data.row(i)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn labels(&self, data: &Array2<f64>) -> Vec<usize> {
        data.rows()
            .into_iter()
            .map(|point| self.most_likely(point))
            .collect()
    }

    fn most_likely(&self, point: ArrayView1<'_, f64>) -> usize {
        let mut best = 0;
        let mut max = f64::NEG_INFINITY;
        for (k, component) in self.components.iter().enumerate() {
            let p = component.probability(point);
            if p > max {
                max = p;
                best = k;
            }
        }
        best
    }

    fn checked_input(&self, features: &[Vec<f64>]) -> Result<Array2<f64>> {
        let first = self.components.first().ok_or(Error::NotTrained)?;
        let data = to_array(features)?;
        let expected = first.gaussian().dim();
        if data.ncols() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: data.ncols(),
            });
        }
        Ok(data)
    }
}

/// Convert rows into an `N x D` array, rejecting ragged or non-finite input.
fn to_array(data: &[Vec<f64>]) -> Result<Array2<f64>> {
    let n = data.len();
    let d = data.first().map_or(0, Vec::len);
    if n == 0 || d == 0 {
        return Err(Error::EmptyInput);
    }

    let mut flat: Vec<f64> = Vec::with_capacity(n * d);
    for point in data {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "features",
                message: "all values must be finite",
            });
        }
        flat.extend(point);
    }
    Array2::from_shape_vec((n, d), flat).map_err(|e| Error::ShapeMismatch {
        expected: format!("{n}x{d} features"),
        actual: e.to_string(),
    })
}

impl Clustering for GaussianMixture {
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        let mut model = self.clone();
        model.train(data)?;
        model.predict(data)
    }

    fn n_clusters(&self) -> usize {
        self.config.n_components
    }
}

impl SoftClustering for GaussianMixture {
    fn fit_predict_proba(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let mut model = self.clone();
        model.train(data)?;
        model.predict_proba(data)
    }
}
