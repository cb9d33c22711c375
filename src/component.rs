//! A weighted Gaussian: one cluster of the mixture.

use crate::error::Result;
use crate::gaussian::MultivariateGaussian;
use faer::Mat;
use ndarray::{Array1, ArrayView1};

/// One mixture component: `weight × N(x | μ, Σ)`.
#[derive(Debug, Clone)]
pub struct Component {
    weight: f64,
    gaussian: MultivariateGaussian,
}

impl Component {
    /// Create a component from its weight and Gaussian parameters.
    pub fn new(weight: f64, mean: Array1<f64>, covariance: Mat<f64>) -> Result<Self> {
        Ok(Self {
            weight,
            gaussian: MultivariateGaussian::new(mean, covariance)?,
        })
    }

    /// Wrap an existing density.
    pub fn from_gaussian(weight: f64, gaussian: MultivariateGaussian) -> Self {
        Self { weight, gaussian }
    }

    /// Weighted density contribution of `point` to this component.
    pub fn probability(&self, point: ArrayView1<'_, f64>) -> f64 {
        self.weight * self.gaussian.probability(point)
    }

    /// Mixing weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Underlying density.
    pub fn gaussian(&self) -> &MultivariateGaussian {
        &self.gaussian
    }
}
