//! Saved form of a fitted mixture.
//!
//! A [`SavedModel`] carries the configuration and, per component, the weight,
//! mean, covariance and the derived inverse and coefficient. Loading trusts
//! the derived values instead of refactorizing, so a reloaded mixture
//! predicts exactly like the one that was saved.
//!
//! ```json
//! {
//!   "model": "em-gmm",
//!   "version": 1,
//!   "epsilon": 2e-16,
//!   "n_components": 2,
//!   "max_iter": 1000,
//!   "seed": 42,
//!   "components": [
//!     { "weight": 0.3, "gaussian": { "dim": 2, "mean": [..], "covariance": [[..]],
//!       "inverse_covariance": [[..]], "coefficient": 0.12 } }
//!   ]
//! }
//! ```

use crate::cluster::{EmConfig, GaussianMixture};
use crate::component::Component;
use crate::error::{Error, Result};
use crate::gaussian::{mat_from_rows, mat_to_rows, MultivariateGaussian};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Kind tag written into every saved model.
pub const MODEL_KIND: &str = "em-gmm";
/// Current saved-model layout version.
pub const MODEL_VERSION: u32 = 1;

/// Serializable snapshot of a fitted [`GaussianMixture`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    /// Must equal [`MODEL_KIND`].
    pub model: String,
    /// Must equal [`MODEL_VERSION`].
    pub version: u32,
    /// Convergence threshold and numerical floor.
    pub epsilon: f64,
    /// Number of components.
    pub n_components: usize,
    /// Maximum EM iterations.
    pub max_iter: usize,
    /// Random seed used for training, if any.
    pub seed: Option<u64>,
    /// Fitted components, in label order.
    pub components: Vec<SavedComponent>,
}

/// One saved component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedComponent {
    /// Mixing weight.
    pub weight: f64,
    /// Component density.
    pub gaussian: SavedGaussian,
}

/// One saved Gaussian, including its derived values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGaussian {
    /// Dimension of the space.
    pub dim: usize,
    /// Mean vector.
    pub mean: Vec<f64>,
    /// Covariance matrix, row-major.
    pub covariance: Vec<Vec<f64>>,
    /// Inverse covariance, row-major (zero when degenerate).
    pub inverse_covariance: Vec<Vec<f64>>,
    /// Normalization coefficient (0 when degenerate).
    pub coefficient: f64,
}

impl SavedModel {
    /// Fail unless the tag and version are the ones this crate writes.
    pub fn validate_kind(&self) -> Result<()> {
        if self.model != MODEL_KIND || self.version != MODEL_VERSION {
            return Err(Error::InvalidModel {
                found: format!("model '{}' version {}", self.model, self.version),
            });
        }
        Ok(())
    }
}

impl From<&MultivariateGaussian> for SavedGaussian {
    fn from(g: &MultivariateGaussian) -> Self {
        Self {
            dim: g.dim(),
            mean: g.mean().to_vec(),
            covariance: mat_to_rows(g.covariance()),
            inverse_covariance: mat_to_rows(g.inverse_covariance()),
            coefficient: g.coefficient(),
        }
    }
}

impl TryFrom<SavedGaussian> for MultivariateGaussian {
    type Error = Error;

    fn try_from(saved: SavedGaussian) -> Result<Self> {
        if saved.mean.len() != saved.dim {
            return Err(Error::DimensionMismatch {
                expected: saved.dim,
                found: saved.mean.len(),
            });
        }
        let covariance = mat_from_rows(&saved.covariance, saved.dim)?;
        let inverse = mat_from_rows(&saved.inverse_covariance, saved.dim)?;
        MultivariateGaussian::from_parts(
            Array1::from(saved.mean),
            covariance,
            inverse,
            saved.coefficient,
        )
    }
}

impl GaussianMixture {
    /// Snapshot the fitted state.
    pub fn to_saved(&self) -> Result<SavedModel> {
        if !self.is_trained() {
            return Err(Error::NotTrained);
        }
        let config = self.config();
        Ok(SavedModel {
            model: MODEL_KIND.to_string(),
            version: MODEL_VERSION,
            epsilon: config.epsilon,
            n_components: config.n_components,
            max_iter: config.max_iter,
            seed: config.seed,
            components: self
                .components()
                .iter()
                .map(|c| SavedComponent {
                    weight: c.weight(),
                    gaussian: c.gaussian().into(),
                })
                .collect(),
        })
    }

    /// Rebuild a fitted mixture without re-running EM.
    pub fn from_saved(saved: SavedModel) -> Result<Self> {
        saved.validate_kind()?;
        if saved.components.len() != saved.n_components {
            return Err(Error::ShapeMismatch {
                expected: format!("{} components", saved.n_components),
                actual: format!("{} components", saved.components.len()),
            });
        }

        let config = EmConfig {
            epsilon: saved.epsilon,
            n_components: saved.n_components,
            max_iter: saved.max_iter,
            seed: saved.seed,
        };
        config.validate()?;

        let components = saved
            .components
            .into_iter()
            .map(|c| {
                let gaussian = MultivariateGaussian::try_from(c.gaussian)?;
                Ok(Component::from_gaussian(c.weight, gaussian))
            })
            .collect::<Result<Vec<_>>>()?;

        let dim = components[0].gaussian().dim();
        if let Some(bad) = components.iter().find(|c| c.gaussian().dim() != dim) {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: bad.gaussian().dim(),
            });
        }

        Ok(GaussianMixture::from_parts(config, components))
    }

    /// Serialize the fitted state to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_saved()?)?)
    }

    /// Load a mixture from JSON produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        let saved: SavedModel = serde_json::from_str(json)?;
        Self::from_saved(saved)
    }
}
