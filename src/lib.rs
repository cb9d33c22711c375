//! # mixem
//!
//! Gaussian mixture models fitted with expectation-maximization.
//!
//! Full-covariance components, random responsibility initialization, and a
//! single `epsilon` acting as both the convergence threshold and the floor
//! that keeps covariances and starved components away from exact zero.
//! Singular covariances never abort training: the affected component simply
//! has zero density until the next maximization step.
//!
//! ```rust
//! use mixem::GaussianMixture;
//!
//! let points = vec![vec![241.0, 253.0], vec![1240.0, 214.0]];
//! let mut gmm = GaussianMixture::new().with_seed(42);
//! gmm.train(&points).unwrap();
//! assert_eq!(gmm.components().len(), 2);
//! ```
//!
//! Enable the `parallel` feature to evaluate posteriors across points with rayon.

pub mod cluster;
pub mod component;
/// Error types used across `mixem`.
pub mod error;
pub mod gaussian;
pub mod model;

#[cfg(test)]
mod scenario_tests;

pub use cluster::{ClusterSummary, Clustering, EmConfig, GaussianMixture, SoftClustering};
pub use component::Component;
pub use error::{Error, Result};
pub use gaussian::MultivariateGaussian;
pub use model::{SavedComponent, SavedGaussian, SavedModel, MODEL_KIND, MODEL_VERSION};
