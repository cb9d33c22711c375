//! Mixture-model clustering.
//!
//! ## Hard vs Soft Clustering
//!
//! **Hard clustering** assigns each item to exactly one cluster
//! ([`GaussianMixture::predict`]).
//!
//! **Soft clustering** gives each item a probability distribution over clusters
//! ([`GaussianMixture::predict_proba`]). A point halfway between two clusters
//! gets roughly equal claims from both.
//!
//! ## Gaussian Mixture Model (GMM)
//!
//! Models data as a mixture of k Gaussian distributions:
//!
//! ```text
//! P(x) = Σ π_k × N(x | μ_k, Σ_k)
//! ```
//!
//! Where π_k is the mixture weight (probability of cluster k), and N is the
//! Gaussian density with mean μ_k and full covariance Σ_k.
//!
//! **EM Algorithm** (see [`em`] for the individual steps):
//! 1. **Init**: random responsibilities
//! 2. **M-step**: update π, μ, Σ from the responsibilities
//! 3. **E-step**: recompute P(cluster k | point x) for each point
//! 4. Repeat until responsibilities stop moving
//!
//! ## Usage
//!
//! ```rust
//! use mixem::cluster::GaussianMixture;
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.2],
//!     vec![0.2, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.2],
//!     vec![10.2, 9.9],
//! ];
//!
//! let mut gmm = GaussianMixture::new().with_n_components(2).with_seed(42);
//! gmm.train(&data).unwrap();
//!
//! let labels = gmm.predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[3]);
//!
//! // probs[i][k] = P(point i belongs to cluster k)
//! let probs = gmm.predict_proba(&data).unwrap();
//! assert_eq!(probs[0].len(), 2);
//! ```

pub mod em;
mod gmm;
mod traits;

pub use gmm::{ClusterSummary, EmConfig, GaussianMixture};
pub use traits::{Clustering, SoftClustering};
