//! Fit-and-label interfaces.

use crate::error::Result;

/// A model that can be fitted on rows and label each of them.
pub trait Clustering {
    /// Fit on `data` and return the most likely cluster of every row.
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>>;

    /// Number of clusters the model fits.
    fn n_clusters(&self) -> usize;
}

/// A clustering model with per-row posteriors.
pub trait SoftClustering: Clustering {
    /// Fit on `data` and return a matrix where entry \[i\]\[k\] is the
    /// posterior probability that row i belongs to cluster k.
    fn fit_predict_proba(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    /// Fit on `data` and return the largest posterior of every row.
    ///
    /// Values near `1 / n_clusters` flag rows no cluster explains well.
    fn fit_confidence(&self, data: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self
            .fit_predict_proba(data)?
            .iter()
            .map(|row| row.iter().copied().fold(0.0, f64::max))
            .collect())
    }
}
