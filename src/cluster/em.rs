//! The two halves of an EM iteration, plus initialization and the stopping rule.
//!
//! Responsibilities are kept as a `K x N` matrix: row `k` holds component
//! `k`'s claim on every point. Each function returns fresh values; nothing
//! is mutated across an iteration boundary.

use crate::component::Component;
use crate::error::Result;
use faer::Mat;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Independent uniform draws in `[0, 1)`, filled row by row.
///
/// Columns do not sum to 1; [`maximization`] normalizes by the matrix total.
pub fn initial_responsibilities<R: Rng + ?Sized>(k: usize, n: usize, rng: &mut R) -> Array2<f64> {
    let mut resp = Array2::zeros((k, n));
    for value in resp.iter_mut() {
        *value = rng.random::<f64>();
    }
    resp
}

/// Re-estimate weight, mean and covariance of every component.
///
/// `features` is `N x D`, `responsibilities` is `K x N`. A row whose mass is
/// below `epsilon` is refilled with `epsilon` so the component stays alive.
/// Covariances start at `epsilon · I`.
pub fn maximization(
    features: &Array2<f64>,
    responsibilities: &Array2<f64>,
    epsilon: f64,
) -> Result<Vec<Component>> {
    let n = features.nrows();
    let d = features.ncols();

    let rows: Vec<(Array1<f64>, f64)> = responsibilities
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(k, row)| {
            let estimation_sum = row.sum();
            if estimation_sum < epsilon {
                debug!(component = k, estimation_sum, "flooring starved component");
                (Array1::from_elem(n, epsilon), n as f64 * epsilon)
            } else {
                (row.to_owned(), estimation_sum)
            }
        })
        .collect();
    let total: f64 = rows.iter().map(|(_, s)| s).sum();

    let mut components = Vec::with_capacity(rows.len());
    for (k, (row, estimation_sum)) in rows.iter().enumerate() {
        let weight = estimation_sum / total;
        let mean = row.dot(features) / *estimation_sum;

        let mut covariance = Mat::<f64>::zeros(d, d);
        for j in 0..d {
            covariance[(j, j)] = epsilon;
        }
        for (i, point) in features.axis_iter(Axis(0)).enumerate() {
            let diff = &point - &mean;
            let coeff = row[i] / estimation_sum;
            for a in 0..d {
                for b in 0..=a {
                    let tmp = coeff * diff[a] * diff[b];
                    covariance[(a, b)] += tmp;
                    if b != a {
                        covariance[(b, a)] += tmp;
                    }
                }
            }
        }

        let component = Component::new(weight, mean, covariance)?;
        if component.gaussian().is_degenerate() {
            debug!(component = k, weight, "degenerate covariance, density set to zero");
        }
        components.push(component);
    }

    Ok(components)
}

/// Posterior over components for a single point.
///
/// Falls back to `1/K` everywhere when every component gives zero density
/// (or the densities overflow).
pub fn posterior(components: &[Component], point: ArrayView1<'_, f64>) -> Vec<f64> {
    let mut probs: Vec<f64> = components.iter().map(|c| c.probability(point)).collect();
    let sum: f64 = probs.iter().sum();

    if sum > 0.0 && sum.is_finite() {
        for p in probs.iter_mut() {
            *p /= sum;
        }
    } else {
        let uniform = 1.0 / components.len() as f64;
        probs.iter_mut().for_each(|p| *p = uniform);
    }
    probs
}

/// Posterior for every row of `features`, in row order.
#[cfg(feature = "parallel")]
pub fn posteriors(features: &Array2<f64>, components: &[Component]) -> Vec<Vec<f64>> {
    (0..features.nrows())
        .into_par_iter()
        .map(|i| posterior(components, features.row(i)))
        .collect()
}

/// Posterior for every row of `features`, in row order.
#[cfg(not(feature = "parallel"))]
pub fn posteriors(features: &Array2<f64>, components: &[Component]) -> Vec<Vec<f64>> {
    features
        .axis_iter(Axis(0))
        .map(|point| posterior(components, point))
        .collect()
}

/// Fresh `K x N` responsibilities from the current components.
pub fn expectation(features: &Array2<f64>, components: &[Component]) -> Array2<f64> {
    let k = components.len();
    let columns = posteriors(features, components);

    let mut resp = Array2::zeros((k, features.nrows()));
    for (i, column) in columns.iter().enumerate() {
        for (c, &p) in column.iter().enumerate() {
            resp[[c, i]] = p;
        }
    }
    resp
}

/// Largest absolute entrywise change between two responsibility matrices.
pub fn max_abs_delta(current: &Array2<f64>, previous: &Array2<f64>) -> f64 {
    current
        .iter()
        .zip(previous.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
