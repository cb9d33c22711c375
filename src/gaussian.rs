//! Multivariate Gaussian density.
//!
//! ```text
//! N(x | μ, Σ) = (2π)^(-d/2) |Σ|^(-1/2) exp(-½ (x - μ)ᵀ Σ⁻¹ (x - μ))
//! ```
//!
//! The inverse and the normalization coefficient are computed once, at
//! construction. EM re-estimates covariances every iteration and a cluster
//! that collapses onto too few points yields a singular Σ. Such a covariance
//! does not fail construction: the model becomes *degenerate*, with a zero
//! inverse and a zero coefficient, and its density is 0 everywhere.

use crate::error::{Error, Result};
use faer::prelude::*;
use faer::Mat;
use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;

/// A Gaussian density with precomputed inverse covariance.
#[derive(Debug, Clone)]
pub struct MultivariateGaussian {
    mean: Array1<f64>,
    covariance: Mat<f64>,
    inverse_covariance: Mat<f64>,
    coefficient: f64,
}

/// Outcome of factorizing a covariance matrix.
enum Factorization {
    Regular { determinant: f64, inverse: Mat<f64> },
    Degenerate,
}

/// Smallest `det(Σ) / Π diag(Σ)` still treated as invertible.
///
/// By Hadamard's inequality the ratio is at most 1 for a covariance; below
/// machine epsilon the determinant is rounding noise.
const MIN_DETERMINANT_RATIO: f64 = f64::EPSILON;

/// Relative slack allowed when a quadratic form comes out negative.
const QUADRATIC_ROUNDING: f64 = 64.0 * f64::EPSILON;

fn factorize(covariance: &Mat<f64>) -> Factorization {
    let d = covariance.nrows();
    let diagonal: Vec<f64> = (0..d).map(|i| covariance[(i, i)]).collect();
    if diagonal.iter().any(|&v| !(v.is_finite() && v > 0.0)) {
        return Factorization::Degenerate;
    }

    let determinant = covariance.determinant();
    if !(determinant.is_finite() && determinant > 0.0) {
        return Factorization::Degenerate;
    }
    let scale: f64 = diagonal.iter().product();
    if determinant <= MIN_DETERMINANT_RATIO * scale {
        return Factorization::Degenerate;
    }

    let inverse = covariance
        .full_piv_lu()
        .solve(&Mat::<f64>::identity(d, d));
    let finite = (0..d).all(|i| (0..d).all(|j| inverse[(i, j)].is_finite()));
    if !finite {
        return Factorization::Degenerate;
    }

    Factorization::Regular {
        determinant,
        inverse,
    }
}

impl MultivariateGaussian {
    /// Build a density from a mean and a `d x d` covariance.
    ///
    /// Errors only on shape disagreement. A singular or numerically unusable
    /// covariance produces a degenerate model, see [`Self::is_degenerate`].
    pub fn new(mean: Array1<f64>, covariance: Mat<f64>) -> Result<Self> {
        let d = mean.len();
        if d == 0 {
            return Err(Error::EmptyInput);
        }
        if covariance.nrows() != d || covariance.ncols() != d {
            return Err(Error::ShapeMismatch {
                expected: format!("{d}x{d} covariance"),
                actual: format!("{}x{} covariance", covariance.nrows(), covariance.ncols()),
            });
        }

        let (inverse_covariance, coefficient) = match factorize(&covariance) {
            Factorization::Regular {
                determinant,
                inverse,
            } => {
                let coefficient = 1.0 / ((2.0 * PI).powf(d as f64 / 2.0) * determinant.sqrt());
                if coefficient.is_finite() {
                    (inverse, coefficient)
                } else {
                    (Mat::<f64>::zeros(d, d), 0.0)
                }
            }
            Factorization::Degenerate => (Mat::<f64>::zeros(d, d), 0.0),
        };

        Ok(Self {
            mean,
            covariance,
            inverse_covariance,
            coefficient,
        })
    }

    /// Build a density from row-major slices.
    pub fn from_rows(mean: &[f64], covariance: &[Vec<f64>]) -> Result<Self> {
        let covariance = mat_from_rows(covariance, mean.len())?;
        Self::new(Array1::from(mean.to_vec()), covariance)
    }

    /// Reassemble a density from previously derived parts, without refactorizing.
    pub(crate) fn from_parts(
        mean: Array1<f64>,
        covariance: Mat<f64>,
        inverse_covariance: Mat<f64>,
        coefficient: f64,
    ) -> Result<Self> {
        let d = mean.len();
        for (what, m) in [("covariance", &covariance), ("inverse covariance", &inverse_covariance)] {
            if m.nrows() != d || m.ncols() != d {
                return Err(Error::ShapeMismatch {
                    expected: format!("{d}x{d} {what}"),
                    actual: format!("{}x{} {what}", m.nrows(), m.ncols()),
                });
            }
        }
        if !(coefficient.is_finite() && coefficient >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "coefficient",
                message: "must be finite and non-negative",
            });
        }

        Ok(Self {
            mean,
            covariance,
            inverse_covariance,
            coefficient,
        })
    }

    /// Density at `point`.
    ///
    /// `point` must have the same dimension as the mean. Points where the
    /// quadratic form is clearly negative or not a number get density 0.
    pub fn probability(&self, point: ArrayView1<'_, f64>) -> f64 {
        debug_assert_eq!(point.len(), self.mean.len());
        let delta = &point - &self.mean;
        let d = delta.len();

        let mut q = 0.0;
        let mut magnitude = 0.0;
        for i in 0..d {
            for j in 0..d {
                let term = delta[i] * self.inverse_covariance[(i, j)] * delta[j];
                q += term;
                magnitude += term.abs();
            }
        }

        // Rounding can push q slightly below zero; anything further off
        // (indefinite Σ, overflow to NaN) has no density.
        if !(q >= 0.0) {
            if q.is_finite() && -q <= QUADRATIC_ROUNDING * magnitude {
                q = 0.0;
            } else {
                return 0.0;
            }
        }

        self.coefficient * (-q / 2.0).exp()
    }

    /// Dimension of the space.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Mean vector.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Covariance matrix as given at construction.
    pub fn covariance(&self) -> &Mat<f64> {
        &self.covariance
    }

    /// Inverse covariance (zero matrix when degenerate).
    pub fn inverse_covariance(&self) -> &Mat<f64> {
        &self.inverse_covariance
    }

    /// Normalization coefficient (0 when degenerate).
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Whether the covariance was singular or unusable.
    pub fn is_degenerate(&self) -> bool {
        self.coefficient == 0.0
    }
}

/// Copy a square faer matrix into nested rows.
pub(crate) fn mat_to_rows(m: &Mat<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
        .collect()
}

/// Build a `d x d` faer matrix from nested rows.
pub(crate) fn mat_from_rows(rows: &[Vec<f64>], d: usize) -> Result<Mat<f64>> {
    if rows.len() != d || rows.iter().any(|r| r.len() != d) {
        return Err(Error::ShapeMismatch {
            expected: format!("{d}x{d} matrix"),
            actual: format!(
                "{} rows of widths {:?}",
                rows.len(),
                rows.iter().map(Vec::len).collect::<Vec<_>>()
            ),
        });
    }
    Ok(Mat::from_fn(d, d, |i, j| rows[i][j]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::aview1;
    use proptest::prelude::*;

    fn peak(d: usize, det: f64) -> f64 {
        1.0 / ((2.0 * PI).powf(d as f64 / 2.0) * det.sqrt())
    }

    #[test]
    fn test_gaussian_3d_reference_value() {
        let g = MultivariateGaussian::from_rows(
            &[0.73516845, 0.27666293, 0.65376305],
            &[
                vec![3.10853404, 0.57142415, 0.03101091],
                vec![0.9549752, 3.89398613, 0.88597582],
                vec![0.87729471, 0.82066072, 3.67113053],
            ],
        )
        .unwrap();

        let p = g.probability(aview1(&[0.7, 0.2, 0.6]));
        assert!((p - 0.010375829337330682).abs() < 1e-2, "p = {p}");
        assert!(!g.is_degenerate());
    }

    #[test]
    fn test_gaussian_singular_is_zero_everywhere() {
        let g = MultivariateGaussian::from_rows(&[0.0, 0.0], &[vec![1.0, 1.0], vec![1.0, 1.0]])
            .unwrap();

        assert!(g.is_degenerate());
        assert_eq!(g.coefficient(), 0.0);
        for point in [[0.0, 0.0], [1.0, -1.0], [1e6, 3.0]] {
            assert_eq!(g.probability(aview1(&point)), 0.0);
        }
        let inv = g.inverse_covariance();
        assert!((0..2).all(|i| (0..2).all(|j| inv[(i, j)] == 0.0)));
    }

    #[test]
    fn test_gaussian_negative_determinant_is_degenerate() {
        let g = MultivariateGaussian::from_rows(&[0.0, 0.0], &[vec![1.0, 2.0], vec![2.0, 1.0]])
            .unwrap();
        assert!(g.is_degenerate());
        assert_eq!(g.probability(aview1(&[0.5, 0.5])), 0.0);
    }

    #[test]
    fn test_gaussian_nearly_singular_is_degenerate() {
        // Exact determinant is 0; LU leaves a ~1e-12 residue.
        let g = MultivariateGaussian::from_rows(
            &[0.0, 0.0],
            &[
                vec![72.24556085089353, -84.99477747163944],
                vec![-84.99477747163944, 99.99385584898758],
            ],
        )
        .unwrap();
        assert!(g.is_degenerate());
        let p = g.probability(aview1(&[0.0, 0.0]));
        assert!(p.abs() < 5e-3, "p = {p}");
    }

    #[test]
    fn test_gaussian_epsilon_identity_is_regular() {
        let eps = 2e-16;
        let g = MultivariateGaussian::new(
            ndarray::array![1.0, 2.0],
            Mat::from_fn(2, 2, |i, j| if i == j { eps } else { 0.0 }),
        )
        .unwrap();
        assert!(!g.is_degenerate());
        assert!(g.probability(aview1(&[1.0, 2.0])) > 0.0);
    }

    #[test]
    fn test_gaussian_negative_definite_is_degenerate() {
        let g = MultivariateGaussian::from_rows(&[0.0, 0.0], &[vec![-1.0, 0.0], vec![0.0, -1.0]])
            .unwrap();
        assert!(g.is_degenerate());
        assert_eq!(g.probability(aview1(&[0.0, 0.0])), 0.0);
        assert_eq!(g.probability(aview1(&[3.0, 0.0])), 0.0);
    }

    #[test]
    fn test_gaussian_indefinite_has_no_density_off_peak() {
        // Eigenvalues 5, -1, -1 with a positive diagonal and det = 5.
        let g = MultivariateGaussian::from_rows(
            &[0.0, 0.0, 0.0],
            &[
                vec![1.0, 2.0, 2.0],
                vec![2.0, 1.0, 2.0],
                vec![2.0, 2.0, 1.0],
            ],
        )
        .unwrap();
        assert!(g.probability(aview1(&[0.0, 0.0, 0.0])) > 0.0);
        assert_eq!(g.probability(aview1(&[3.0, -3.0, 0.0])), 0.0);
    }

    #[test]
    fn test_gaussian_overflowing_quadratic_form_is_zero() {
        let g = MultivariateGaussian::from_parts(
            ndarray::array![0.0, 0.0],
            Mat::<f64>::identity(2, 2),
            Mat::from_fn(2, 2, |_, _| 1e308),
            0.5,
        )
        .unwrap();
        assert_eq!(g.probability(aview1(&[10.0, -10.0])), 0.0);
        assert_eq!(g.probability(aview1(&[0.0, 0.0])), 0.5);
    }

    #[test]
    fn test_gaussian_standard_normal_1d() {
        let g = MultivariateGaussian::from_rows(&[0.0], &[vec![1.0]]).unwrap();
        let expected = (-0.5f64).exp() / (2.0 * PI).sqrt();
        assert!((g.probability(aview1(&[1.0])) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_shape_mismatch() {
        let err = MultivariateGaussian::from_rows(&[0.0, 0.0], &[vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    proptest! {
        #[test]
        fn prop_peak_density_at_mean(
            a in -2.0f64..2.0, b in -2.0f64..2.0, c in -2.0f64..2.0,
            mx in -10.0f64..10.0, my in -10.0f64..10.0,
            dx in -0.5f64..0.5, dy in -0.5f64..0.5,
        ) {
            // L Lᵀ + I is symmetric positive definite.
            let s00 = a * a + 1.0;
            let s01 = a * b;
            let s11 = b * b + c * c + 1.0;
            let det = s00 * s11 - s01 * s01;

            let g = MultivariateGaussian::from_rows(
                &[mx, my],
                &[vec![s00, s01], vec![s01, s11]],
            ).unwrap();

            let at_mean = g.probability(aview1(&[mx, my]));
            prop_assert!((at_mean - peak(2, det)).abs() <= 1e-9 * peak(2, det));
            prop_assert!(g.probability(aview1(&[mx + dx, my + dy])) <= at_mean);
        }
    }
}
