#[cfg(test)]
mod tests {
    use crate::cluster::{Clustering, GaussianMixture};
    use crate::gaussian::MultivariateGaussian;
    use crate::Result;
    use ndarray::aview1;
    use rand::prelude::*;
    use rand_distr::{Distribution, Normal};

    const TRUE_WEIGHTS: [f64; 2] = [0.3, 0.7];
    const TRUE_MEANS: [[f64; 2]; 2] = [[5.0, 5.0], [0.0, 1.0]];

    /// 500 points: 30% around (5, 5), 70% around (0, 1).
    fn two_gaussians(seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.7).unwrap();
        (0..500)
            .map(|_| {
                let group = if rng.random::<f64>() < TRUE_WEIGHTS[0] { 0 } else { 1 };
                let mu = TRUE_MEANS[group];
                vec![mu[0] + noise.sample(&mut rng), mu[1] + noise.sample(&mut rng)]
            })
            .collect()
    }

    fn fitted(seed: u64) -> Result<GaussianMixture> {
        let mut gmm = GaussianMixture::new().with_n_components(2).with_seed(42);
        gmm.train(&two_gaussians(seed))?;
        Ok(gmm)
    }

    #[test]
    fn test_recovers_two_well_separated_clusters() -> Result<()> {
        let gmm = fitted(2024)?;

        let mut clusters = gmm.cluster_data();
        clusters.sort_by(|a, b| a.weight.total_cmp(&b.weight));

        for (i, cluster) in clusters.iter().enumerate() {
            assert!(
                (cluster.weight - TRUE_WEIGHTS[i]).abs() < 0.1,
                "weight {} vs {}",
                cluster.weight,
                TRUE_WEIGHTS[i]
            );
            let err: f64 = cluster
                .mean
                .iter()
                .zip(TRUE_MEANS[i])
                .map(|(a, b)| (a - b).abs())
                .sum();
            assert!(err < 0.3, "mean {:?} vs {:?}", cluster.mean, TRUE_MEANS[i]);
            assert_eq!(cluster.covariance.len(), 2);
        }

        // Labels follow the fitted order; map them back through the means.
        let labels = gmm.predict(&[vec![4.0, 4.0], vec![0.0, 0.0]])?;
        let nearest = |target: [f64; 2]| {
            gmm.cluster_data()
                .into_iter()
                .min_by(|a, b| {
                    let da = (a.mean[0] - target[0]).abs() + (a.mean[1] - target[1]).abs();
                    let db = (b.mean[0] - target[0]).abs() + (b.mean[1] - target[1]).abs();
                    da.total_cmp(&db)
                })
                .map(|c| c.prediction)
        };
        assert_eq!(Some(labels[0]), nearest(TRUE_MEANS[0]));
        assert_eq!(Some(labels[1]), nearest(TRUE_MEANS[1]));
        Ok(())
    }

    #[test]
    fn test_sorted_components_give_weight_ranked_labels() -> Result<()> {
        let mut gmm = fitted(7)?;
        gmm.sort_components_by_weight();

        let labels = gmm.predict(&[vec![4.0, 4.0], vec![0.0, 0.0]])?;
        assert_eq!(labels, vec![0, 1]);
        Ok(())
    }

    #[test]
    fn test_save_and_load_predicts_identically() -> Result<()> {
        let mut gmm = fitted(11)?;
        gmm.sort_components_by_weight();

        let loaded = GaussianMixture::from_json(&gmm.to_json()?)?;

        let grid: Vec<Vec<f64>> = (-4..=9)
            .flat_map(|x| (-4..=9).map(move |y| vec![x as f64 * 0.75, y as f64 * 0.75]))
            .collect();
        assert_eq!(loaded.predict(&grid)?, gmm.predict(&grid)?);
        assert_eq!(loaded.predict_proba(&grid)?, gmm.predict_proba(&grid)?);
        assert_eq!(loaded.predict(&[vec![4.0, 4.0], vec![0.0, 0.0]])?, vec![0, 1]);
        Ok(())
    }

    #[test]
    fn test_two_points_default_config_seed_42() -> Result<()> {
        let points = vec![vec![241.0, 253.0], vec![1240.0, 214.0]];
        let mut gmm = GaussianMixture::new().with_seed(42);
        gmm.train(&points)?;

        let weights: Vec<f64> = gmm.components().iter().map(|c| c.weight()).collect();
        assert_eq!(weights.len(), 2);
        for w in &weights {
            assert!((w - 0.5).abs() < 1e-2, "weights {weights:?}");
        }
        Ok(())
    }

    #[test]
    fn test_two_points_split_evenly_across_seeds() -> Result<()> {
        // Each component ends up owning one point (or both share uniformly);
        // either way the covariance is singular or close to it, which must
        // not abort training.
        let points = vec![vec![241.0, 253.0], vec![1240.0, 214.0]];

        let mut even = 0;
        for seed in 0..10 {
            let mut gmm = GaussianMixture::new().with_seed(seed);
            gmm.train(&points)?;

            let weights: Vec<f64> = gmm.components().iter().map(|c| c.weight()).collect();
            assert_eq!(weights.len(), 2);
            assert!(weights.iter().all(|w| w.is_finite()));
            assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            if weights.iter().all(|w| (w - 0.5).abs() < 1e-2) {
                even += 1;
            }
        }
        assert!(even >= 8, "only {even}/10 seeds split the two points evenly");
        Ok(())
    }

    #[test]
    fn test_three_dimensional_density() -> Result<()> {
        let g = MultivariateGaussian::from_rows(
            &[0.7352, 0.2767, 0.6538],
            &[
                vec![3.1085, 0.5714, 0.0310],
                vec![0.9550, 3.8940, 0.8860],
                vec![0.8773, 0.8207, 3.6711],
            ],
        )?;
        let p = g.probability(aview1(&[0.7, 0.2, 0.6]));
        assert!((p - 0.010376).abs() < 1e-2, "p = {p}");
        Ok(())
    }

    #[test]
    fn test_fit_predict_separates_clusters() -> Result<()> {
        let data = two_gaussians(99);
        let labels = GaussianMixture::new().with_seed(42).fit_predict(&data)?;

        // Points near each true mean share a label; the two groups differ.
        let labels_near = |m: [f64; 2]| -> Vec<usize> {
            data.iter()
                .zip(&labels)
                .filter(|(p, _)| (p[0] - m[0]).abs() + (p[1] - m[1]).abs() < 1.0)
                .map(|(_, &label)| label)
                .collect()
        };
        let a = labels_near(TRUE_MEANS[0]);
        let b = labels_near(TRUE_MEANS[1]);
        assert!(a.windows(2).all(|w| w[0] == w[1]));
        assert!(b.windows(2).all(|w| w[0] == w[1]));
        assert_ne!(a[0], b[0]);
        Ok(())
    }
}
