use mixem::GaussianMixture;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=mixem=trace shows every EM iteration.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Two clusters in 2D: 30% near (5, 5), 70% near (0, 1).
    let mut rng = StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.8)?;
    let data: Vec<Vec<f64>> = (0..500)
        .map(|_| {
            let (cx, cy) = if rng.random::<f64>() < 0.3 { (5.0, 5.0) } else { (0.0, 1.0) };
            vec![cx + noise.sample(&mut rng), cy + noise.sample(&mut rng)]
        })
        .collect();

    let mut gmm = GaussianMixture::new().with_n_components(2).with_seed(42);
    gmm.train(&data)?;
    gmm.sort_components_by_weight();

    for cluster in gmm.cluster_data() {
        println!(
            "cluster {}: weight={:.3} mean={:?}",
            cluster.prediction, cluster.weight, cluster.mean
        );
    }

    let queries = vec![vec![4.0, 4.0], vec![0.0, 0.0], vec![2.5, 3.0]];
    let labels = gmm.predict(&queries)?;
    let probs = gmm.predict_proba(&queries)?;
    for ((q, label), p) in queries.iter().zip(&labels).zip(&probs) {
        println!("{q:?} -> {label} (posterior {p:.3?})");
    }

    // The saved form reloads without re-running EM.
    let json = gmm.to_json()?;
    let reloaded = GaussianMixture::from_json(&json)?;
    assert_eq!(reloaded.predict(&queries)?, labels);
    println!("saved model: {} bytes", json.len());

    Ok(())
}
