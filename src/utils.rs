//! Synthetic data and console summaries.
use crate::datasets::Dataset;
use crate::network::Dgn;
use crate::trainer::EpochReport;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Regression data: standard normal features, target `w · x + bias` with
/// fixed random weights.
pub fn generate_linear_data(n_samples: usize, input_size: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let weights: Vec<f64> = (0..input_size).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let bias = rng.gen_range(-0.5..0.5);
    (0..n_samples)
        .map(|_| {
            let input: Vec<f64> = (0..input_size).map(|_| rng.sample(StandardNormal)).collect();
            let target = input.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>() + bias;
            (input, target)
        })
        .collect()
}

/// Linearly separable 0/1 labels from the sign of `w · x + bias`.
pub fn generate_binary_data(n_samples: usize, input_size: usize, seed: u64) -> Dataset {
    generate_linear_data(n_samples, input_size, seed)
        .into_iter()
        .map(|(x, y)| (x, if y > 0.0 { 1.0 } else { 0.0 }))
        .collect()
}

/// Print model summary
pub fn print_model_summary(net: &Dgn) {
    println!("Model Summary:\n{}", net);
}

/// Print per-epoch losses (and accuracies when present) as a table.
pub fn print_summary_table(reports: &[EpochReport], title: &str) {
    println!("\n{} Summary Table:", title);
    println!("+-------+------------+------------+----------+----------+");
    println!("| Epoch | Train loss | Test loss  | Train acc| Test acc |");
    println!("+-------+------------+------------+----------+----------+");
    for r in reports {
        let acc = |a: Option<f64>| a.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v * 100.0));
        println!(
            "| {:>5} | {:>10.6} | {:>10.6} | {:>8} | {:>8} |",
            r.epoch,
            r.train.mean_loss,
            r.test.map_or(f64::NAN, |s| s.mean_loss),
            acc(r.train.accuracy),
            acc(r.test.and_then(|s| s.accuracy))
        );
    }
    println!("+-------+------------+------------+----------+----------+");
}
