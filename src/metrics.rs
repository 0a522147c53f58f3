//! Aggregates reported by the streaming trainer.

/// Arithmetic mean, `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Fraction of predictions on the correct side of 0.5.
///
/// Targets are 0/1 labels; a prediction of exactly 0.5 counts as class 1.
pub fn binary_accuracy(predictions: &[f64], targets: &[f64]) -> f64 {
    assert_eq!(predictions.len(), targets.len(), "Pred and target size mismatch");
    let correct = predictions
        .iter()
        .zip(targets)
        .filter(|(&p, &t)| (p >= 0.5) == (t >= 0.5))
        .count();
    correct as f64 / predictions.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn accuracy_thresholds_at_half() {
        let preds = [0.9, 0.2, 0.5, 0.49];
        let targets = [1.0, 0.0, 1.0, 1.0];
        assert_eq!(binary_accuracy(&preds, &targets), 0.75);
    }
}
