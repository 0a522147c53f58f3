//! Streaming trainer: feeds examples to the network one at a time, in order.
use crate::config::TrainConfig;
use crate::error::{DgnError, Result};
use crate::loss::LossKind;
use crate::metrics::{binary_accuracy, mean};
use crate::network::Dgn;
use tracing::info;

/// Mean loss over one pass, plus accuracy for classification networks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub mean_loss: f64,
    pub accuracy: Option<f64>,
}

/// Train and test statistics after `epoch` training passes (0 = untrained).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub train: EpochStats,
    /// `None` when the test split is empty.
    pub test: Option<EpochStats>,
}

fn run_pass(net: &mut Dgn, data: &[(Vec<f64>, f64)], learning_rate: f64, update: bool) -> Result<EpochStats> {
    if data.is_empty() {
        return Err(DgnError::EmptyDataset);
    }
    let mut losses = Vec::with_capacity(data.len());
    let mut predictions = Vec::with_capacity(data.len());
    let kind = net.loss_kind();
    for (input, target) in data {
        let (prediction, _) = net.predict_and_maybe_update(input, Some(*target), learning_rate, update)?;
        predictions.push(prediction);
        losses.push(kind.loss(prediction, *target));
    }
    let accuracy = match net.loss_kind() {
        LossKind::Bernoulli => {
            let targets: Vec<f64> = data.iter().map(|(_, t)| *t).collect();
            Some(binary_accuracy(&predictions, &targets))
        }
        LossKind::Square => None,
    };
    Ok(EpochStats {
        mean_loss: mean(&losses),
        accuracy,
    })
}

/// One training pass: every example updates the weights before the next is seen.
///
/// The reported loss of each example is measured before its own update.
pub fn train_epoch(net: &mut Dgn, data: &[(Vec<f64>, f64)], learning_rate: f64) -> Result<EpochStats> {
    run_pass(net, data, learning_rate, true)
}

/// One evaluation pass; the weights are left untouched.
pub fn evaluate(net: &mut Dgn, data: &[(Vec<f64>, f64)]) -> Result<EpochStats> {
    run_pass(net, data, 0.0, false)
}

/// Evaluate the untrained network, then alternate training and evaluation
/// for `config.epochs` passes.
pub fn fit(
    net: &mut Dgn,
    train: &[(Vec<f64>, f64)],
    test: &[(Vec<f64>, f64)],
    config: &TrainConfig,
) -> Result<Vec<EpochReport>> {
    config.validate()?;
    let mut reports = Vec::with_capacity(config.epochs + 1);
    for epoch in 0..=config.epochs {
        if epoch > 0 {
            train_epoch(net, train, config.learning_rate)?;
        }
        let report = EpochReport {
            epoch,
            train: evaluate(net, train)?,
            test: if test.is_empty() { None } else { Some(evaluate(net, test)?) },
        };
        log_report(&report);
        reports.push(report);
    }
    Ok(reports)
}

fn log_report(report: &EpochReport) {
    info!(
        epoch = report.epoch,
        train_loss = report.train.mean_loss,
        test_loss = report.test.map(|s| s.mean_loss),
        train_acc = report.train.accuracy,
        test_acc = report.test.and_then(|s| s.accuracy),
        "epoch finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DgnConfig;
    use crate::datasets::Dataset;
    use crate::layers::DendriticLayer;
    use ndarray::array;

    #[test]
    fn evaluate_does_not_learn() {
        let mut net = Dgn::new(2, &DgnConfig::default()).unwrap();
        let data = vec![(vec![1.0, 2.0], 1.0), (vec![-1.0, 0.5], -2.0)];
        let first = evaluate(&mut net, &data).unwrap();
        let second = evaluate(&mut net, &data).unwrap();
        assert_eq!(first, second);
        // zero weights predict 0
        assert_eq!(first.mean_loss, (0.5 + 2.0) / 2.0);
        assert_eq!(first.accuracy, None);
    }

    #[test]
    fn train_epoch_reports_pre_update_loss() {
        let layer = DendriticLayer::from_parts(array![[[1.0, 1.0]]], array![[[0.0, 0.0]]]);
        let mut net = Dgn::from_layers(1, vec![layer], LossKind::Square, 1.0, 0.01).unwrap();
        let stats = train_epoch(&mut net, &[(vec![2.0], 3.0)], 0.1).unwrap();
        assert_eq!(stats.mean_loss, 4.5);
        // after W = [0.3, 0.6] the prediction is 1.5
        let after = evaluate(&mut net, &[(vec![2.0], 3.0)]).unwrap();
        assert!((after.mean_loss - 1.125).abs() < 1e-12, "{after:?}");
    }

    #[test]
    fn fit_without_test_split() {
        let mut net = Dgn::new(1, &DgnConfig::default()).unwrap();
        let data = vec![(vec![0.5], 1.0), (vec![-0.5], -1.0)];
        let reports = fit(&mut net, &data, &[], &TrainConfig::default()).unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.test.is_none()));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let mut net = Dgn::new(2, &DgnConfig::default()).unwrap();
        assert!(matches!(evaluate(&mut net, &[]), Err(DgnError::EmptyDataset)));
    }

    #[test]
    fn fit_reports_every_epoch() {
        let cfg = DgnConfig {
            loss: LossKind::Bernoulli,
            layer_sizes: vec![2, 1],
            num_branches: 4,
            ..DgnConfig::default()
        };
        let mut net = Dgn::new(1, &cfg).unwrap();
        let data: Dataset = (0..20)
            .map(|i| {
                let x = i as f64 / 10.0 - 1.0;
                (vec![x], if x > 0.0 { 1.0 } else { 0.0 })
            })
            .collect();
        let tc = TrainConfig {
            epochs: 2,
            learning_rate: 0.1,
        };
        let reports = fit(&mut net, &data, &data, &tc).unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].test, Some(reports[1].train));
        assert_eq!(reports[2].epoch, 2);
        let acc = reports[0].train.accuracy.unwrap();
        assert!((0.0..=1.0).contains(&acc));
        assert!((reports[0].train.mean_loss - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
