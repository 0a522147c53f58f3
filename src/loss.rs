//! Loss families and the per-variant numeric policy.
use crate::activations::{clip, clipped_sigmoid, logit_vec, sigmoid};
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};

/// Squared error / 2
pub fn square_loss(prediction: f64, target: f64) -> f64 {
    (target - prediction).powi(2) / 2.0
}

/// Negative Bernoulli log-likelihood of `target` under `prediction`.
///
/// `prediction` must lie strictly inside `(0, 1)`; the network guarantees
/// this by clipping its outputs.
pub fn bernoulli_log_loss(prediction: f64, target: f64) -> f64 {
    -(target * prediction.ln() + (1.0 - target) * (-prediction).ln_1p())
}

/// Which loss a network is trained on.
///
/// The two variants share the whole layer and network loop and differ only
/// in the bias constant, the transforms around the linear combination, the
/// gradient mask, and the loss formula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Regression: linear activations, squared error.
    #[default]
    Square,
    /// Binary classification: activations are probabilities, log loss.
    Bernoulli,
}

impl LossKind {
    /// Constant prepended to every layer input.
    pub fn bias(self) -> f64 {
        match self {
            LossKind::Square => 1.0,
            LossKind::Bernoulli => sigmoid(1.0),
        }
    }

    /// Transform applied to the raw input before it enters the first layer.
    pub fn network_input(self, input: &[f64], epsilon: f64) -> Array1<f64> {
        match self {
            LossKind::Square => Array1::from(input.to_vec()),
            LossKind::Bernoulli => input.iter().map(|&x| clip(sigmoid(x), epsilon)).collect(),
        }
    }

    /// Transform applied to a biased layer input before the linear combination.
    pub fn pre_linear(self, biased: Array1<f64>) -> Array1<f64> {
        match self {
            LossKind::Square => biased,
            LossKind::Bernoulli => logit_vec(&biased),
        }
    }

    /// Transform applied to the linear combination to get the layer output.
    pub fn post_linear(self, raw: Array1<f64>, epsilon: f64) -> Array1<f64> {
        match self {
            LossKind::Square => raw,
            LossKind::Bernoulli => clipped_sigmoid(&raw, epsilon),
        }
    }

    /// Per-neuron scale of the update direction.
    ///
    /// For Bernoulli a neuron whose output sits on (or past) a clip boundary
    /// gets a zero factor: only `epsilon < output < 1 - epsilon` is active.
    pub fn gradient_factor(self, output: &Array1<f64>, target: f64, epsilon: f64) -> Array1<f64> {
        let mut factor = output.mapv(|o| o - target);
        if self == LossKind::Bernoulli {
            Zip::from(&mut factor).and(output).for_each(|f, &o| {
                if !(o > epsilon && o < 1.0 - epsilon) {
                    *f = 0.0;
                }
            });
        }
        factor
    }

    /// Loss of a single scalar prediction.
    pub fn loss(self, prediction: f64, target: f64) -> f64 {
        match self {
            LossKind::Square => square_loss(prediction, target),
            LossKind::Bernoulli => bernoulli_log_loss(prediction, target),
        }
    }
}
