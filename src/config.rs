//! Network and training hyperparameters.
use crate::error::{DgnError, Result};
use crate::loss::LossKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Topology and numeric options of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DgnConfig {
    /// Neurons per layer, input side first. The last entry must be 1.
    pub layer_sizes: Vec<usize>,
    /// Dendritic branches per neuron.
    pub num_branches: usize,
    pub loss: LossKind,
    /// Constant prepended to the raw input before the gate dot products.
    pub hyperplane_bias_magnitude: f64,
    /// Bernoulli clip margin.
    pub epsilon: f64,
    /// Seed for hyperplane initialization.
    pub seed: u64,
}

impl Default for DgnConfig {
    fn default() -> Self {
        Self {
            layer_sizes: vec![4, 4, 1],
            num_branches: 20,
            loss: LossKind::Square,
            hyperplane_bias_magnitude: 1.0,
            epsilon: 0.01,
            seed: 0,
        }
    }
}

impl DgnConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let last = *self.layer_sizes.last().ok_or(DgnError::EmptyNetwork)?;
        if last != 1 {
            return Err(DgnError::TerminalWidth(last));
        }
        if self.layer_sizes.contains(&0) {
            return Err(DgnError::InvalidConfig("layer sizes must be positive".into()));
        }
        if self.num_branches == 0 {
            return Err(DgnError::InvalidConfig("num_branches must be positive".into()));
        }
        validate_epsilon(self.epsilon)?;
        validate_bias_magnitude(self.hyperplane_bias_magnitude)
    }
}

pub(crate) fn validate_bias_magnitude(magnitude: f64) -> Result<()> {
    if magnitude.is_finite() {
        Ok(())
    } else {
        Err(DgnError::InvalidConfig(format!(
            "hyperplane_bias_magnitude must be finite, got {magnitude}"
        )))
    }
}

pub(crate) fn validate_epsilon(epsilon: f64) -> Result<()> {
    if epsilon > 0.0 && epsilon < 0.5 {
        Ok(())
    } else {
        Err(DgnError::InvalidConfig(format!("epsilon must lie in (0, 0.5), got {epsilon}")))
    }
}

/// Options for the streaming trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            learning_rate: 1e-3,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate.is_finite() && self.learning_rate > 0.0 {
            Ok(())
        } else {
            Err(DgnError::InvalidConfig(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )))
        }
    }
}
