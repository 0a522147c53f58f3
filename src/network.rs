//! Dendritic Gated Network: a stack of dendritic layers trained online.
use crate::config::{validate_bias_magnitude, validate_epsilon, DgnConfig};
use crate::error::{DgnError, Result};
use crate::layers::DendriticLayer;
use crate::loss::LossKind;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{aview1, s, Array1, Array3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Dendritic Gated Network
///
/// Gates of every layer are driven by the same side information, the raw
/// input with `hyperplane_bias_magnitude` prepended, so gating never depends
/// on intermediate activations. Each layer's output, with the bias prepended,
/// is the next layer's input; the single neuron of the last layer is the
/// prediction.
#[derive(Debug, Clone)]
pub struct Dgn {
    layers: Vec<DendriticLayer>,
    input_size: usize,
    loss: LossKind,
    hyperplane_bias_magnitude: f64,
    epsilon: f64,
}

impl Dgn {
    /// Create a network with seeded random hyperplanes and zero weights.
    pub fn new(input_size: usize, config: &DgnConfig) -> Result<Self> {
        config.validate()?;
        if input_size == 0 {
            return Err(DgnError::InvalidConfig("input_size must be positive".into()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut layers = Vec::with_capacity(config.layer_sizes.len());
        let mut prev_size = input_size;
        for &size in &config.layer_sizes {
            layers.push(DendriticLayer::new(
                &mut rng,
                prev_size,
                size,
                config.num_branches,
                input_size + 1,
            ));
            prev_size = size;
        }
        debug!(
            input_size,
            layers = ?config.layer_sizes,
            branches = config.num_branches,
            loss = ?config.loss,
            seed = config.seed,
            "initialized dendritic gated network"
        );
        Ok(Self {
            layers,
            input_size,
            loss: config.loss,
            hyperplane_bias_magnitude: config.hyperplane_bias_magnitude,
            epsilon: config.epsilon,
        })
    }

    /// Assemble a network from explicit layers, checking that the stack is
    /// consistent: hyperplanes span `input_size + 1`, each layer's weights
    /// take the previous layer's width plus the bias, and the last layer has
    /// one neuron. Hyperparameters get the same checks as [`DgnConfig::validate`].
    pub fn from_layers(
        input_size: usize,
        layers: Vec<DendriticLayer>,
        loss: LossKind,
        hyperplane_bias_magnitude: f64,
        epsilon: f64,
    ) -> Result<Self> {
        if input_size == 0 {
            return Err(DgnError::InvalidConfig("input_size must be positive".into()));
        }
        validate_epsilon(epsilon)?;
        validate_bias_magnitude(hyperplane_bias_magnitude)?;
        let last = layers.last().ok_or(DgnError::EmptyNetwork)?;
        if last.neurons() != 1 {
            return Err(DgnError::TerminalWidth(last.neurons()));
        }
        let mut prev_size = input_size;
        for (i, layer) in layers.iter().enumerate() {
            let h = layer.hyperplanes().dim();
            let w = layer.weights().dim();
            if w.0 == 0 || w.1 == 0 {
                return Err(DgnError::InvalidConfig(format!(
                    "layer {i} needs at least one neuron and one branch, got {} neurons and {} branches",
                    w.0, w.1
                )));
            }
            let expected_h = [w.0, w.1, input_size + 1];
            if [h.0, h.1, h.2] != expected_h {
                return Err(DgnError::LayerShape {
                    layer: i,
                    tensor: "hyperplanes",
                    expected: expected_h,
                    actual: [h.0, h.1, h.2],
                });
            }
            let expected_w = [w.0, w.1, prev_size + 1];
            if w.2 != prev_size + 1 {
                return Err(DgnError::LayerShape {
                    layer: i,
                    tensor: "weights",
                    expected: expected_w,
                    actual: [w.0, w.1, w.2],
                });
            }
            prev_size = w.0;
        }
        Ok(Self {
            layers,
            input_size,
            loss,
            hyperplane_bias_magnitude,
            epsilon,
        })
    }

    pub fn layers(&self) -> &[DendriticLayer] {
        &self.layers
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn loss_kind(&self) -> LossKind {
        self.loss
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// `[hyperplane_bias_magnitude] ++ input`
    pub fn side_info(&self, input: &[f64]) -> Array1<f64> {
        let mut side = Array1::zeros(input.len() + 1);
        side[0] = self.hyperplane_bias_magnitude;
        side.slice_mut(s![1..]).assign(&aview1(input));
        side
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_size {
            return Err(DgnError::InputDimension {
                expected: self.input_size,
                actual: input.len(),
            });
        }
        Ok(())
    }

    /// Forward pass for one example, optionally followed by the online update
    /// of every layer.
    ///
    /// Returns the prediction and, when a target is given, its loss. Each
    /// layer computes its output before its own weights are updated, and gates
    /// only depend on `input`, so the update of one layer never influences the
    /// gating or output of another within the same call.
    pub fn predict_and_maybe_update(
        &mut self,
        input: &[f64],
        target: Option<f64>,
        learning_rate: f64,
        update: bool,
    ) -> Result<(f64, Option<f64>)> {
        self.check_input(input)?;
        if update && target.is_none() {
            return Err(DgnError::MissingTarget);
        }
        let side = self.side_info(input);
        let mut current = self.loss.network_input(input, self.epsilon);
        for layer in &mut self.layers {
            let gates = layer.gates(side.view());
            current = layer.step(
                current.view(),
                &gates,
                self.loss,
                self.epsilon,
                target,
                learning_rate,
                update,
            );
        }
        let prediction = current[0];
        let loss = target.map(|t| self.loss.loss(prediction, t));
        Ok((prediction, loss))
    }

    /// Prediction for a single input, without touching the weights.
    pub fn predict(&self, input: &[f64]) -> Result<f64> {
        self.check_input(input)?;
        let side = self.side_info(input);
        let mut current = self.loss.network_input(input, self.epsilon);
        for layer in &self.layers {
            let gates = layer.gates(side.view());
            current = layer.forward(current.view(), &gates, self.loss, self.epsilon);
        }
        Ok(current[0])
    }

    /// Save model to .pere (gzipped JSON).
    pub fn save_pere(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dto = DgnDto::from_dgn(self);
        let json = serde_json::to_vec(&dto)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(&json)?;
        enc.finish()?;
        debug!(path = %path.display(), "saved model");
        Ok(())
    }

    /// Load model from .pere (gzipped JSON)
    pub fn load_pere(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut dec = GzDecoder::new(file);
        let mut buf = Vec::new();
        dec.read_to_end(&mut buf)?;
        let dto: DgnDto = serde_json::from_slice(&buf)?;
        let net = dto.into_dgn()?;
        debug!(path = %path.display(), %net, "loaded model");
        Ok(net)
    }
}

impl fmt::Display for Dgn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sizes = vec![self.input_size];
        sizes.extend(self.layers.iter().map(DendriticLayer::neurons));
        let branches: Vec<usize> = self.layers.iter().map(DendriticLayer::branches).collect();
        write!(f, "DGN({:?}): {:?}, branches {:?}", self.loss, sizes, branches)
    }
}

// ============ Persistence DTOs ============

#[derive(Debug, Serialize, Deserialize)]
struct LayerDto {
    hyperplanes: Array3<f64>, // [neurons][branches][input_size + 1]
    weights: Array3<f64>,     // [neurons][branches][inputs + 1]
}

#[derive(Debug, Serialize, Deserialize)]
struct DgnDto {
    input_size: usize,
    loss: LossKind,
    hyperplane_bias_magnitude: f64,
    epsilon: f64,
    layers: Vec<LayerDto>,
}

impl DgnDto {
    fn from_dgn(net: &Dgn) -> Self {
        // JSON has no NaN or infinity.
        let layers = net
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let mut weights = layer.weights().clone();
                let non_finite = weights.iter().filter(|w| !w.is_finite()).count();
                if non_finite > 0 {
                    warn!(layer = i, count = non_finite, "saving non-finite weights as zero");
                    weights.mapv_inplace(|w| if w.is_finite() { w } else { 0.0 });
                }
                LayerDto {
                    hyperplanes: layer.hyperplanes().clone(),
                    weights,
                }
            })
            .collect();
        Self {
            input_size: net.input_size,
            loss: net.loss,
            hyperplane_bias_magnitude: net.hyperplane_bias_magnitude,
            epsilon: net.epsilon,
            layers,
        }
    }

    fn into_dgn(self) -> Result<Dgn> {
        let layers = self
            .layers
            .into_iter()
            .map(|ld| DendriticLayer::from_parts(ld.hyperplanes, ld.weights))
            .collect();
        Dgn::from_layers(
            self.input_size,
            layers,
            self.loss,
            self.hyperplane_bias_magnitude,
            self.epsilon,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn single_neuron(loss: LossKind) -> Dgn {
        let layer = DendriticLayer::from_parts(array![[[1.0, 1.0]]], array![[[0.0, 0.0]]]);
        Dgn::from_layers(1, vec![layer], loss, 1.0, 0.01).unwrap()
    }

    #[test]
    fn worked_example() {
        let mut net = single_neuron(LossKind::Square);
        let (pred, loss) = net.predict_and_maybe_update(&[2.0], Some(3.0), 0.1, true).unwrap();
        assert_eq!(pred, 0.0);
        assert_eq!(loss, Some(4.5));
        let w = net.layers()[0].weights();
        assert!((w[[0, 0, 0]] - 0.3).abs() < 1e-12);
        assert!((w[[0, 0, 1]] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn side_info_prepends_bias_magnitude() {
        let layer = DendriticLayer::from_parts(Array3::zeros((1, 1, 3)), Array3::zeros((1, 1, 3)));
        let net = Dgn::from_layers(2, vec![layer], LossKind::Square, 2.5, 0.01).unwrap();
        assert_eq!(net.side_info(&[1.0, -1.0]), array![2.5, 1.0, -1.0]);
    }

    #[test]
    fn update_without_target_is_rejected() {
        let mut net = single_neuron(LossKind::Square);
        let err = net.predict_and_maybe_update(&[2.0], None, 0.1, true).unwrap_err();
        assert!(matches!(err, DgnError::MissingTarget));
        assert!(net.layers()[0].weights().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn wrong_input_width_is_rejected() {
        let mut net = single_neuron(LossKind::Square);
        let err = net.predict_and_maybe_update(&[1.0, 2.0], Some(0.0), 0.1, false).unwrap_err();
        assert!(matches!(err, DgnError::InputDimension { expected: 1, actual: 2 }));
        assert!(net.predict(&[]).is_err());
    }

    #[test]
    fn prediction_without_target_has_no_loss() {
        let mut net = single_neuron(LossKind::Bernoulli);
        let (pred, loss) = net.predict_and_maybe_update(&[0.3], None, 0.1, false).unwrap();
        assert_eq!(pred, 0.5);
        assert_eq!(loss, None);
    }

    #[test]
    fn stack_shape_errors() {
        let mk = |n: usize, b: usize, k: usize, d: usize| DendriticLayer::from_parts(Array3::zeros((n, b, d)), Array3::zeros((n, b, k)));
        assert!(matches!(
            Dgn::from_layers(2, vec![], LossKind::Square, 1.0, 0.01),
            Err(DgnError::EmptyNetwork)
        ));
        assert!(matches!(
            Dgn::from_layers(2, vec![mk(2, 3, 3, 3)], LossKind::Square, 1.0, 0.01),
            Err(DgnError::TerminalWidth(2))
        ));
        assert!(matches!(
            Dgn::from_layers(2, vec![mk(3, 2, 3, 3), mk(1, 2, 3, 3)], LossKind::Square, 1.0, 0.01),
            Err(DgnError::LayerShape { layer: 1, tensor: "weights", .. })
        ));
        assert!(matches!(
            Dgn::from_layers(2, vec![mk(1, 2, 3, 4)], LossKind::Square, 1.0, 0.01),
            Err(DgnError::LayerShape { layer: 0, tensor: "hyperplanes", .. })
        ));
        assert!(Dgn::from_layers(2, vec![mk(3, 2, 3, 3), mk(1, 2, 4, 3)], LossKind::Square, 1.0, 0.01).is_ok());
        assert!(Dgn::from_layers(2, vec![mk(1, 2, 3, 3)], LossKind::Square, 1.0, 0.5).is_err());
    }

    #[test]
    fn from_layers_checks_hyperparameters_like_config() {
        let mk = |n: usize, b: usize, k: usize, d: usize| DendriticLayer::from_parts(Array3::zeros((n, b, d)), Array3::zeros((n, b, k)));
        let invalid = |r: Result<Dgn>| matches!(r, Err(DgnError::InvalidConfig(_)));

        assert!(invalid(Dgn::from_layers(0, vec![mk(1, 2, 1, 1)], LossKind::Square, 1.0, 0.01)));
        assert!(invalid(Dgn::from_layers(2, vec![mk(1, 0, 3, 3)], LossKind::Square, 1.0, 0.01)));
        assert!(invalid(Dgn::from_layers(2, vec![mk(0, 2, 3, 3), mk(1, 2, 1, 3)], LossKind::Square, 1.0, 0.01)));
        for magnitude in [f64::NAN, f64::INFINITY] {
            assert!(invalid(Dgn::from_layers(2, vec![mk(1, 2, 3, 3)], LossKind::Square, magnitude, 0.01)));
        }
    }

    #[test]
    fn new_respects_config() {
        let cfg = DgnConfig {
            layer_sizes: vec![3, 2, 1],
            num_branches: 4,
            ..DgnConfig::default()
        };
        let net = Dgn::new(5, &cfg).unwrap();
        let dims: Vec<_> = net.layers().iter().map(|l| l.weights().dim()).collect();
        assert_eq!(dims, vec![(3, 4, 6), (2, 4, 4), (1, 4, 3)]);
        assert!(net.layers().iter().all(|l| l.hyperplanes().dim().2 == 6));
        assert_eq!(net.to_string(), "DGN(Square): [5, 3, 2, 1], branches [4, 4, 4]");
    }

    #[test]
    fn predict_agrees_with_step_without_update() {
        let cfg = DgnConfig {
            layer_sizes: vec![3, 1],
            num_branches: 3,
            loss: LossKind::Bernoulli,
            seed: 3,
            ..DgnConfig::default()
        };
        let mut net = Dgn::new(2, &cfg).unwrap();
        for _ in 0..20 {
            net.predict_and_maybe_update(&[0.4, -1.2], Some(1.0), 0.1, true).unwrap();
        }
        let (p, _) = net.predict_and_maybe_update(&[0.4, -1.2], None, 0.1, false).unwrap();
        assert_eq!(net.predict(&[0.4, -1.2]).unwrap(), p);
        assert!(p >= 0.5);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("dgn.pere");
        let cfg = DgnConfig {
            layer_sizes: vec![2, 1],
            num_branches: 3,
            ..DgnConfig::default()
        };
        let mut net = Dgn::new(3, &cfg).unwrap();
        net.predict_and_maybe_update(&[1.0, 0.5, -0.5], Some(2.0), 0.05, true).unwrap();
        net.save_pere(&path).unwrap();

        let loaded = Dgn::load_pere(&path).unwrap();
        assert_eq!(loaded.layers(), net.layers());
        assert_eq!(loaded.loss_kind(), net.loss_kind());
        let x = [0.2, -0.3, 0.9];
        assert_eq!(loaded.predict(&x).unwrap(), net.predict(&x).unwrap());
    }
}
