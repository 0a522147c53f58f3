//! Dendritic layer: fixed gating hyperplanes plus the learned per-branch weights.
//!
//! Every neuron owns several dendritic branches. For a given example a branch
//! is *open* when the example's side information lies on the non-negative side
//! of that branch's hyperplane. The neuron's effective weight vector is the sum
//! of the weights of its open branches, and only open branches learn from the
//! example.
use crate::loss::LossKind;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView3, Axis};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Gate pattern `[neurons, branches]`: `true` where `H[n, b, :] · side_info >= 0`.
///
/// Panics if `side_info` does not match the last axis of `hyperplanes`.
pub fn gate_pattern(hyperplanes: ArrayView3<f64>, side_info: ArrayView1<f64>) -> Array2<bool> {
    assert_eq!(
        hyperplanes.len_of(Axis(2)),
        side_info.len(),
        "side information width does not match hyperplanes"
    );
    hyperplanes.map_axis(Axis(2), |plane| plane.dot(&side_info) >= 0.0)
}

/// Gate pattern as a 0/1 mask, so branch selection is a multiply and a sum.
fn gate_mask(gates: &Array2<bool>) -> Array2<f64> {
    gates.mapv(|open| if open { 1.0 } else { 0.0 })
}

/// One layer of a dendritic gated network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DendriticLayer {
    /// `[neurons, branches, side_info_len]`, frozen after construction.
    hyperplanes: Array3<f64>,
    /// `[neurons, branches, inputs + 1]`, the learned state.
    weights: Array3<f64>,
}

impl DendriticLayer {
    /// Random unit-norm hyperplanes and zero weights.
    ///
    /// `inputs` excludes the bias term; `side_info_len` includes it.
    pub fn new<R: Rng>(
        rng: &mut R,
        inputs: usize,
        neurons: usize,
        branches: usize,
        side_info_len: usize,
    ) -> Self {
        let mut hyperplanes = Array3::from_shape_simple_fn((neurons, branches, side_info_len), || {
            rng.sample::<f64, _>(StandardNormal)
        });
        for mut plane in hyperplanes.lanes_mut(Axis(2)) {
            let norm = plane.dot(&plane).sqrt();
            if norm > 0.0 {
                plane /= norm;
            }
        }
        let weights = Array3::zeros((neurons, branches, inputs + 1));
        Self { hyperplanes, weights }
    }

    /// Build a layer from explicit tensors. Shapes are checked by the network.
    pub fn from_parts(hyperplanes: Array3<f64>, weights: Array3<f64>) -> Self {
        Self { hyperplanes, weights }
    }

    pub fn hyperplanes(&self) -> &Array3<f64> {
        &self.hyperplanes
    }

    pub fn weights(&self) -> &Array3<f64> {
        &self.weights
    }

    pub fn neurons(&self) -> usize {
        self.weights.len_of(Axis(0))
    }

    pub fn branches(&self) -> usize {
        self.weights.len_of(Axis(1))
    }

    /// Width of the incoming activation, bias excluded.
    pub fn inputs(&self) -> usize {
        self.weights.len_of(Axis(2)) - 1
    }

    /// Gate pattern of this layer for one example.
    pub fn gates(&self, side_info: ArrayView1<f64>) -> Array2<bool> {
        gate_pattern(self.hyperplanes.view(), side_info)
    }

    /// Prepend the bias and apply the variant's pre-linear transform.
    fn biased_input(input: ArrayView1<f64>, loss: LossKind) -> Array1<f64> {
        let mut biased = Array1::zeros(input.len() + 1);
        biased[0] = loss.bias();
        biased.slice_mut(s![1..]).assign(&input);
        loss.pre_linear(biased)
    }

    /// Sum of the open branches' weights per neuron: `[neurons, inputs + 1]`.
    pub fn effective_weights(&self, gates: &Array2<bool>) -> Array2<f64> {
        let mask = gate_mask(gates).insert_axis(Axis(2));
        (&self.weights * &mask).sum_axis(Axis(1))
    }

    /// Biased, transformed input and the layer output, weights untouched.
    fn forward_parts(
        &self,
        input: ArrayView1<f64>,
        gates: &Array2<bool>,
        loss: LossKind,
        epsilon: f64,
    ) -> (Array1<f64>, Array1<f64>) {
        assert_eq!(input.len(), self.inputs(), "layer input width mismatch");
        assert_eq!(gates.dim(), (self.neurons(), self.branches()), "gate pattern shape mismatch");
        let x = Self::biased_input(input, loss);
        let raw = self.effective_weights(gates).dot(&x);
        (x, loss.post_linear(raw, epsilon))
    }

    /// Layer output for one example without learning.
    ///
    /// Panics on shape mismatches between `input`, `gates`, and the weights.
    pub fn forward(&self, input: ArrayView1<f64>, gates: &Array2<bool>, loss: LossKind, epsilon: f64) -> Array1<f64> {
        self.forward_parts(input, gates, loss, epsilon).1
    }

    /// Forward pass; when `update` is set, also applies the online update in
    /// place.
    ///
    /// The output is computed from the weights as they were before the update.
    /// `target` must be `Some` when `update` is true.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        input: ArrayView1<f64>,
        gates: &Array2<bool>,
        loss: LossKind,
        epsilon: f64,
        target: Option<f64>,
        learning_rate: f64,
        update: bool,
    ) -> Array1<f64> {
        let (x, output) = self.forward_parts(input, gates, loss, epsilon);
        if update {
            let target = target.expect("update requires a target");
            let factor = loss.gradient_factor(&output, target, epsilon);
            self.apply_update(&x, &factor, gates, learning_rate);
        }
        output
    }

    /// `W[n, b, :] -= lr * (factor[n] * x)` for every open branch `(n, b)`.
    fn apply_update(&mut self, x: &Array1<f64>, factor: &Array1<f64>, gates: &Array2<bool>, learning_rate: f64) {
        for ((n, b), &open) in gates.indexed_iter() {
            if open {
                let step = -learning_rate * factor[n];
                self.weights.slice_mut(s![n, b, ..]).scaled_add(step, x);
            }
        }
    }
}
