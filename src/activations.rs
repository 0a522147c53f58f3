//! Scalar transforms used by the Bernoulli variant: a numerically stable
//! sigmoid, its inverse, and clipping into the open unit interval.
use ndarray::Array1;

/// Sigmoid: 1 / (1 + exp(-x)), evaluated without overflow for large |x|.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Logit: ln(p / (1 - p)).
///
/// Computed as `ln(p) - ln_1p(-p)` rather than forming the quotient.
/// Callers keep `p` inside `(0, 1)`; the endpoints map to infinities.
pub fn logit(p: f64) -> f64 {
    p.ln() - (-p).ln_1p()
}

/// Clamp `x` into `[epsilon, 1 - epsilon]`.
pub fn clip(x: f64, epsilon: f64) -> f64 {
    x.clamp(epsilon, 1.0 - epsilon)
}

/// `clip(sigmoid(x))` applied element-wise.
pub fn clipped_sigmoid(x: &Array1<f64>, epsilon: f64) -> Array1<f64> {
    x.mapv(|v| clip(sigmoid(v), epsilon))
}

/// `logit` applied element-wise.
pub fn logit_vec(p: &Array1<f64>) -> Array1<f64> {
    p.mapv(logit)
}
