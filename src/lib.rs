//! Dendritic Gated Networks: layered predictors whose neurons pick their
//! weights, per input, through fixed random hyperplane gates on dendritic
//! branches, and learn online one example at a time.
//!
//! - Square loss (regression) and Bernoulli log loss (binary classification)
//! - Per-example forward pass with optional in-place weight update
//! - Streaming trainer, CSV loading, standardization, train/test splits
//! - Gzipped JSON model persistence

pub mod activations;
pub mod config;
pub mod datasets;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod trainer;
pub mod utils;

pub use activations::{clip, logit, sigmoid};
pub use config::{DgnConfig, TrainConfig};
pub use datasets::{load_csv, standardize, train_test_split, Dataset, Standardizer};
pub use error::{DgnError, Result};
pub use layers::{gate_pattern, DendriticLayer};
pub use loss::{bernoulli_log_loss, square_loss, LossKind};
pub use metrics::{binary_accuracy, mean};
pub use network::Dgn;
pub use trainer::{evaluate, fit, train_epoch, EpochReport, EpochStats};
pub use utils::{generate_binary_data, generate_linear_data, print_model_summary, print_summary_table};
