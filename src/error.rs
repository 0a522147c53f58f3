//! Error type shared by the network, trainer, and dataset helpers.
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DgnError>;

/// Everything that can abort a call into the crate.
///
/// Apart from the I/O and parsing variants these are configuration bugs:
/// a network whose topology cannot produce a meaningful prediction, or a
/// training call missing the data it needs.
#[derive(Debug, Error)]
pub enum DgnError {
    /// The input vector does not match the width the network was built for.
    #[error("input dimension mismatch: expected {expected}, got {actual}")]
    InputDimension { expected: usize, actual: usize },

    /// A layer tensor has the wrong shape for its position in the stack.
    #[error("layer {layer}: {tensor} shape {actual:?} does not match expected {expected:?}")]
    LayerShape {
        layer: usize,
        tensor: &'static str,
        expected: [usize; 3],
        actual: [usize; 3],
    },

    /// The last layer must produce a single scalar.
    #[error("terminal layer must have exactly 1 neuron, found {0}")]
    TerminalWidth(usize),

    #[error("network has no layers")]
    EmptyNetwork,

    /// `update = true` was requested without a target.
    #[error("a target is required when update is requested")]
    MissingTarget,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("failed to parse {field:?} on row {row}: {value:?}")]
    Parse {
        row: usize,
        field: String,
        value: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
