//! Error types for einbench.

use thiserror::Error;

/// Errors raised while configuring or running a benchmark.
///
/// Configuration errors (`InvalidCase`, `Unsupported`, `ArityMismatch`,
/// `Config`) are raised before any timing starts. Everything else aborts the
/// case in progress; no partial result is ever produced.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The benchmark case itself is malformed.
    #[error("invalid benchmark case: {reason}")]
    InvalidCase { reason: String },

    /// The selected backend cannot run the requested operation.
    #[error("operation {operation} is not supported by backend {backend}")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    /// Wrong number of operands passed to a contraction.
    #[error("{operation} takes {expected} operands, got {actual}")]
    ArityMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Bad value in the environment or on the command line.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The requested accelerator could not be opened.
    #[error("device {index} unavailable: {reason}")]
    DeviceUnavailable { index: usize, reason: String },

    /// Driver, compiler or launch failure on an opened device.
    #[error("device error: {reason}")]
    Device { reason: String },

    /// Host allocation failure.
    #[error("failed to allocate {bytes} bytes on the host")]
    Allocation { bytes: usize },

    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Wrong number of indices or labels provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// Contraction labels that do not describe a valid contraction.
    #[error("invalid contraction labels: {reason}")]
    InvalidLabels { reason: String },

    /// A backend's output strayed from the reference beyond tolerance.
    #[error("{name}: relative error {error:.3e} exceeds tolerance {tolerance:.1e}")]
    Verification {
        name: String,
        error: f64,
        tolerance: f64,
    },

    /// Writing a report line failed.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// ndarray rejected a shape for the data it was given.
    #[error("array layout error: {0}")]
    Layout(#[from] ndarray::ShapeError),

    /// Encoding a report row failed.
    #[error("failed to encode report row: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid permutation.
    #[error("invalid permutation {perm:?} for tensor with {ndim} dimensions")]
    InvalidPermutation { perm: Vec<usize>, ndim: usize },
}

impl BenchError {
    /// Whether this error was raised before any measurement could start.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidCase { .. }
                | Self::Unsupported { .. }
                | Self::ArityMismatch { .. }
                | Self::Config { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = BenchError> = std::result::Result<T, E>;
