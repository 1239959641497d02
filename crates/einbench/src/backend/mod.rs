//! Backend adapters.
//!
//! A backend wraps one compute library behind the four steps the runner
//! times: allocate a random operand, move it to where the library computes,
//! contract, and (for devices) wait for completion.
//!
//! # Backends
//!
//! - `PrimaryCpuBackend`: the crate's dense tensors with faer GEMM
//! - `SecondaryCpuBackend`: ndarray
//! - `AcceleratedBackend`: CUDA (cargo feature `cuda`)

mod accelerated;
mod primary;
mod secondary;

pub use accelerated::AcceleratedBackend;
pub use primary::PrimaryCpuBackend;
pub use secondary::{SecondaryCpuBackend, array_from_tensor, tensor_from_array};

use crate::case::BackendKind;
use crate::error::{BenchError, Result};
use crate::ops::Operation;
use crate::tensor::DenseTensor;

/// One compute library, as seen by the runner.
pub trait Backend {
    /// Freshly allocated operand in host memory.
    type Host;
    /// Operand where the library computes.
    type Device;
    /// Contraction result, possibly still being computed.
    type Output;

    fn kind(&self) -> BackendKind;

    fn supports(&self, op: Operation) -> bool {
        Operation::ALL.contains(&op)
    }

    /// A random `n x n` operand.
    fn allocate_random_tensor(&mut self, n: usize) -> Result<Self::Host>;

    /// Import an existing host tensor, for cross-backend checks.
    fn host_from_tensor(&mut self, tensor: &DenseTensor<f32>) -> Result<Self::Host>;

    fn to_device(&mut self, host: Self::Host) -> Result<Self::Device>;

    /// Run `op` on `operands`. Device backends may return before the
    /// work has finished.
    ///
    /// # Errors
    ///
    /// `ArityMismatch` if the operand count differs from `op.arity()`.
    fn contract(&mut self, op: Operation, operands: &[&Self::Device]) -> Result<Self::Output>;

    /// Block until queued work has finished. No-op for host backends.
    fn synchronize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Copy an output back as a column-major tensor with the same logical
    /// indices.
    fn to_host(&mut self, output: &Self::Output) -> Result<DenseTensor<f32>>;
}

pub(crate) fn arity_mismatch(op: Operation, actual: usize) -> BenchError {
    BenchError::ArityMismatch {
        operation: op.display_name(),
        expected: op.arity(),
        actual,
    }
}
