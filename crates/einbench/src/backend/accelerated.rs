//! Accelerated backend on a CUDA device.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::backend::{Backend, arity_mismatch};
use crate::case::BackendKind;
use crate::device::{self, Device, DeviceBuffer};
use crate::error::Result;
use crate::ops::Operation;
use crate::tensor::DenseTensor;

/// Uniform host operands uploaded to device `index`.
///
/// The device is opened on first use, so constructing the backend never
/// fails; a missing device surfaces as `DeviceUnavailable` from the first
/// transfer.
pub struct AcceleratedBackend {
    index: usize,
    rng: StdRng,
    device: Option<Arc<Device>>,
}

impl AcceleratedBackend {
    pub fn new(index: usize) -> Self {
        Self::with_rng(index, StdRng::from_os_rng())
    }

    pub fn with_seed(index: usize, seed: u64) -> Self {
        Self::with_rng(index, StdRng::seed_from_u64(seed))
    }

    fn with_rng(index: usize, rng: StdRng) -> Self {
        Self {
            index,
            rng,
            device: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn device(&mut self) -> Result<Arc<Device>> {
        if let Some(device) = &self.device {
            return Ok(Arc::clone(device));
        }
        debug!(index = self.index, "opening device");
        let device = device::ensure_ready(self.index)?;
        self.device = Some(Arc::clone(&device));
        Ok(device)
    }
}

impl Backend for AcceleratedBackend {
    type Host = DenseTensor<f32>;
    type Device = DeviceBuffer;
    type Output = DeviceBuffer;

    fn kind(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn allocate_random_tensor(&mut self, n: usize) -> Result<Self::Host> {
        DenseTensor::random_with_rng(&[n, n], &mut self.rng)
    }

    fn host_from_tensor(&mut self, tensor: &DenseTensor<f32>) -> Result<Self::Host> {
        Ok(tensor.clone())
    }

    fn to_device(&mut self, host: Self::Host) -> Result<Self::Device> {
        self.device()?.upload(&host)
    }

    fn contract(&mut self, op: Operation, operands: &[&Self::Device]) -> Result<Self::Output> {
        let device = self.device()?;
        match (op, operands) {
            (Operation::PairwiseProduct, &[a, b]) => device.matmul(a, b),
            (Operation::TripleStar, &[a, b, c]) => device.star(a, b, c),
            _ => Err(arity_mismatch(op, operands.len())),
        }
    }

    fn synchronize(&mut self) -> Result<()> {
        self.device()?.synchronize()
    }

    fn to_host(&mut self, output: &Self::Output) -> Result<DenseTensor<f32>> {
        self.device()?.download(output)
    }
}
