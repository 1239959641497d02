//! Primary CPU backend: dense tensors contracted through faer.

use faer::Par;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::ThreadPool;

use crate::backend::{Backend, arity_mismatch};
use crate::case::BackendKind;
use crate::config::HarnessConfig;
use crate::contract::{contract_gemm, star_contract};
use crate::error::Result;
use crate::ops::Operation;
use crate::tensor::DenseTensor;

/// Uniform `[0, 1)` operands; products reduced to a single faer GEMM.
pub struct PrimaryCpuBackend {
    rng: StdRng,
    par: Par,
    pool: ThreadPool,
}

impl PrimaryCpuBackend {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic operands, for tests.
    pub fn with_seed(config: &HarnessConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &HarnessConfig, rng: StdRng) -> Result<Self> {
        Ok(Self {
            rng,
            par: config.par(),
            pool: config.thread_pool()?,
        })
    }
}

impl Backend for PrimaryCpuBackend {
    type Host = DenseTensor<f32>;
    type Device = DenseTensor<f32>;
    type Output = DenseTensor<f32>;

    fn kind(&self) -> BackendKind {
        BackendKind::CpuPrimary
    }

    fn allocate_random_tensor(&mut self, n: usize) -> Result<Self::Host> {
        DenseTensor::random_with_rng(&[n, n], &mut self.rng)
    }

    fn host_from_tensor(&mut self, tensor: &DenseTensor<f32>) -> Result<Self::Host> {
        Ok(tensor.clone())
    }

    fn to_device(&mut self, host: Self::Host) -> Result<Self::Device> {
        Ok(host)
    }

    fn contract(&mut self, op: Operation, operands: &[&Self::Device]) -> Result<Self::Output> {
        let par = self.par;
        match (op, operands) {
            // ij,jk->ik
            (Operation::PairwiseProduct, &[a, b]) => {
                self.pool.install(|| contract_gemm(a, &[1, -1], b, &[-1, 2], par))
            }
            (Operation::TripleStar, &[a, b, c]) => {
                self.pool.install(|| star_contract(a, b, c, par))
            }
            _ => Err(arity_mismatch(op, operands.len())),
        }
    }

    fn to_host(&mut self, output: &Self::Output) -> Result<DenseTensor<f32>> {
        Ok(output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{contract_naive, star_naive};
    use crate::error::BenchError;

    fn backend() -> PrimaryCpuBackend {
        PrimaryCpuBackend::with_seed(&HarnessConfig::default().with_threads(2), 7).unwrap()
    }

    #[test]
    fn test_operands_are_uniform() {
        let mut b = backend();
        let t = b.allocate_random_tensor(20).unwrap();
        assert_eq!(t.shape(), &[20, 20]);
        assert!(t.data().iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn test_matmul() {
        let mut b = backend();
        let x = b.allocate_random_tensor(12).unwrap();
        let y = b.allocate_random_tensor(12).unwrap();
        let out = b.contract(Operation::PairwiseProduct, &[&x, &y]).unwrap();
        let want = contract_naive(&x, &[1, -1], &y, &[-1, 2]).unwrap();
        assert!(out.max_relative_error(&want).unwrap() < 1e-5);
    }

    #[test]
    fn test_star() {
        let mut b = backend();
        let x = b.allocate_random_tensor(6).unwrap();
        let out = b.contract(Operation::TripleStar, &[&x, &x, &x]).unwrap();
        assert_eq!(out.shape(), &[6, 6, 6]);
        let want = star_naive(&x, &x, &x).unwrap();
        assert!(out.max_relative_error(&want).unwrap() < 1e-5);
    }

    #[test]
    fn test_wrong_arity() {
        let mut b = backend();
        let x = b.allocate_random_tensor(4).unwrap();
        let err = b.contract(Operation::TripleStar, &[&x, &x]).unwrap_err();
        assert!(matches!(err, BenchError::ArityMismatch { .. }));
    }
}
