//! Secondary CPU backend on ndarray.

use ndarray::{Array2, Array3, ArrayD, Axis, Zip};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::ThreadPool;

use crate::backend::{Backend, arity_mismatch};
use crate::case::BackendKind;
use crate::config::HarnessConfig;
use crate::error::{BenchError, Result};
use crate::ops::Operation;
use crate::random::{RandomNormal, sample_vec};
use crate::tensor::{DenseTensor, element_count, try_alloc};

/// Standard-normal `f32` operands in row-major ndarray storage.
///
/// GEMM goes through `Array2::dot`, which is matrixmultiply's own kernel and
/// ignores the thread setting. The star broadcast runs as a parallel `Zip`
/// inside a pool sized by the thread setting.
pub struct SecondaryCpuBackend {
    rng: StdRng,
    pool: ThreadPool,
}

impl SecondaryCpuBackend {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: &HarnessConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &HarnessConfig, rng: StdRng) -> Result<Self> {
        Ok(Self {
            rng,
            pool: config.thread_pool()?,
        })
    }
}

impl Backend for SecondaryCpuBackend {
    type Host = Array2<f32>;
    type Device = Array2<f32>;
    type Output = ArrayD<f32>;

    fn kind(&self) -> BackendKind {
        BackendKind::CpuSecondary
    }

    fn allocate_random_tensor(&mut self, n: usize) -> Result<Self::Host> {
        let data = sample_vec(element_count(&[n, n])?, &mut self.rng, f32::sample_normal)?;
        Ok(Array2::from_shape_vec((n, n), data)?)
    }

    fn host_from_tensor(&mut self, tensor: &DenseTensor<f32>) -> Result<Self::Host> {
        array_from_tensor(tensor)
    }

    fn to_device(&mut self, host: Self::Host) -> Result<Self::Device> {
        Ok(host)
    }

    fn contract(&mut self, op: Operation, operands: &[&Self::Device]) -> Result<Self::Output> {
        match (op, operands) {
            (Operation::PairwiseProduct, &[a, b]) => {
                check_inner(a.ncols(), b.nrows())?;
                Ok(a.dot(b).into_dyn())
            }
            (Operation::TripleStar, &[a, b, c]) => {
                self.pool.install(|| star(a, b, c)).map(|z| z.into_dyn())
            }
            _ => Err(arity_mismatch(op, operands.len())),
        }
    }

    fn to_host(&mut self, output: &Self::Output) -> Result<DenseTensor<f32>> {
        tensor_from_array(output)
    }
}

// z[j,k,l] = d[j,l] * b[k,l] with d = a . c^T
fn star(a: &Array2<f32>, b: &Array2<f32>, c: &Array2<f32>) -> Result<Array3<f32>> {
    let n = a.nrows();
    for x in [a, b, c] {
        if let Some(bad) = [x.nrows(), x.ncols()].into_iter().find(|&d| d != n) {
            return Err(BenchError::ShapeMismatch {
                expected: n,
                actual: bad,
            });
        }
    }
    let d = a.dot(&c.t());

    let mut z = zeros3(n)?;
    Zip::from(&mut z)
        .and_broadcast(d.view().insert_axis(Axis(1)))
        .and_broadcast(b.view().insert_axis(Axis(0)))
        .par_for_each(|z, &d, &b| *z = d * b);
    Ok(z)
}

fn zeros3(n: usize) -> Result<Array3<f32>> {
    let len = element_count(&[n, n, n])?;
    let mut data = try_alloc::<f32>(len)?;
    data.resize(len, 0.0);
    Ok(Array3::from_shape_vec((n, n, n), data)?)
}

fn check_inner(k: usize, kb: usize) -> Result<()> {
    if k != kb {
        return Err(BenchError::ShapeMismatch {
            expected: k,
            actual: kb,
        });
    }
    Ok(())
}

/// Copy a rank-2 tensor into an ndarray with the same logical indices.
pub fn array_from_tensor(tensor: &DenseTensor<f32>) -> Result<Array2<f32>> {
    match tensor.shape() {
        &[rows, cols] => Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
            tensor.data()[i + j * rows]
        })),
        other => Err(BenchError::WrongNumberOfIndices {
            expected: 2,
            actual: other.len(),
        }),
    }
}

/// Copy an ndarray of any rank into a column-major tensor.
pub fn tensor_from_array(array: &ArrayD<f32>) -> Result<DenseTensor<f32>> {
    DenseTensor::from_fn(array.shape(), |ix| array[ix])
}
