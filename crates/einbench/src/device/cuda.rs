//! CUDA device through cudarc.

use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig, PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::tensor::{DenseTensor, element_count};

const KERNELS: &str = include_str!("kernels.cu");
const MATMUL_KERNEL: &str = "einbench_matmul_f32";
const STAR_KERNEL: &str = "einbench_star_scatter_f32";
const TILE: u32 = 16;

/// An opened CUDA device with its stream and kernels.
pub struct Device {
    index: usize,
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    _module: Arc<CudaModule>,
    matmul: CudaFunction,
    star_scatter: CudaFunction,
}

/// Column-major `f32` data resident on a device.
pub struct DeviceBuffer {
    data: CudaSlice<f32>,
    shape: Vec<usize>,
}

impl DeviceBuffer {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl Device {
    /// Create a context on ordinal `index` and compile the kernels.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` if no usable device sits at `index`, `Device` if
    /// the kernels fail to compile or load.
    pub fn open(index: usize) -> Result<Self> {
        // cudarc panics when the driver library cannot be loaded.
        let ctx = std::panic::catch_unwind(|| CudaContext::new(index))
            .map_err(|_| BenchError::DeviceUnavailable {
                index,
                reason: "CUDA driver library not found".to_string(),
            })?
            .map_err(|e| BenchError::DeviceUnavailable {
                index,
                reason: format!("{e:?}"),
            })?;
        let stream = ctx.default_stream();

        let ptx = compile_ptx(KERNELS).map_err(|e| device_error("compile kernels", e))?;
        let module = ctx
            .load_module(ptx)
            .map_err(|e| device_error("load kernel module", e))?;
        let matmul = module
            .load_function(MATMUL_KERNEL)
            .map_err(|e| device_error(MATMUL_KERNEL, e))?;
        let star_scatter = module
            .load_function(STAR_KERNEL)
            .map_err(|e| device_error(STAR_KERNEL, e))?;

        info!(index, "opened CUDA device");
        Ok(Self {
            index,
            _ctx: ctx,
            stream,
            _module: module,
            matmul,
            star_scatter,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Copy a host tensor to the device. Queued on the stream.
    pub fn upload(&self, host: &DenseTensor<f32>) -> Result<DeviceBuffer> {
        let data = self
            .stream
            .memcpy_stod(host.data())
            .map_err(|e| device_error("host to device copy", e))?;
        Ok(DeviceBuffer {
            data,
            shape: host.shape().to_vec(),
        })
    }

    /// `a(m, k) * b(k, n)`. Queued on the stream.
    pub fn matmul(&self, a: &DeviceBuffer, b: &DeviceBuffer) -> Result<DeviceBuffer> {
        let (m, k) = matrix_dims(a)?;
        let (kb, n) = matrix_dims(b)?;
        if k != kb {
            return Err(BenchError::ShapeMismatch {
                expected: k,
                actual: kb,
            });
        }
        let data = self.gemm(&a.data, &b.data, m, k, n, false)?;
        Ok(DeviceBuffer {
            data,
            shape: vec![m, n],
        })
    }

    /// `z[j,k,l] = sum_i a[j,i] * b[k,l] * c[l,i]`. Queued on the stream.
    pub fn star(&self, a: &DeviceBuffer, b: &DeviceBuffer, c: &DeviceBuffer) -> Result<DeviceBuffer> {
        let n = square_side(a)?;
        for t in [b, c] {
            let side = square_side(t)?;
            if side != n {
                return Err(BenchError::ShapeMismatch {
                    expected: n,
                    actual: side,
                });
            }
        }

        let d = self.gemm(&a.data, &c.data, n, n, n, true)?;
        let total = element_count(&[n, n, n])?;
        let mut z = self
            .stream
            .alloc_zeros::<f32>(total)
            .map_err(|e| device_error("allocate star output", e))?;
        let n_arg = to_i32(n)?;
        let cfg = LaunchConfig::for_num_elems(to_u32(total)?);
        let mut launch = self.stream.launch_builder(&self.star_scatter);
        launch.arg(&d);
        launch.arg(&b.data);
        launch.arg(&mut z);
        launch.arg(&n_arg);
        // SAFETY: argument list matches the kernel signature and every
        // buffer holds the element count the kernel indexes.
        unsafe { launch.launch(cfg) }.map_err(|e| device_error(STAR_KERNEL, e))?;

        Ok(DeviceBuffer {
            data: z,
            shape: vec![n, n, n],
        })
    }

    /// Block until all queued work on the stream has finished.
    pub fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| device_error("synchronize", e))
    }

    /// Copy a buffer back to a host tensor. Blocks on the stream.
    pub fn download(&self, buffer: &DeviceBuffer) -> Result<DenseTensor<f32>> {
        let data = self
            .stream
            .memcpy_dtov(&buffer.data)
            .map_err(|e| device_error("device to host copy", e))?;
        DenseTensor::from_vec(data, &buffer.shape)
    }

    fn gemm(
        &self,
        a: &CudaSlice<f32>,
        b: &CudaSlice<f32>,
        m: usize,
        k: usize,
        n: usize,
        transpose_b: bool,
    ) -> Result<CudaSlice<f32>> {
        debug!(m, k, n, transpose_b, "launching matmul");
        let mut c = self
            .stream
            .alloc_zeros::<f32>(element_count(&[m, n])?)
            .map_err(|e| device_error("allocate matmul output", e))?;
        let (m_arg, k_arg, n_arg) = (to_i32(m)?, to_i32(k)?, to_i32(n)?);
        let t_arg = i32::from(transpose_b);
        let cfg = LaunchConfig {
            grid_dim: (to_u32(m)?.div_ceil(TILE), to_u32(n)?.div_ceil(TILE), 1),
            block_dim: (TILE, TILE, 1),
            shared_mem_bytes: 0,
        };
        let mut launch = self.stream.launch_builder(&self.matmul);
        launch.arg(a);
        launch.arg(b);
        launch.arg(&mut c);
        launch.arg(&m_arg);
        launch.arg(&k_arg);
        launch.arg(&n_arg);
        launch.arg(&t_arg);
        // SAFETY: argument list matches the kernel signature; `a`, `b` and
        // `c` hold m*k, k*n and m*n elements.
        unsafe { launch.launch(cfg) }.map_err(|e| device_error(MATMUL_KERNEL, e))?;
        Ok(c)
    }
}

fn device_error(what: &str, e: impl std::fmt::Debug) -> BenchError {
    BenchError::Device {
        reason: format!("{what}: {e:?}"),
    }
}

fn matrix_dims(buffer: &DeviceBuffer) -> Result<(usize, usize)> {
    match buffer.shape() {
        &[r, c] => Ok((r, c)),
        other => Err(BenchError::WrongNumberOfIndices {
            expected: 2,
            actual: other.len(),
        }),
    }
}

fn square_side(buffer: &DeviceBuffer) -> Result<usize> {
    let (r, c) = matrix_dims(buffer)?;
    if r != c {
        return Err(BenchError::ShapeMismatch {
            expected: r,
            actual: c,
        });
    }
    Ok(r)
}

fn to_i32(x: usize) -> Result<i32> {
    i32::try_from(x).map_err(|_| BenchError::Device {
        reason: format!("dimension {x} exceeds kernel index range"),
    })
}

fn to_u32(x: usize) -> Result<u32> {
    u32::try_from(x).map_err(|_| BenchError::Device {
        reason: format!("launch size {x} exceeds grid range"),
    })
}
