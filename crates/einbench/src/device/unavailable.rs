//! Stand-in used when the crate is built without the `cuda` feature.

use crate::error::{BenchError, Result};
use crate::tensor::DenseTensor;

/// No device can be opened in this build.
#[derive(Debug)]
pub enum Device {}

/// No device memory can exist in this build.
#[derive(Debug)]
pub enum DeviceBuffer {}

impl Device {
    pub fn open(index: usize) -> Result<Self> {
        Err(BenchError::DeviceUnavailable {
            index,
            reason: "built without the `cuda` feature".to_string(),
        })
    }

    pub fn index(&self) -> usize {
        match *self {}
    }

    pub fn upload(&self, _host: &DenseTensor<f32>) -> Result<DeviceBuffer> {
        match *self {}
    }

    pub fn matmul(&self, _a: &DeviceBuffer, _b: &DeviceBuffer) -> Result<DeviceBuffer> {
        match *self {}
    }

    pub fn star(
        &self,
        _a: &DeviceBuffer,
        _b: &DeviceBuffer,
        _c: &DeviceBuffer,
    ) -> Result<DeviceBuffer> {
        match *self {}
    }

    pub fn synchronize(&self) -> Result<()> {
        match *self {}
    }

    pub fn download(&self, _buffer: &DeviceBuffer) -> Result<DenseTensor<f32>> {
        match *self {}
    }
}

impl DeviceBuffer {
    pub fn shape(&self) -> &[usize] {
        match *self {}
    }
}
