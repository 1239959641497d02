//! Accelerator context.
//!
//! With the `cuda` feature, [`Device`] owns a CUDA context, its default
//! stream and the NVRTC-compiled kernels. Without it, [`Device::open`]
//! always fails with `DeviceUnavailable` and no buffer can exist.
//!
//! Devices are opened lazily through a process-wide registry and live until
//! the process exits.

use std::sync::Arc;

use crate::error::Result;

#[cfg(feature = "cuda")]
mod cuda;
mod registry;
#[cfg(not(feature = "cuda"))]
mod unavailable;

#[cfg(feature = "cuda")]
pub use cuda::{Device, DeviceBuffer};
pub use registry::DeviceRegistry;
#[cfg(not(feature = "cuda"))]
pub use unavailable::{Device, DeviceBuffer};

static DEVICES: DeviceRegistry<Device> = DeviceRegistry::new();

/// Open device `index` on first use and return the shared handle.
pub fn ensure_ready(index: usize) -> Result<Arc<Device>> {
    DEVICES.ensure_ready(index, Device::open)
}
