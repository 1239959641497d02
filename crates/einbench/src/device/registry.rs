//! Lazily initialized, process-wide device handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::info;

use crate::error::{BenchError, Result};

/// Map from device ordinal to a shared, initialized device.
///
/// Each index is initialized at most once; later calls return the same
/// handle. A failed initialization is not remembered, and a failure for
/// one index never falls back to another.
pub struct DeviceRegistry<D> {
    devices: OnceLock<Mutex<HashMap<usize, Arc<D>>>>,
}

impl<D> DeviceRegistry<D> {
    pub const fn new() -> Self {
        Self {
            devices: OnceLock::new(),
        }
    }

    /// Return the device at `index`, running `init` if it is not ready yet.
    ///
    /// The registry lock is held across `init`, so concurrent callers for
    /// the same index wait instead of initializing twice.
    pub fn ensure_ready<F>(&self, index: usize, init: F) -> Result<Arc<D>>
    where
        F: FnOnce(usize) -> Result<D>,
    {
        let mut devices = self.lock()?;
        if let Some(device) = devices.get(&index) {
            return Ok(Arc::clone(device));
        }
        let device = Arc::new(init(index)?);
        info!(index, "device ready");
        devices.insert(index, Arc::clone(&device));
        Ok(device)
    }

    pub fn is_ready(&self, index: usize) -> bool {
        self.lock().is_ok_and(|devices| devices.contains_key(&index))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<usize, Arc<D>>>> {
        self.devices
            .get_or_init(Default::default)
            .lock()
            .map_err(|_| BenchError::Device {
                reason: "device registry lock poisoned".to_string(),
            })
    }
}

impl<D> Default for DeviceRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
