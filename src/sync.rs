//! Blocking wrapper around [`crate::Device`] for synchronous callers.
//!
//! Each wrapper owns a current-thread runtime and blocks on it, so it must not be
//! used from inside another tokio runtime.

use crate::device::{Device as AsyncDevice, DeviceBuilder};
use crate::error::{Result, TuyaError};
use crate::protocol::DeviceStatus;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

/// Blocking outlet handle.
pub struct Device {
    inner: AsyncDevice,
    runtime: Runtime,
}

impl Device {
    /// Create an outlet device with default port, timeout and device type.
    pub fn new<I, A, K>(id: I, address: A, local_key: K) -> Result<Self>
    where
        I: Into<String>,
        A: Into<String>,
        K: Into<Vec<u8>>,
    {
        Self::from_async(AsyncDevice::new(id, address, local_key)?)
    }

    /// Build from a configured [`DeviceBuilder`].
    pub fn from_builder(builder: DeviceBuilder) -> Result<Self> {
        Self::from_async(builder.build()?)
    }

    /// Wrap an existing async device. The lock is shared with `device`.
    pub fn from_async(device: AsyncDevice) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TuyaError::Transport(format!("failed to start runtime: {}", e)))?;
        Ok(Self {
            inner: device,
            runtime,
        })
    }

    /// The underlying async device.
    pub fn inner(&self) -> &AsyncDevice {
        &self.inner
    }

    pub fn status(&self) -> Result<DeviceStatus> {
        self.runtime.block_on(self.inner.status())
    }

    pub fn set_dps(&self, dps: Value) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.set_dps(dps))
    }

    pub fn set_value(&self, index: u32, value: Value) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.set_value(index, value))
    }

    pub fn set_state(&self, index: u32, on: bool) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.set_state(index, on))
    }

    pub fn turn_on(&self, index: u32) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.turn_on(index))
    }

    pub fn turn_off(&self, index: u32) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.turn_off(index))
    }

    pub fn set_timer(&self, seconds: u64) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.set_timer(seconds))
    }
}
