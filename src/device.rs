//! Outlet session: status queries and state changes over the local protocol.
//! Every call is an independent connect/send/receive/close cycle.

use crate::crypto::KEY_LEN;
use crate::error::{Result, TuyaError};
use crate::protocol::{
    self, CommandKind, DEV_TYPE_DEFAULT, DeviceStatus, ReplyEncoding, ReplyOptions,
};
use crate::transport::{self, DEFAULT_PORT, DEFAULT_TIMEOUT};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// How `set_timer` picks the dps index holding the countdown timer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimerSlot {
    /// Sort the reported dps keys as strings and take the last one.
    ///
    /// This is a guess that happens to match common outlets; nothing in the
    /// protocol promises the timer sorts last.
    #[default]
    LastKey,
    /// Always use this dps index.
    Fixed(String),
}

impl TimerSlot {
    /// Resolve the timer index from a status reply.
    pub fn select(&self, status: &DeviceStatus) -> Result<String> {
        match self {
            TimerSlot::Fixed(index) => Ok(index.clone()),
            TimerSlot::LastKey => {
                let mut keys: Vec<&String> = status.dps.keys().collect();
                keys.sort();
                let slot = keys.last().ok_or(TuyaError::TimerSlotUnavailable)?;
                warn!("Guessing timer slot '{}' from dps keys {:?}", slot, keys);
                Ok(slot.to_string())
            }
        }
    }
}

/// Builder for [`Device`].
pub struct DeviceBuilder {
    id: String,
    local_key: Vec<u8>,
    address: String,
    dev_type: String,
    port: u16,
    connection_timeout: Duration,
    timer_slot: TimerSlot,
    reply: ReplyOptions,
}

impl DeviceBuilder {
    /// Start a builder for device `id`.
    ///
    /// The local key is taken as raw bytes and must be 16 of them. A `&str` key
    /// contributes its UTF-8 encoding, so a key with non-ASCII characters is longer
    /// than it looks and fails in [`build`](Self::build); pass such keys as bytes.
    pub fn new<I, K>(id: I, local_key: K) -> Self
    where
        I: Into<String>,
        K: Into<Vec<u8>>,
    {
        Self {
            id: id.into(),
            local_key: local_key.into(),
            address: String::new(),
            dev_type: DEV_TYPE_DEFAULT.to_string(),
            port: DEFAULT_PORT,
            connection_timeout: DEFAULT_TIMEOUT,
            timer_slot: TimerSlot::default(),
            reply: ReplyOptions::default(),
        }
    }

    pub fn address<A: Into<String>>(mut self, address: A) -> Self {
        self.address = address.into();
        self
    }

    /// Device type used to look up command templates.
    pub fn dev_type<S: Into<String>>(mut self, dev_type: S) -> Self {
        self.dev_type = dev_type.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn timer_slot(mut self, slot: TimerSlot) -> Self {
        self.timer_slot = slot;
        self
    }

    pub fn reply_encoding(mut self, encoding: ReplyEncoding) -> Self {
        self.reply.encoding = encoding;
        self
    }

    /// Check the signature fragment of encrypted replies.
    pub fn verify_signature(mut self, verify: bool) -> Self {
        self.reply.verify_signature = verify;
        self
    }

    /// Validate the key and create the device.
    pub fn build(self) -> Result<Device> {
        if self.local_key.len() != KEY_LEN {
            return Err(TuyaError::InvalidKey(self.local_key.len()));
        }

        Ok(Device {
            id: self.id,
            address: self.address,
            local_key: self.local_key,
            dev_type: self.dev_type,
            port: self.port,
            connection_timeout: self.connection_timeout,
            timer_slot: self.timer_slot,
            reply: self.reply,
            lock: Arc::new(Mutex::new(())),
        })
    }
}

/// A paired outlet reachable on the local network.
///
/// Clones share a lock, so operations issued through any clone run one at a time.
/// Separate `Device` values for the same outlet are not coordinated.
#[derive(Clone)]
pub struct Device {
    id: String,
    address: String,
    local_key: Vec<u8>,
    dev_type: String,
    port: u16,
    connection_timeout: Duration,
    timer_slot: TimerSlot,
    reply: ReplyOptions,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("dev_type", &self.dev_type)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Device {
    // -------------------------------------------------------------------------
    // Public API
    // -------------------------------------------------------------------------

    /// Create an outlet device with default port, timeout and device type.
    ///
    /// `local_key` is handled as in [`DeviceBuilder::new`].
    pub fn new<I, A, K>(id: I, address: A, local_key: K) -> Result<Self>
    where
        I: Into<String>,
        A: Into<String>,
        K: Into<Vec<u8>>,
    {
        DeviceBuilder::new(id, local_key).address(address).build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn dev_type(&self) -> &str {
        &self.dev_type
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Queries the current status of the device.
    pub async fn status(&self) -> Result<DeviceStatus> {
        let _guard = self.lock.lock().await;
        self.status_unlocked().await
    }

    /// Sets multiple Data Points (DPs) on the device.
    ///
    /// Returns the raw reply; call [`status`](Self::status) to confirm the change.
    pub async fn set_dps(&self, dps: Value) -> Result<Vec<u8>> {
        let _guard = self.lock.lock().await;
        self.set_dps_unlocked(dps).await
    }

    /// Sets a single Data Point (DP) value on the device.
    pub async fn set_value(&self, index: u32, value: Value) -> Result<Vec<u8>> {
        self.set_dps(single_dps(index.to_string(), value)).await
    }

    /// Switches `index` on or off.
    pub async fn set_state(&self, index: u32, on: bool) -> Result<Vec<u8>> {
        self.set_value(index, Value::Bool(on)).await
    }

    pub async fn turn_on(&self, index: u32) -> Result<Vec<u8>> {
        self.set_state(index, true).await
    }

    pub async fn turn_off(&self, index: u32) -> Result<Vec<u8>> {
        self.set_state(index, false).await
    }

    /// Starts the countdown timer with `seconds`.
    ///
    /// Queries status first to find the timer index, see [`TimerSlot`].
    pub async fn set_timer(&self, seconds: u64) -> Result<Vec<u8>> {
        let _guard = self.lock.lock().await;
        let status = self.status_unlocked().await?;
        let slot = self.timer_slot.select(&status)?;
        debug!("Setting timer on dps {} to {}s for {}", slot, seconds, self.id);
        self.set_dps_unlocked(single_dps(slot, Value::from(seconds)))
            .await
    }
}

// -------------------------------------------------------------------------
// Internal Communication Helpers
// -------------------------------------------------------------------------
impl Device {
    fn get_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    async fn status_unlocked(&self) -> Result<DeviceStatus> {
        let data = self.request(CommandKind::Status, None).await?;
        protocol::parse_status(&data, &self.local_key, &self.reply)
    }

    async fn set_dps_unlocked(&self, dps: Value) -> Result<Vec<u8>> {
        self.request(CommandKind::Set, Some(dps)).await
    }

    async fn request(&self, kind: CommandKind, data: Option<Value>) -> Result<Vec<u8>> {
        debug!("request: kind={}, data={:?}", kind, data);
        let frame = protocol::build_frame_for(
            &self.dev_type,
            kind,
            &self.id,
            &self.local_key,
            data,
            self.get_timestamp(),
        )?;
        let data =
            transport::exchange(&self.address, self.port, self.connection_timeout, &frame).await?;
        debug!("{} received {} bytes from {}", kind, data.len(), self.id);
        Ok(data)
    }
}

fn single_dps(index: String, value: Value) -> Value {
    let mut dps = Map::new();
    dps.insert(index, value);
    Value::Object(dps)
}
