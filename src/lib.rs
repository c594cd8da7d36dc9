//! # Smartoutlet
//!
//! Local control of Tuya v3.1 smart outlets using the device's local key,
//! without cloud dependencies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartoutlet::Device;
//!
//! # async fn run() -> smartoutlet::error::Result<()> {
//! let device = Device::new("DEVICE_ID", "192.168.1.50", "0123456789abcdef")?;
//! device.turn_on(1).await?;
//! let status = device.status().await?;
//! println!("switch 1 on: {:?}", status.is_on(1));
//! # Ok(())
//! # }
//! ```
//!
#[macro_use]
mod macros;
pub mod codec;
pub mod crypto;
pub mod device;
pub mod error;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use device::{Device, DeviceBuilder, TimerSlot};
pub use error::TuyaError;
pub use protocol::{CommandKind, CommandType, DeviceStatus, ReplyEncoding};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
