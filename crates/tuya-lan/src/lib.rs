//! tuya-lan — minimal local-network client for Tuya smart devices.
//!
//! Covers exactly one interaction: open a session to a device whose id, local
//! key and IP address are already known, write a set of data points, and
//! close the session. Protocol versions 3.1 through 3.5 are supported.
//!
//! ```no_run
//! # async fn demo() -> tuya_lan::Result<()> {
//! use tuya_lan::{Device, DeviceConfig};
//!
//! let config = DeviceConfig::new("bf0123456789abcdef", "0123456789abcdef", "192.168.1.40", "3.5")?;
//! let device = Device::new(config);
//! device.find().await?;
//! let mut session = device.connect().await?;
//! let mut dps = serde_json::Map::new();
//! dps.insert("20".into(), serde_json::Value::Bool(true));
//! session.set_multiple(&dps).await?;
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod crypto;
mod device;
mod error;
mod frame;

pub use device::{DEFAULT_PORT, Device, DeviceConfig, Session, Version};
pub use error::{Error, Result};
