//! Device set parsing — comma-joined credential lists into descriptors.

use crate::config::Config;
use crate::error::{ClaudelightError, Result};

/// Protocol version assumed when none is configured for a device.
pub const DEFAULT_VERSION: &str = "3.5";

/// Credentials and address of one light.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub key: String,
    pub ip: String,
    pub version: String,
}

impl std::fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("ip", &self.ip)
            .field("version", &self.version)
            .finish()
    }
}

/// Split on commas, trim, drop empty segments.
pub fn split_list(s: &str) -> Vec<&str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Pair the Nth id with the Nth key, IP and (optional) version.
pub fn parse_devices(config: &Config) -> Result<Vec<DeviceDescriptor>> {
    let ids = split_list(&config.device_ids);
    let keys = split_list(&config.keys);
    let ips = split_list(&config.ips);
    let versions = split_list(&config.versions);

    if ids.is_empty() || keys.is_empty() || ips.is_empty() {
        return Err(ClaudelightError::Config(
            "Missing env vars. Set CLAUDELIGHT_DEVICE_ID, CLAUDELIGHT_KEY, and CLAUDELIGHT_IP. \
             For multiple devices, use comma-separated values."
                .into(),
        ));
    }

    if ids.len() != keys.len() || ids.len() != ips.len() {
        return Err(ClaudelightError::Config(format!(
            "CLAUDELIGHT_DEVICE_ID, CLAUDELIGHT_KEY, and CLAUDELIGHT_IP must have the same \
             number of comma-separated values (got {}, {}, {}).",
            ids.len(),
            keys.len(),
            ips.len()
        )));
    }

    Ok(ids
        .iter()
        .enumerate()
        .map(|(i, id)| DeviceDescriptor {
            id: id.to_string(),
            key: keys[i].to_string(),
            ip: ips[i].to_string(),
            version: versions.get(i).unwrap_or(&DEFAULT_VERSION).to_string(),
        })
        .collect())
}
