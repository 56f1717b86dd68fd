//! Production client backed by the `tuya-lan` protocol library.

use async_trait::async_trait;
use tuya_lan::{DEFAULT_PORT, Device, DeviceConfig, Session};

use super::client::{DeviceError, LightClient, LightSession, Result};
use super::palette::LightCommand;
use crate::devices::DeviceDescriptor;

/// Talks to devices on the local network.
#[derive(Debug, Clone)]
pub struct TuyaClient {
    port: u16,
}

impl Default for TuyaClient {
    fn default() -> Self {
        TuyaClient { port: DEFAULT_PORT }
    }
}

impl TuyaClient {
    /// Client that connects on a non-standard port.
    pub fn with_port(port: u16) -> Self {
        TuyaClient { port }
    }

    fn device(&self, descriptor: &DeviceDescriptor) -> Result<Device> {
        let config = DeviceConfig::new(
            &descriptor.id,
            &descriptor.key,
            &descriptor.ip,
            &descriptor.version,
        )
        .map_err(|e| DeviceError::InvalidDescriptor(e.to_string()))?;
        Ok(Device::new(config).with_port(self.port))
    }
}

#[async_trait]
impl LightClient for TuyaClient {
    async fn find(&self, device: &DeviceDescriptor) -> Result<()> {
        self.device(device)?
            .find()
            .await
            .map(|_| ())
            .map_err(|e| DeviceError::NotFound(e.to_string()))
    }

    async fn connect(&self, device: &DeviceDescriptor) -> Result<Box<dyn LightSession>> {
        let session = self
            .device(device)?
            .connect()
            .await
            .map_err(|e| DeviceError::Connect(e.to_string()))?;
        let session: Box<dyn LightSession> = Box::new(TuyaSession {
            ip: device.ip.clone(),
            session,
        });
        Ok(session)
    }
}

struct TuyaSession {
    ip: String,
    session: Session,
}

#[async_trait]
impl LightSession for TuyaSession {
    async fn set(&mut self, command: &LightCommand) -> Result<()> {
        self.session
            .set_multiple(&command.dps())
            .await
            .map_err(|e| DeviceError::Command(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        let ip = self.ip;
        if let Err(e) = self.session.disconnect().await {
            log::debug!("{ip}: disconnect: {e}");
        }
    }
}
