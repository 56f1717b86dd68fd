//! Light control — state palette, device client seam, concurrent driver.

mod client;
mod driver;
mod palette;
mod tuya;

pub use client::{DeviceError, LightClient, LightSession, mock};
pub use driver::{DEVICE_TIMEOUT, set_light, set_light_with_timeout};
pub use palette::{ColorCode, LightCommand, Palette, State};
pub use tuya::TuyaClient;
