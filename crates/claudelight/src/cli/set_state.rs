//! State commands — resolve devices and push the state's color to every light.

use std::path::Path;

use super::{Config, Palette, Result, State, TuyaClient, devices, light};

pub(super) fn cmd_set_state(state: State, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    log::debug!("{config:?}");

    let devices = devices::parse_devices(&config)?;
    let palette = Palette::from_config(&config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(light::set_light(
        &TuyaClient::default(),
        state.name(),
        &palette,
        &devices,
    ));
    Ok(())
}
