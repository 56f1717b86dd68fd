//! Concurrent fire-and-forget light updates.
//!
//! Every device gets one attempt: find, connect, set, close. Each attempt
//! races a deadline; when the deadline wins the in-flight future is dropped,
//! which drops its session and closes the connection. Failures are logged per
//! device and never reach the caller.

use std::time::Duration;

use futures::future::join_all;

use super::client::{LightClient, Result};
use super::palette::{LightCommand, Palette, State};
use crate::devices::DeviceDescriptor;

/// Per-device deadline, measured from the start of the attempt.
pub const DEVICE_TIMEOUT: Duration = Duration::from_secs(3);

/// Set every device to the color for `state`.
///
/// An unknown state is logged and nothing is sent. Returns once every device
/// has succeeded, failed, or timed out.
pub async fn set_light(
    client: &dyn LightClient,
    state: &str,
    palette: &Palette,
    devices: &[DeviceDescriptor],
) {
    set_light_with_timeout(client, state, palette, devices, DEVICE_TIMEOUT).await;
}

/// [`set_light`] with an explicit per-device deadline.
pub async fn set_light_with_timeout(
    client: &dyn LightClient,
    state: &str,
    palette: &Palette,
    devices: &[DeviceDescriptor],
    timeout: Duration,
) {
    let state: State = match state.parse() {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    let command = LightCommand::new(palette.color(state));
    log::debug!("{state} -> {} on {} device(s)", command.color, devices.len());

    join_all(
        devices
            .iter()
            .map(|device| set_device(client, device, &command, timeout)),
    )
    .await;
}

async fn set_device(
    client: &dyn LightClient,
    device: &DeviceDescriptor,
    command: &LightCommand,
    timeout: Duration,
) {
    match tokio::time::timeout(timeout, apply(client, device, command)).await {
        Ok(Ok(())) => log::debug!("{}: set to {}", device.ip, command.color),
        Ok(Err(e)) => log::error!("{}: {e}", device.ip),
        Err(_) => log::warn!("{}: no response within {timeout:?}", device.ip),
    }
}

async fn apply(
    client: &dyn LightClient,
    device: &DeviceDescriptor,
    command: &LightCommand,
) -> Result<()> {
    client.find(device).await?;
    let mut session = client.connect(device).await?;
    let result = session.set(command).await;
    session.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::mock::{Behavior, Event, MockClient};
    use tokio::time::Instant;

    fn device(ip: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: format!("id-{ip}"),
            key: "0123456789abcdef".into(),
            ip: ip.into(),
            version: "3.5".into(),
        }
    }

    #[tokio::test]
    async fn successful_device_sequence() {
        let client = MockClient::new();
        set_light(&client, "thinking", &Palette::default(), &[device("10.0.0.1")]).await;
        assert_eq!(
            client.events_for("10.0.0.1"),
            vec![
                Event::Find("10.0.0.1".into()),
                Event::Connect("10.0.0.1".into()),
                Event::Set("10.0.0.1".into(), "011803e803e8".into()),
                Event::Close("10.0.0.1".into()),
                Event::Released("10.0.0.1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_state_touches_nothing() {
        let client = MockClient::new();
        set_light(&client, "sleeping", &Palette::default(), &[device("10.0.0.1")]).await;
        assert!(client.events().is_empty());
    }

    #[tokio::test]
    async fn find_failure_skips_connect() {
        let client = MockClient::new().with("10.0.0.1", Behavior::FailFind);
        set_light(&client, "done", &Palette::default(), &[device("10.0.0.1")]).await;
        assert_eq!(client.events_for("10.0.0.1"), vec![Event::Find("10.0.0.1".into())]);
    }

    #[tokio::test]
    async fn command_failure_still_closes_session() {
        let client = MockClient::new().with("10.0.0.1", Behavior::FailCommand);
        set_light(&client, "error", &Palette::default(), &[device("10.0.0.1")]).await;
        let events = client.events_for("10.0.0.1");
        assert!(events.contains(&Event::Close("10.0.0.1".into())));
        assert!(events.contains(&Event::Released("10.0.0.1".into())));
        assert!(!events.iter().any(|e| matches!(e, Event::Set(..))));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_device_released_at_deadline() {
        let client = MockClient::new().with("10.0.0.1", Behavior::HangCommand);
        let start = Instant::now();
        set_light(&client, "running", &Palette::default(), &[device("10.0.0.1")]).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= DEVICE_TIMEOUT, "returned early: {elapsed:?}");
        assert!(elapsed < DEVICE_TIMEOUT + Duration::from_millis(100), "overran: {elapsed:?}");

        let events = client.events_for("10.0.0.1");
        // Dropped without an orderly close.
        assert!(!events.contains(&Event::Close("10.0.0.1".into())));
        assert_eq!(events.last(), Some(&Event::Released("10.0.0.1".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_timeout_is_honored() {
        let client = MockClient::new().with("10.0.0.1", Behavior::HangConnect);
        let start = Instant::now();
        set_light_with_timeout(
            &client,
            "question",
            &Palette::default(),
            &[device("10.0.0.1")],
            Duration::from_millis(500),
        )
        .await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn devices_run_concurrently() {
        // Two hung devices share one deadline instead of stacking.
        let client = MockClient::new()
            .with("10.0.0.1", Behavior::HangCommand)
            .with("10.0.0.2", Behavior::HangConnect);
        let start = Instant::now();
        set_light(
            &client,
            "success",
            &Palette::default(),
            &[device("10.0.0.1"), device("10.0.0.2")],
        )
        .await;
        assert!(start.elapsed() < DEVICE_TIMEOUT * 2);
    }
}
