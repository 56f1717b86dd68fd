//! Device client seam — trait pair + scripted mock.

use std::fmt;

use async_trait::async_trait;

use super::palette::LightCommand;
use crate::devices::DeviceDescriptor;

// ── Error type ──

/// Per-device communication errors.
///
/// String payloads carry the underlying library's message.
#[derive(Debug)]
pub enum DeviceError {
    /// Credentials or address the client cannot use.
    InvalidDescriptor(String),
    NotFound(String),
    Connect(String),
    Command(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InvalidDescriptor(e) => write!(f, "Invalid device settings: {e}"),
            DeviceError::NotFound(e) => write!(f, "Device not found: {e}"),
            DeviceError::Connect(e) => write!(f, "Connection failed: {e}"),
            DeviceError::Command(e) => write!(f, "Command failed: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Traits ──

/// Locates devices and opens sessions to them.
#[async_trait]
pub trait LightClient: Send + Sync {
    /// Confirm the device is reachable by its descriptor.
    async fn find(&self, device: &DeviceDescriptor) -> Result<()>;
    /// Open an exclusively owned session.
    async fn connect(&self, device: &DeviceDescriptor) -> Result<Box<dyn LightSession>>;
}

/// An open device session. Dropping it releases the underlying connection.
#[async_trait]
pub trait LightSession: Send {
    async fn set(&mut self, command: &LightCommand) -> Result<()>;
    async fn close(self: Box<Self>);
}

// ── Mock client for testing ──

/// Scripted in-memory client for unit and integration tests.
///
/// Always compiled, hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// How the device at a given IP behaves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Behavior {
        Succeed,
        FailFind,
        FailConnect,
        FailCommand,
        /// `connect` never completes.
        HangConnect,
        /// `set` never completes.
        HangCommand,
    }

    /// Recorded client/session activity.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Find(String),
        Connect(String),
        /// `(ip, color code)`
        Set(String, String),
        Close(String),
        /// Session dropped (always follows `Close`, or stands alone on timeout).
        Released(String),
    }

    /// Devices default to [`Behavior::Succeed`] unless scripted otherwise.
    #[derive(Default)]
    pub struct MockClient {
        behaviors: HashMap<String, Behavior>,
        pub events: Arc<Mutex<Vec<Event>>>,
    }

    impl MockClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the behavior of the device at `ip`.
        pub fn with(mut self, ip: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(ip.to_string(), behavior);
            self
        }

        /// Snapshot of recorded events.
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        /// Recorded events for one device, in order.
        pub fn events_for(&self, ip: &str) -> Vec<Event> {
            self.events()
                .into_iter()
                .filter(|e| match e {
                    Event::Find(i)
                    | Event::Connect(i)
                    | Event::Set(i, _)
                    | Event::Close(i)
                    | Event::Released(i) => i == ip,
                })
                .collect()
        }

        fn behavior(&self, ip: &str) -> Behavior {
            self.behaviors.get(ip).copied().unwrap_or(Behavior::Succeed)
        }

        fn record(&self, event: Event) {
            record(&self.events, event);
        }
    }

    fn record(events: &Mutex<Vec<Event>>, event: Event) {
        if let Ok(mut e) = events.lock() {
            e.push(event);
        }
    }

    #[async_trait]
    impl LightClient for MockClient {
        async fn find(&self, device: &DeviceDescriptor) -> Result<()> {
            self.record(Event::Find(device.ip.clone()));
            match self.behavior(&device.ip) {
                Behavior::FailFind => Err(DeviceError::NotFound("no such device".into())),
                _ => Ok(()),
            }
        }

        async fn connect(&self, device: &DeviceDescriptor) -> Result<Box<dyn LightSession>> {
            self.record(Event::Connect(device.ip.clone()));
            let behavior = self.behavior(&device.ip);
            match behavior {
                Behavior::FailConnect => Err(DeviceError::Connect("connection refused".into())),
                Behavior::HangConnect => std::future::pending().await,
                _ => {
                    let session: Box<dyn LightSession> = Box::new(MockSession {
                        ip: device.ip.clone(),
                        behavior,
                        events: Arc::clone(&self.events),
                    });
                    Ok(session)
                }
            }
        }
    }

    pub struct MockSession {
        ip: String,
        behavior: Behavior,
        events: Arc<Mutex<Vec<Event>>>,
    }

    #[async_trait]
    impl LightSession for MockSession {
        async fn set(&mut self, command: &LightCommand) -> Result<()> {
            match self.behavior {
                Behavior::FailCommand => Err(DeviceError::Command("device returned error code 1".into())),
                Behavior::HangCommand => std::future::pending().await,
                _ => {
                    record(&self.events, Event::Set(self.ip.clone(), command.color.to_string()));
                    Ok(())
                }
            }
        }

        async fn close(self: Box<Self>) {
            record(&self.events, Event::Close(self.ip.clone()));
        }
    }

    impl Drop for MockSession {
        fn drop(&mut self) {
            record(&self.events, Event::Released(self.ip.clone()));
        }
    }
}
