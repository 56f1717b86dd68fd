//! Unified error type for the claudelight-lib crate.
//!
//! [`ClaudelightError`] wraps the light-seam error (`DeviceError`) plus the
//! domain error kinds (`Config`, `Settings`, `State`, `Color`). `From` impls
//! allow `?` to propagate across module boundaries.

use std::fmt;

use crate::light::DeviceError;

/// Unified error type for claudelight-lib operations.
#[derive(Debug)]
pub enum ClaudelightError {
    /// Missing or inconsistent device configuration.
    Config(String),
    /// Host settings file unreadable, malformed, or of an unexpected shape.
    Settings(String),
    /// A state name outside the known set.
    State(String),
    /// Color code parsing error.
    Color(String),
    /// Device communication error.
    Device(DeviceError),
    /// Standard I/O error (settings file read/write, runtime setup).
    Io(std::io::Error),
    /// JSON serialization error.
    Json(serde_json::Error),
}

impl fmt::Display for ClaudelightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaudelightError::Config(e) => write!(f, "{e}"),
            ClaudelightError::Settings(e) => write!(f, "Settings error: {e}"),
            ClaudelightError::State(s) => write!(f, "Unknown state: {s}"),
            ClaudelightError::Color(e) => write!(f, "Color error: {e}"),
            ClaudelightError::Device(e) => write!(f, "{e}"),
            ClaudelightError::Io(e) => write!(f, "I/O error: {e}"),
            ClaudelightError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for ClaudelightError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClaudelightError::Device(e) => Some(e),
            ClaudelightError::Io(e) => Some(e),
            ClaudelightError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for ClaudelightError {
    fn from(e: DeviceError) -> Self {
        ClaudelightError::Device(e)
    }
}

impl From<std::io::Error> for ClaudelightError {
    fn from(e: std::io::Error) -> Self {
        ClaudelightError::Io(e)
    }
}

impl From<serde_json::Error> for ClaudelightError {
    fn from(e: serde_json::Error) -> Self {
        ClaudelightError::Json(e)
    }
}

/// Crate-level Result alias using [`ClaudelightError`].
pub type Result<T> = std::result::Result<T, ClaudelightError>;
