//! claudelight — agent lifecycle states rendered as colors on Tuya smart lights.

pub mod config;
pub mod devices;
pub mod error;
pub mod hooks;
pub mod light;

pub use error::ClaudelightError;
