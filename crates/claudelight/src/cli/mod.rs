//! CLI dispatch — state names and the hook setup action.

mod set_state;
mod setup_hooks;

use std::path::Path;

pub(super) use claudelight_lib::config::Config;
pub(super) use claudelight_lib::devices;
pub(super) use claudelight_lib::error::{ClaudelightError, Result};
pub(super) use claudelight_lib::hooks::{self, SETUP_ACTION};
pub(super) use claudelight_lib::light::{self, Palette, State, TuyaClient};

/// Prefix on every line this tool writes.
pub const LOG_PREFIX: &str = "[claudelight]";

/// Exit status for missing or inconsistent device configuration.
const EXIT_CONFIG: i32 = 1;

pub fn usage() -> String {
    let states: Vec<&str> = State::ALL.iter().map(|s| s.name()).collect();
    format!(
        "Usage: claude-light <{}|{SETUP_ACTION}>",
        states.join("|")
    )
}

pub fn print_usage() {
    eprintln!("{LOG_PREFIX} {}", usage());
}

/// Run an action and map the outcome to an exit status.
///
/// Only configuration errors produce a non-zero status; everything else is
/// reported and swallowed.
pub fn run(action: Option<&str>, config_path: Option<&Path>) -> i32 {
    let result = match action {
        Some(SETUP_ACTION) => setup_hooks::cmd_setup_hooks(),
        Some(name) => match name.parse::<State>() {
            Ok(state) => set_state::cmd_set_state(state, config_path),
            Err(_) => {
                print_usage();
                return 0;
            }
        },
        None => {
            print_usage();
            return 0;
        }
    };

    match result {
        Ok(()) => 0,
        Err(e @ ClaudelightError::Config(_)) => {
            eprintln!("{LOG_PREFIX} {e}");
            EXIT_CONFIG
        }
        Err(e) => {
            eprintln!("{LOG_PREFIX} {e}");
            0
        }
    }
}
