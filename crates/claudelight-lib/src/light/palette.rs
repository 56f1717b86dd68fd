//! Lifecycle states and their light colors.
//!
//! Colors use the Tuya `colour_data_v2` text format `HHHHSSSSVVVV`: hue
//! (0–360), saturation (0–1000) and value (0–1000), each as four lowercase hex
//! digits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::config::{Config, color_key};
use crate::error::{ClaudelightError, Result};

/// Data point: power switch.
pub const DP_POWER: &str = "20";
/// Data point: work mode.
pub const DP_MODE: &str = "21";
/// Data point: colour data.
pub const DP_COLOUR: &str = "24";
/// Work mode value for colour output.
pub const MODE_COLOUR: &str = "colour";

/// A named point in the agent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    Thinking,
    Running,
    Question,
    Success,
    Error,
    Done,
}

impl State {
    pub const ALL: [State; 6] = [
        State::Thinking,
        State::Running,
        State::Question,
        State::Success,
        State::Error,
        State::Done,
    ];

    pub fn name(self) -> &'static str {
        match self {
            State::Thinking => "thinking",
            State::Running => "running",
            State::Question => "question",
            State::Success => "success",
            State::Error => "error",
            State::Done => "done",
        }
    }

    /// Built-in color for this state.
    pub const fn default_color(self) -> ColorCode {
        match self {
            State::Thinking => ColorCode::hsv(280, 1000, 1000),
            State::Running => ColorCode::hsv(240, 1000, 1000),
            State::Question => ColorCode::hsv(50, 1000, 1000),
            State::Success => ColorCode::hsv(120, 1000, 1000),
            State::Error => ColorCode::hsv(0, 1000, 1000),
            State::Done => ColorCode::hsv(60, 1000, 400),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for State {
    type Err = ClaudelightError;

    fn from_str(s: &str) -> Result<Self> {
        State::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| ClaudelightError::State(s.to_string()))
    }
}

/// Hue/saturation/value color in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCode {
    hue: u16,
    saturation: u16,
    value: u16,
}

impl ColorCode {
    pub const fn hsv(hue: u16, saturation: u16, value: u16) -> Self {
        ColorCode {
            hue,
            saturation,
            value,
        }
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}{:04x}{:04x}",
            self.hue, self.saturation, self.value
        )
    }
}

impl FromStr for ColorCode {
    type Err = ClaudelightError;

    /// Parse a 12-digit `HHHHSSSSVVVV` hex string.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ClaudelightError::Color(format!(
                "Invalid color: {s} (use 12 hex digits HHHHSSSSVVVV)"
            )));
        }
        let field = |i: usize| u16::from_str_radix(&s[i..i + 4], 16).unwrap_or(u16::MAX);
        let (hue, saturation, value) = (field(0), field(4), field(8));
        if hue > 360 || saturation > 1000 || value > 1000 {
            return Err(ClaudelightError::Color(format!(
                "Color out of range: {s} (hue 0-360, saturation and value 0-1000)"
            )));
        }
        Ok(ColorCode::hsv(hue, saturation, value))
    }
}

/// Built-in colors with optional per-state overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    overrides: BTreeMap<State, ColorCode>,
}

impl Palette {
    /// Build a palette from configured overrides. An invalid override is
    /// logged and the state keeps its built-in color.
    pub fn from_config(config: &Config) -> Self {
        let mut overrides = BTreeMap::new();
        for (state, raw) in &config.colors {
            match raw.parse::<ColorCode>() {
                Ok(code) => {
                    overrides.insert(*state, code);
                }
                Err(e) => log::warn!("{}: {e}; using the default color", color_key(*state)),
            }
        }
        Palette { overrides }
    }

    pub fn color(&self, state: State) -> ColorCode {
        self.overrides
            .get(&state)
            .copied()
            .unwrap_or_else(|| state.default_color())
    }
}

/// The single command sent to a light: power on, colour mode, given color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCommand {
    pub color: ColorCode,
}

impl LightCommand {
    pub fn new(color: ColorCode) -> Self {
        LightCommand { color }
    }

    /// Render as Tuya data points.
    pub fn dps(&self) -> Map<String, Value> {
        let mut dps = Map::new();
        dps.insert(DP_POWER.into(), Value::Bool(true));
        dps.insert(DP_MODE.into(), Value::String(MODE_COLOUR.into()));
        dps.insert(DP_COLOUR.into(), Value::String(self.color.to_string()));
        dps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── State ──

    #[test]
    fn state_parses_every_name() {
        for state in State::ALL {
            assert_eq!(state.name().parse::<State>().unwrap(), state);
        }
    }

    #[test]
    fn state_parse_is_case_sensitive() {
        assert!("Thinking".parse::<State>().is_err());
        assert!("".parse::<State>().is_err());
    }

    #[test]
    fn unknown_state_message() {
        let err = "sleeping".parse::<State>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown state: sleeping");
    }

    #[test]
    fn default_table_encodings() {
        let expected = [
            (State::Thinking, "011803e803e8"),
            (State::Running, "00f003e803e8"),
            (State::Question, "003203e803e8"),
            (State::Success, "007803e803e8"),
            (State::Error, "000003e803e8"),
            (State::Done, "003c03e80190"),
        ];
        for (state, code) in expected {
            assert_eq!(state.default_color().to_string(), code, "{state}");
        }
    }

    // ── ColorCode ──

    #[test]
    fn color_parse_accepts_uppercase() {
        let c: ColorCode = "00F003E803E8".parse().unwrap();
        assert_eq!(c, ColorCode::hsv(240, 1000, 1000));
        assert_eq!(c.to_string(), "00f003e803e8");
    }

    #[test]
    fn color_parse_rejects_wrong_length() {
        assert!("03e803e8".parse::<ColorCode>().is_err());
        assert!("00f003e803e800".parse::<ColorCode>().is_err());
    }

    #[test]
    fn color_parse_rejects_non_hex() {
        let err = "zzzz03e803e8".parse::<ColorCode>().unwrap_err();
        assert!(err.to_string().contains("Invalid color"));
    }

    #[test]
    fn color_parse_rejects_out_of_range() {
        // hue 0x0200 = 512 > 360
        let err = "020003e803e8".parse::<ColorCode>().unwrap_err();
        assert!(err.to_string().contains("out of range"));
        // saturation 0x03e9 = 1001
        assert!("000003e903e8".parse::<ColorCode>().is_err());
    }

    // ── Palette ──

    #[test]
    fn palette_defaults() {
        let palette = Palette::default();
        for state in State::ALL {
            assert_eq!(palette.color(state), state.default_color());
        }
    }

    #[test]
    fn palette_override_replaces_one_state() {
        let mut config = Config::default();
        config
            .colors
            .insert(State::Done, "000000000000".to_string());
        let palette = Palette::from_config(&config);
        assert_eq!(palette.color(State::Done), ColorCode::hsv(0, 0, 0));
        assert_eq!(palette.color(State::Error), State::Error.default_color());
    }

    #[test]
    fn palette_invalid_override_falls_back() {
        let mut config = Config::default();
        config.colors.insert(State::Running, "blue".to_string());
        config.colors.insert(State::Error, "ffff03e803e8".to_string());
        config.colors.insert(State::Done, "007803e803e8".to_string());
        let palette = Palette::from_config(&config);
        assert_eq!(palette.color(State::Running), State::Running.default_color());
        assert_eq!(palette.color(State::Error), State::Error.default_color());
        assert_eq!(palette.color(State::Done), ColorCode::hsv(120, 1000, 1000));
    }

    // ── LightCommand ──

    #[test]
    fn command_data_points() {
        let dps = LightCommand::new(State::Thinking.default_color()).dps();
        assert_eq!(dps.len(), 3);
        assert_eq!(dps["20"], Value::Bool(true));
        assert_eq!(dps["21"], "colour");
        assert_eq!(dps["24"], "011803e803e8");
    }
}
