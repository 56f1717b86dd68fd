//! Application configuration — a `KEY=VALUE` file layered under environment variables.
//!
//! The file at `~/.config/claudelight/.env` supplies defaults; any environment
//! variable that is set and non-empty overrides the file. The result is an
//! explicit [`Config`] handed to the device parser and palette; the process
//! environment is never modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::light::State;

/// Comma-separated device ids.
pub const ENV_DEVICE_ID: &str = "CLAUDELIGHT_DEVICE_ID";
/// Comma-separated local keys.
pub const ENV_KEY: &str = "CLAUDELIGHT_KEY";
/// Comma-separated IP addresses.
pub const ENV_IP: &str = "CLAUDELIGHT_IP";
/// Comma-separated protocol versions (optional).
pub const ENV_VERSION: &str = "CLAUDELIGHT_VERSION";
/// Prefix for per-state color overrides, e.g. `CLAUDELIGHT_COLOR_THINKING`.
pub const ENV_COLOR_PREFIX: &str = "CLAUDELIGHT_COLOR_";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Raw `CLAUDELIGHT_DEVICE_ID` value.
    pub device_ids: String,
    /// Raw `CLAUDELIGHT_KEY` value.
    pub keys: String,
    /// Raw `CLAUDELIGHT_IP` value.
    pub ips: String,
    /// Raw `CLAUDELIGHT_VERSION` value. Empty = every device uses the default.
    pub versions: String,
    /// Per-state color overrides, unvalidated.
    pub colors: BTreeMap<State, String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("device_ids", &self.device_ids)
            .field("keys", &"<redacted>")
            .field("ips", &self.ips)
            .field("versions", &self.versions)
            .field("colors", &self.colors)
            .finish()
    }
}

impl Config {
    /// Config directory (`~/.config/claudelight` on every platform).
    pub fn dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".config").join("claudelight"))
    }

    /// Full path to the config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join(".env"))
    }

    /// Load from the default path and the process environment.
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::from_layers(&BTreeMap::new(), env_lookup),
        }
    }

    /// Load from an arbitrary file path and the process environment.
    pub fn load_from(path: &Path) -> Self {
        Self::from_layers(&read_env_file(path), env_lookup)
    }

    /// Merge file values with an environment lookup. A lookup result that is
    /// `None` or empty falls back to the file.
    pub fn from_layers(
        file: &BTreeMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let get = |key: &str| -> String {
            env(key)
                .filter(|v| !v.is_empty())
                .or_else(|| file.get(key).cloned())
                .unwrap_or_default()
        };

        let mut colors = BTreeMap::new();
        for state in State::ALL {
            let value = get(&color_key(state));
            if !value.is_empty() {
                colors.insert(state, value);
            }
        }

        Config {
            device_ids: get(ENV_DEVICE_ID),
            keys: get(ENV_KEY),
            ips: get(ENV_IP),
            versions: get(ENV_VERSION),
            colors,
        }
    }
}

/// Variable name of the color override for a state.
pub fn color_key(state: State) -> String {
    format!("{ENV_COLOR_PREFIX}{}", state.name().to_ascii_uppercase())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read a `KEY=VALUE` file. A missing or unreadable file yields no entries.
pub fn read_env_file(path: &Path) -> BTreeMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_env_file(&contents),
        Err(e) => {
            log::debug!("config file {} not loaded: {e}", path.display());
            BTreeMap::new()
        }
    }
}

/// Parse `KEY=VALUE` lines. Keys are uppercase ASCII letters and `_`; the
/// value must be non-empty and is kept verbatim. Anything else is skipped.
/// The first occurrence of a key wins.
pub fn parse_env_file(contents: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in contents.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_uppercase() || b == b'_') {
            continue;
        }
        if value.is_empty() {
            continue;
        }
        vars.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    // ── parse_env_file ──

    #[test]
    fn parse_simple_lines() {
        let vars = parse_env_file("CLAUDELIGHT_IP=10.0.0.2\nCLAUDELIGHT_KEY=abc\n");
        assert_eq!(vars["CLAUDELIGHT_IP"], "10.0.0.2");
        assert_eq!(vars["CLAUDELIGHT_KEY"], "abc");
    }

    #[test]
    fn parse_keeps_value_with_equals() {
        let vars = parse_env_file("CLAUDELIGHT_KEY=a=b=c");
        assert_eq!(vars["CLAUDELIGHT_KEY"], "a=b=c");
    }

    #[test]
    fn parse_skips_lowercase_and_digits_in_key() {
        let vars = parse_env_file("claudelight_ip=1.1.1.1\nKEY2=x\nMixed_Case=y");
        assert!(vars.is_empty());
    }

    #[test]
    fn parse_skips_blank_comment_and_empty_value() {
        let vars = parse_env_file("\n# comment\nCLAUDELIGHT_IP=\n   \nNOEQUALS\n");
        assert!(vars.is_empty());
    }

    #[test]
    fn parse_strips_crlf() {
        let vars = parse_env_file("CLAUDELIGHT_IP=10.0.0.2\r\nCLAUDELIGHT_KEY=k\r\n");
        assert_eq!(vars["CLAUDELIGHT_IP"], "10.0.0.2");
        assert_eq!(vars["CLAUDELIGHT_KEY"], "k");
    }

    #[test]
    fn parse_first_occurrence_wins() {
        let vars = parse_env_file("CLAUDELIGHT_IP=first\nCLAUDELIGHT_IP=second");
        assert_eq!(vars["CLAUDELIGHT_IP"], "first");
    }

    // ── read_env_file ──

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_env_file(&dir.path().join("nope.env"));
        assert!(vars.is_empty());
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "CLAUDELIGHT_DEVICE_ID=dev1\n").unwrap();
        let vars = read_env_file(&path);
        assert_eq!(vars["CLAUDELIGHT_DEVICE_ID"], "dev1");
    }

    // ── from_layers ──

    #[test]
    fn env_overrides_file() {
        let file = parse_env_file("CLAUDELIGHT_IP=10.0.0.1\nCLAUDELIGHT_KEY=filekey");
        let config = Config::from_layers(&file, env_from(&[("CLAUDELIGHT_IP", "10.0.0.9")]));
        assert_eq!(config.ips, "10.0.0.9");
        assert_eq!(config.keys, "filekey");
    }

    #[test]
    fn empty_env_falls_back_to_file() {
        let file = parse_env_file("CLAUDELIGHT_DEVICE_ID=fromfile");
        let config = Config::from_layers(&file, env_from(&[("CLAUDELIGHT_DEVICE_ID", "")]));
        assert_eq!(config.device_ids, "fromfile");
    }

    #[test]
    fn nothing_set_is_default() {
        let config = Config::from_layers(&BTreeMap::new(), env_from(&[]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn color_overrides_collected_per_state() {
        let file = parse_env_file("CLAUDELIGHT_COLOR_DONE=000003e803e8");
        let config = Config::from_layers(
            &file,
            env_from(&[("CLAUDELIGHT_COLOR_THINKING", "00b403e803e8")]),
        );
        assert_eq!(config.colors.len(), 2);
        assert_eq!(config.colors[&State::Done], "000003e803e8");
        assert_eq!(config.colors[&State::Thinking], "00b403e803e8");
    }

    #[test]
    fn color_key_format() {
        assert_eq!(color_key(State::Question), "CLAUDELIGHT_COLOR_QUESTION");
    }

    #[test]
    fn debug_redacts_keys() {
        let config = Config {
            keys: "supersecretkey00".into(),
            ..Config::default()
        };
        assert!(!format!("{config:?}").contains("supersecretkey00"));
    }

    #[test]
    fn load_from_uses_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        // A variable name no real environment defines.
        std::fs::write(&path, "CLAUDELIGHT_COLOR_ERROR=000003e803e8\n").unwrap();
        let config = Config::load_from(&path);
        if std::env::var("CLAUDELIGHT_COLOR_ERROR").is_err() {
            assert_eq!(config.colors[&State::Error], "000003e803e8");
        }
    }
}
