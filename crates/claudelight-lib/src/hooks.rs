//! Hook installer — register `claude-light` commands in the host's settings file.
//!
//! The settings document is loaded as a generic, order-preserving JSON tree;
//! only `hooks.<event>` arrays are touched and every other field is written
//! back unchanged. Merging is idempotent.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use crate::error::{ClaudelightError, Result};

/// CLI action that runs the installer.
pub const SETUP_ACTION: &str = "setup-hooks";

/// One lifecycle event → command registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookBinding {
    pub event: &'static str,
    pub matcher: Option<&'static str>,
    pub command: &'static str,
}

/// The registrations this tool installs.
pub const HOOK_BINDINGS: [HookBinding; 5] = [
    HookBinding {
        event: "UserPromptSubmit",
        matcher: None,
        command: "claude-light thinking",
    },
    HookBinding {
        event: "PreToolUse",
        matcher: None,
        command: "claude-light running",
    },
    HookBinding {
        event: "PostToolUseFailure",
        matcher: None,
        command: "claude-light error",
    },
    HookBinding {
        event: "Notification",
        matcher: Some("idle_prompt"),
        command: "claude-light question",
    },
    HookBinding {
        event: "Stop",
        matcher: None,
        command: "claude-light done",
    },
];

/// What a merge did, event by event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// File that was written.
    pub path: PathBuf,
    pub added: Vec<String>,
    pub already_configured: Vec<String>,
}

/// `~/.claude/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("settings.json"))
}

/// Install into the default settings file.
pub fn install_hooks() -> Result<HookReport> {
    let path = settings_path()
        .ok_or_else(|| ClaudelightError::Settings("cannot determine home directory".into()))?;
    install_hooks_at(&path)
}

/// Load (or start) the settings document at `path`, merge [`HOOK_BINDINGS`],
/// and write it back. A malformed existing file is an error and is left
/// untouched. When `path` is a symlink the file it points at is updated.
pub fn install_hooks_at(path: &Path) -> Result<HookReport> {
    let mut settings = if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            ClaudelightError::Settings(format!("failed to parse {}: {e}", path.display()))
        })?
    } else {
        Value::Object(Map::new())
    };

    let (added, already_configured) = merge_hooks(&mut settings, &HOOK_BINDINGS)?;

    let serialized = serde_json::to_string_pretty(&settings)?;
    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    write_atomic(&target, &format!("{serialized}\n"))?;

    Ok(HookReport {
        path: path.to_path_buf(),
        added,
        already_configured,
    })
}

/// Merge bindings into a settings tree. Returns `(added, already_configured)`
/// event names in binding order.
pub fn merge_hooks(
    settings: &mut Value,
    bindings: &[HookBinding],
) -> Result<(Vec<String>, Vec<String>)> {
    let root = settings
        .as_object_mut()
        .ok_or_else(|| ClaudelightError::Settings("settings root is not a JSON object".into()))?;
    let hooks = or_empty(root.entry("hooks").or_insert(Value::Null), || {
        Value::Object(Map::new())
    })
    .as_object_mut()
    .ok_or_else(|| ClaudelightError::Settings("\"hooks\" is not a JSON object".into()))?;

    let mut added = Vec::new();
    let mut already = Vec::new();
    for binding in bindings {
        let entries = or_empty(hooks.entry(binding.event).or_insert(Value::Null), || {
            Value::Array(Vec::new())
        })
        .as_array_mut()
        .ok_or_else(|| {
            ClaudelightError::Settings(format!("\"hooks.{}\" is not a JSON array", binding.event))
        })?;

        if entries.iter().any(|entry| is_same_binding(entry, binding)) {
            already.push(binding.event.to_string());
            continue;
        }
        entries.push(hook_entry(binding));
        added.push(binding.event.to_string());
    }
    Ok((added, already))
}

/// A `null` slot counts as absent.
fn or_empty(slot: &mut Value, empty: impl FnOnce() -> Value) -> &mut Value {
    if slot.is_null() {
        *slot = empty();
    }
    slot
}

/// An entry matches when its matcher (absent = "") equals the binding's and
/// one of its hooks runs the binding's command.
fn is_same_binding(entry: &Value, binding: &HookBinding) -> bool {
    let matcher = entry.get("matcher").and_then(Value::as_str).unwrap_or("");
    if matcher != binding.matcher.unwrap_or("") {
        return false;
    }
    entry
        .get("hooks")
        .and_then(Value::as_array)
        .is_some_and(|hooks| {
            hooks
                .iter()
                .any(|h| h.get("command").and_then(Value::as_str) == Some(binding.command))
        })
}

fn hook_entry(binding: &HookBinding) -> Value {
    let mut entry = Map::new();
    if let Some(matcher) = binding.matcher {
        entry.insert("matcher".into(), Value::String(matcher.into()));
    }
    entry.insert(
        "hooks".into(),
        json!([{ "type": "command", "command": binding.command }]),
    );
    Value::Object(entry)
}

/// Write to a temp file then rename; falls back to a direct write when the
/// rename fails. An existing file keeps its permissions.
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)?;
    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(&tmp, meta.permissions())?;
    }
    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Rename can fail across filesystems; fall back to direct write + cleanup
            let result = std::fs::write(path, contents);
            let _ = std::fs::remove_file(&tmp);
            result
        }
    }
}
