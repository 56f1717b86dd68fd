//! `setup-hooks` — register claude-light in the host settings file.

use super::{LOG_PREFIX, Result, hooks};

pub(super) fn cmd_setup_hooks() -> Result<()> {
    let report = hooks::install_hooks()?;

    if !report.added.is_empty() {
        println!("{LOG_PREFIX} Added hooks: {}", report.added.join(", "));
    }
    if !report.already_configured.is_empty() {
        println!(
            "{LOG_PREFIX} Already configured: {}",
            report.already_configured.join(", ")
        );
    }
    println!("{LOG_PREFIX} Settings updated: {}", report.path.display());
    Ok(())
}
