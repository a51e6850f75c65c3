//! `braindrive config ...`

use std::path::Path;

use anyhow::{bail, Context, Result};
use braindrive_config::{apply_merge_patch, load_config, validate, write_config, KitConfig};

use crate::terminal_output::{note_error, note_success, note_warn};

pub fn show(config: &KitConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

/// Print validation findings; fail on errors.
pub fn check(config: &KitConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        note_warn(&warning.to_string());
    }
    for error in &report.errors {
        note_error(&error.to_string());
    }
    if !report.is_valid() {
        bail!("config has {} error(s)", report.errors.len());
    }
    note_success("Config is valid");
    Ok(())
}

/// Apply a JSON merge patch to the file on disk. The patched config must
/// validate before it is written.
pub async fn set(path: &Path, patch: &str) -> Result<()> {
    let patch: serde_json::Value = serde_json::from_str(patch).context("patch must be JSON")?;
    let current = load_config(path).await?;
    let patched = apply_merge_patch(&current, &patch)?;
    let report = validate(&patched);
    if !report.is_valid() {
        for error in &report.errors {
            note_error(&error.to_string());
        }
        bail!("patched config is invalid; nothing written");
    }
    write_config(&patched, path).await?;
    note_success(&format!("Updated {}", path.display()));
    Ok(())
}
