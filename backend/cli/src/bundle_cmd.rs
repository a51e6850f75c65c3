//! `braindrive check-bundle`: is the plugin ready to be installed?

use std::path::PathBuf;

use anyhow::{bail, Result};
use braindrive_config::KitConfig;
use braindrive_plugin::{check_bundle, ArtifactStatus};

use crate::terminal_output::{heading, note_error, note_success};

pub fn run(config: &KitConfig, dist_override: Option<PathBuf>, entry_override: Option<String>) -> Result<()> {
    let bundle = config.bundle.clone().unwrap_or_default();
    let dist = dist_override.unwrap_or_else(|| PathBuf::from(bundle.dist_dir.unwrap_or_else(|| "dist".into())));
    let entry = entry_override.or(bundle.entry).unwrap_or_else(|| "remoteEntry.js".into());

    heading("Checking plugin bundle");
    let report = check_bundle(&dist, &entry, &bundle.package_managers);

    if let Some((name, path)) = &report.package_manager {
        note_success(&format!("{name} found at {}", path.display()));
    }
    if let ArtifactStatus::Ok { path, bytes } = &report.artifact {
        note_success(&format!("{} ({bytes} bytes)", path.display()));
    }
    let problems = report.problems();
    for problem in &problems {
        note_error(problem);
    }
    if !problems.is_empty() {
        bail!("bundle check failed");
    }
    Ok(())
}
