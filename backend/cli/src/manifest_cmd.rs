//! `braindrive manifest ...`

use std::path::Path;

use anyhow::{bail, Context, Result};
use braindrive_plugin::{load_manifest, read_manifest, PluginManifest};

use crate::terminal_output::{note_error, note_success};

/// Print every problem; fail when there is at least one.
pub fn validate(path: &Path) -> Result<()> {
    let manifest = read_manifest(path)?;
    let problems = manifest.problems();
    if problems.is_empty() {
        note_success(&format!(
            "{} v{} is valid ({} module(s))",
            manifest.id,
            manifest.version,
            manifest.modules.len()
        ));
        return Ok(());
    }
    for problem in &problems {
        note_error(&problem.to_string());
    }
    bail!("{} has {} problem(s)", path.display(), problems.len())
}

/// Write the template manifest. Refuses to overwrite unless `force`.
pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let json = serde_json::to_string_pretty(&PluginManifest::template())?;
    std::fs::write(path, json + "\n").with_context(|| format!("write manifest to {}", path.display()))?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}

/// Print the module-federation `exposes` map.
pub fn exposes(path: &Path) -> Result<()> {
    let manifest = load_manifest(path)?;
    let exposes = manifest.federation_exposes();
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "name": manifest.scope,
        "filename": manifest.bundle,
        "exposes": exposes,
    }))?);
    Ok(())
}
