//! Config file read/write with atomic backup rotation.

use crate::schema::KitConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "plugin-kit.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 3;

/// Resolve the kit config directory.
/// Priority: `BRAINDRIVE_CONFIG_DIR` env > `./.braindrive` when present > `~/.braindrive/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BRAINDRIVE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let local = PathBuf::from(".braindrive");
    if local.is_dir() {
        return local;
    }
    match dirs::home_dir() {
        Some(home) => home.join(".braindrive"),
        None => local,
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
pub async fn load_config(path: &Path) -> Result<KitConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(KitConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse YAML text. An empty document is the default config.
pub fn parse_config(raw: &str) -> Result<KitConfig> {
    if raw.trim().is_empty() {
        return Ok(KitConfig::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

/// Write config to disk atomically (temp file + rename), keeping rolling
/// backups of the previous versions.
pub async fn write_config(config: &KitConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    path.with_extension(format!("yaml.bak.{n}"))
}

/// Shift `.bak.1 → .bak.2 → …` and copy the current file to `.bak.1`.
/// Backup failures are logged, never fatal.
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = backup_path(path, i);
        if fs::try_exists(&old).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&old, backup_path(path, i + 1)).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }
    let bak = backup_path(path, 1);
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

/// Patch config with a JSON Merge Patch (RFC 7396).
pub fn apply_merge_patch(config: &KitConfig, patch: &serde_json::Value) -> Result<KitConfig> {
    let mut value =
        serde_json::to_value(config).context("Failed to serialize config for merge patch")?;
    json_merge_patch(&mut value, patch);
    serde_json::from_value(value).context("Failed to deserialize config after merge patch")
}

fn json_merge_patch(target: &mut serde_json::Value, patch: &serde_json::Value) {
    let serde_json::Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = serde_json::Value::Object(serde_json::Map::new());
    }
    if let serde_json::Value::Object(target_map) = target {
        for (key, patch_val) in patch_map {
            if patch_val.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(serde_json::Value::Null);
                json_merge_patch(entry, patch_val);
            }
        }
    }
}
