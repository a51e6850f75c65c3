//! `braindrive-config` — configuration for the plugin kit and its dev harness.
//!
//! Provides:
//! - Typed config schema (plugin identity, error handling, refresh, logging, dev host, bundle)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution and `BRAINDRIVE_*` overrides
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, collect_referenced_vars, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{apply_merge_patch, config_dir, config_file_path, load_config, parse_config, write_config};
pub use schema::KitConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// findings are logged; the caller decides whether to act on them via
/// [`validate`].
pub async fn load_and_prepare(path: &Path) -> Result<KitConfig> {
    let raw_config = load_config(path).await?;
    let config = prepare(raw_config, &std::env::vars().collect())?;

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}

/// The pure part of [`load_and_prepare`], with an explicit environment.
pub fn prepare(config: KitConfig, env: &std::collections::HashMap<String, String>) -> Result<KitConfig> {
    let value: Value =
        serde_json::to_value(&config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: KitConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_env_overrides_with(config, env);
    Ok(apply_all_defaults(config))
}
