//! Environment handling for the kit config.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time
//!   (`$${VAR}` escapes to a literal `${VAR}`; names are `[A-Z_][A-Z0-9_]*`);
//! - `BRAINDRIVE_*` variables overriding individual settings.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::schema::{ErrorHandlingConfig, KitConfig, LoggingConfig, RefreshConfig};

/// Matches `${VAR}` and its escaped form `$${VAR}`.
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex"));

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using `env`. Unset or empty vars are errors.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    resolve_at(value, env, "")
}

fn resolve_at(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(resolve_str(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| resolve_at(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                out.insert(key.clone(), resolve_at(v, env, &child)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn resolve_str(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }
    let mut missing = None;
    let resolved = REFERENCE.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => v.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    if let Some(var_name) = missing {
        bail!(MissingEnvVarError { var_name, config_path: path.to_string() });
    }
    Ok(resolved.into_owned())
}

/// Every env var name referenced in a config value tree, sorted and deduplicated.
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.extend(
                REFERENCE
                    .captures_iter(s)
                    .filter(|c| c[1].is_empty())
                    .map(|c| c[2].to_string()),
            ),
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }
    let mut vars = Vec::new();
    walk(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

/// Apply `BRAINDRIVE_*` overrides from the process environment.
pub fn apply_env_overrides(config: KitConfig) -> KitConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply `BRAINDRIVE_*` overrides from `env`. Unparseable numbers are ignored.
pub fn apply_env_overrides_with(mut config: KitConfig, env: &HashMap<String, String>) -> KitConfig {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(level) = get("BRAINDRIVE_LOG_LEVEL") {
        debug!(level, "Log level overridden from env");
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.to_string());
    }
    if let Some(n) = get("BRAINDRIVE_MAX_RETRIES").and_then(|v| v.parse().ok()) {
        config.error_handling.get_or_insert_with(ErrorHandlingConfig::default).max_retries = Some(n);
    }
    if let Some(ms) = get("BRAINDRIVE_RETRY_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.error_handling.get_or_insert_with(ErrorHandlingConfig::default).retry_delay_ms = Some(ms);
    }
    if let Some(endpoint) = get("BRAINDRIVE_DATA_ENDPOINT") {
        config.refresh.get_or_insert_with(RefreshConfig::default).data_endpoint =
            Some(endpoint.to_string());
    }
    if let Some(secs) = get("BRAINDRIVE_REFRESH_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.refresh.get_or_insert_with(RefreshConfig::default).interval_secs = Some(secs);
    }
    config
}
