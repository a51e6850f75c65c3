//! Plugin kit configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional in
//! the file; [`crate::defaults::apply_all_defaults`] fills the gaps.

use braindrive_recovery::HandlerConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitConfig {
    /// Identity of the plugin being developed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginSection>,

    /// Error handler policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling: Option<ErrorHandlingConfig>,

    /// Data loading and auto refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Mock host used by `braindrive dev`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<DevConfig>,

    /// Bundle artifact checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandlingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_logging: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_reporting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_notification: Option<bool>,
}

impl ErrorHandlingConfig {
    /// Resolve into handler policy; unset fields keep the handler defaults.
    pub fn handler_config(&self) -> HandlerConfig {
        let base = HandlerConfig::default();
        HandlerConfig {
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
            backoff_factor: self.backoff_factor.unwrap_or(base.backoff_factor),
            attempt_timeout_ms: self.attempt_timeout_ms.or(base.attempt_timeout_ms),
            enable_logging: self.enable_logging.unwrap_or(base.enable_logging),
            enable_reporting: self.enable_reporting.unwrap_or(base.enable_reporting),
            user_notification: self.user_notification.unwrap_or(base.user_notification),
            ..base
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshConfig {
    /// Auto refresh period; 0 disables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redact_sensitive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>, // "light" | "dark"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_latency_ms: Option<u64>,
    /// Fail this many initial data requests to exercise the retry path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_first_requests: Option<u32>,
    /// Serve settings through the legacy get/set surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_settings: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default)]
    pub package_managers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
plugin:
  id: my-plugin
errorHandling:
  maxRetries: 5
  retryDelayMs: 250
refresh:
  intervalSecs: 60
"#;
        let cfg: KitConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.plugin.unwrap().id.unwrap(), "my-plugin");
        let handler = cfg.error_handling.unwrap().handler_config();
        assert_eq!(handler.max_retries, 5);
        assert_eq!(handler.retry_delay_ms, 250);
        assert!(handler.enable_logging);
        assert_eq!(cfg.refresh.unwrap().interval_secs, Some(60));
    }

    #[test]
    fn empty_sections_are_not_serialized() {
        let yaml = serde_yaml::to_string(&KitConfig::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
