//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{
    BundleConfig, DevConfig, ErrorHandlingConfig, KitConfig, LoggingConfig, PluginSection,
    RefreshConfig,
};

pub const DEFAULT_PLUGIN_ID: &str = "braindrive-plugin-template";

pub const DEFAULT_MODULE_ID: &str = "PluginTemplate";

pub const DEFAULT_MANIFEST_PATH: &str = "plugin.json";

/// Default auto refresh period; 0 disables.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 0;

pub const DEFAULT_DATA_ENDPOINT: &str = "/api/v1/plugin-template/data";

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_LOG_DIR: &str = "logs";

pub const DEFAULT_DIST_DIR: &str = "dist";

pub const DEFAULT_BUNDLE_ENTRY: &str = "remoteEntry.js";

pub const DEFAULT_PACKAGE_MANAGERS: [&str; 3] = ["npm", "yarn", "pnpm"];

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: KitConfig) -> KitConfig {
    let config = apply_plugin_defaults(config);
    let config = apply_error_handling_defaults(config);
    let config = apply_refresh_defaults(config);
    let config = apply_logging_defaults(config);
    let config = apply_dev_defaults(config);
    apply_bundle_defaults(config)
}

fn apply_plugin_defaults(mut config: KitConfig) -> KitConfig {
    let plugin = config.plugin.get_or_insert_with(PluginSection::default);
    plugin.id.get_or_insert_with(|| DEFAULT_PLUGIN_ID.to_string());
    plugin.module_id.get_or_insert_with(|| DEFAULT_MODULE_ID.to_string());
    plugin.manifest_path.get_or_insert_with(|| DEFAULT_MANIFEST_PATH.to_string());
    config
}

/// Materialize the handler defaults so the written config documents them.
fn apply_error_handling_defaults(mut config: KitConfig) -> KitConfig {
    let section = config.error_handling.get_or_insert_with(ErrorHandlingConfig::default);
    let resolved = section.handler_config();
    section.max_retries.get_or_insert(resolved.max_retries);
    section.retry_delay_ms.get_or_insert(resolved.retry_delay_ms);
    section.backoff_factor.get_or_insert(resolved.backoff_factor);
    section.enable_logging.get_or_insert(resolved.enable_logging);
    section.enable_reporting.get_or_insert(resolved.enable_reporting);
    section.user_notification.get_or_insert(resolved.user_notification);
    config
}

fn apply_refresh_defaults(mut config: KitConfig) -> KitConfig {
    let refresh = config.refresh.get_or_insert_with(RefreshConfig::default);
    refresh.interval_secs.get_or_insert(DEFAULT_REFRESH_INTERVAL_SECS);
    refresh.data_endpoint.get_or_insert_with(|| DEFAULT_DATA_ENDPOINT.to_string());
    config
}

fn apply_logging_defaults(mut config: KitConfig) -> KitConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    logging.redact_sensitive.get_or_insert(true);
    config
}

fn apply_dev_defaults(mut config: KitConfig) -> KitConfig {
    let dev = config.dev.get_or_insert_with(DevConfig::default);
    dev.theme.get_or_insert_with(|| "light".to_string());
    dev.api_latency_ms.get_or_insert(0);
    dev.fail_first_requests.get_or_insert(0);
    dev.legacy_settings.get_or_insert(false);
    config
}

fn apply_bundle_defaults(mut config: KitConfig) -> KitConfig {
    let bundle = config.bundle.get_or_insert_with(BundleConfig::default);
    bundle.dist_dir.get_or_insert_with(|| DEFAULT_DIST_DIR.to_string());
    bundle.entry.get_or_insert_with(|| DEFAULT_BUNDLE_ENTRY.to_string());
    if bundle.package_managers.is_empty() {
        bundle.package_managers = DEFAULT_PACKAGE_MANAGERS.iter().map(|s| s.to_string()).collect();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(KitConfig::default());
        assert_eq!(cfg.plugin.unwrap().id.unwrap(), DEFAULT_PLUGIN_ID);
        assert_eq!(cfg.error_handling.unwrap().max_retries, Some(3));
        assert_eq!(cfg.refresh.unwrap().data_endpoint.unwrap(), DEFAULT_DATA_ENDPOINT);
        assert_eq!(cfg.bundle.unwrap().package_managers, vec!["npm", "yarn", "pnpm"]);
    }

    #[test]
    fn does_not_override_user_values() {
        let cfg = KitConfig {
            error_handling: Some(ErrorHandlingConfig {
                max_retries: Some(1),
                ..Default::default()
            }),
            logging: Some(LoggingConfig {
                level: Some("debug".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.error_handling.unwrap().max_retries, Some(1));
        assert_eq!(cfg.logging.unwrap().level.unwrap(), "debug");
    }
}
