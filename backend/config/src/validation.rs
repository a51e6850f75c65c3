//! Config validation: deep schema checks with user-friendly error messages.

use crate::schema::KitConfig;
use braindrive_core::Theme;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Highest retry count accepted before the config is rejected.
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

pub fn validate(config: &KitConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_plugin(config, &mut report);
    validate_error_handling(config, &mut report);
    validate_refresh(config, &mut report);
    validate_logging(config, &mut report);
    validate_dev(config, &mut report);
    validate_bundle(config, &mut report);
    report
}

fn validate_plugin(config: &KitConfig, report: &mut ValidationReport) {
    let Some(plugin) = &config.plugin else { return };
    if let Some(id) = &plugin.id {
        if id.trim().is_empty() {
            report.error("plugin.id", "Plugin id cannot be empty");
        } else if id.chars().any(char::is_whitespace) {
            report.error("plugin.id", "Plugin id cannot contain whitespace");
        }
    }
    if plugin.module_id.as_deref().is_some_and(|m| m.trim().is_empty()) {
        report.error("plugin.moduleId", "Module id cannot be empty");
    }
}

fn validate_error_handling(config: &KitConfig, report: &mut ValidationReport) {
    let Some(eh) = &config.error_handling else { return };
    if let Some(n) = eh.max_retries {
        if n > MAX_RETRIES_LIMIT {
            report.error(
                "errorHandling.maxRetries",
                format!("maxRetries must be <= {MAX_RETRIES_LIMIT}"),
            );
        } else if n > 5 {
            report.warn("errorHandling.maxRetries", "More than 5 retries delays error feedback");
        }
    }
    if eh.retry_delay_ms == Some(0) && eh.max_retries.unwrap_or(0) > 0 {
        report.warn("errorHandling.retryDelayMs", "Retrying with no delay hammers the host API");
    }
    if let Some(f) = eh.backoff_factor {
        if !f.is_finite() || f < 1.0 {
            report.error("errorHandling.backoffFactor", "backoffFactor must be >= 1.0");
        }
    }
    if eh.attempt_timeout_ms == Some(0) {
        report.error("errorHandling.attemptTimeoutMs", "attemptTimeoutMs must be > 0 when set");
    }
}

fn validate_refresh(config: &KitConfig, report: &mut ValidationReport) {
    let Some(refresh) = &config.refresh else { return };
    if let Some(secs) = refresh.interval_secs {
        if secs != 0 && !(5..=3600).contains(&secs) {
            report.error(
                "refresh.intervalSecs",
                "intervalSecs must be 0 (disabled) or between 5 and 3600",
            );
        }
    }
    if let Some(endpoint) = &refresh.data_endpoint {
        if !(endpoint.starts_with('/') || endpoint.starts_with("http")) {
            report.error(
                "refresh.dataEndpoint",
                format!("Endpoint '{endpoint}' must be an absolute path or URL"),
            );
        }
    }
}

fn validate_logging(config: &KitConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            report.error(
                "logging.level",
                format!("Unknown log level '{level}'. Use one of {}", LOG_LEVELS.join(", ")),
            );
        }
    }
}

fn validate_dev(config: &KitConfig, report: &mut ValidationReport) {
    let Some(dev) = &config.dev else { return };
    if let Some(theme) = &dev.theme {
        if theme.parse::<Theme>().is_err() {
            report.warn("dev.theme", format!("Unknown theme '{theme}'; light will be used"));
        }
    }
    if dev.api_latency_ms.is_some_and(|ms| ms > 10_000) {
        report.warn("dev.apiLatencyMs", "Mock latency above 10s will trip most timeouts");
    }
}

fn validate_bundle(config: &KitConfig, report: &mut ValidationReport) {
    let Some(bundle) = &config.bundle else { return };
    if let Some(entry) = &bundle.entry {
        if !entry.ends_with(".js") {
            report.error("bundle.entry", "Bundle entry must be a .js file");
        }
    }
}
