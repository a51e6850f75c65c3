//! Plugin settings model and the settings form that edits it.

use std::collections::BTreeMap;
use std::sync::Arc;

use braindrive_core::{PluginConfig, PluginError, PluginResult, ValidationError};
use braindrive_recovery::{rules, ErrorHandler, RecoveryStrategy, ValidationRule};
use braindrive_services::SettingsService;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const MAX_CUSTOM_MESSAGE_LEN: usize = 200;
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 3600;

pub const DEFAULT_API_ENDPOINT: &str = "/api/v1/plugin-template/data";

/// The settings key a plugin persists its form under.
pub fn settings_key(plugin_id: &str) -> String {
    format!("{plugin_id}_settings")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginSettings {
    /// 0 disables auto refresh.
    pub refresh_interval_secs: u64,
    pub show_advanced_options: bool,
    pub custom_message: String,
    pub enable_notifications: bool,
    pub api_endpoint: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 0,
            show_advanced_options: false,
            custom_message: String::new(),
            enable_notifications: true,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }
}

impl PluginSettings {
    /// Parse a persisted value. Missing fields take defaults; wrong types are
    /// a validation error naming the settings key.
    pub fn from_value(value: &Value) -> PluginResult<Self> {
        serde_json::from_value(value.clone()).map_err(|e| {
            ValidationError::new("settings", format!("Malformed settings: {e}"))
                .with_value(value.clone())
                .into()
        })
    }

    /// Overlay the host-provided module config on the defaults.
    pub fn from_config(config: &PluginConfig) -> PluginResult<Self> {
        Self::from_value(&Value::Object(config.clone()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        match self.to_value() {
            Value::Object(mut map) => map.remove(field),
            _ => None,
        }
    }

    /// Set one field by its camelCase name.
    pub fn set(&mut self, field: &str, value: Value) -> PluginResult<()> {
        let mut map = match self.to_value() {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if !map.contains_key(field) {
            return Err(PluginError::validation(field, "Unknown setting"));
        }
        map.insert(field.to_string(), value.clone());
        *self = serde_json::from_value(Value::Object(map)).map_err(|e| {
            PluginError::from(ValidationError::new(field, format!("Wrong type: {e}")).with_value(value))
        })?;
        Ok(())
    }
}

/// Field name → ordered rules.
pub fn field_rules() -> Vec<(&'static str, Vec<ValidationRule<Value>>)> {
    vec![
        (
            "refreshIntervalSecs",
            vec![ValidationRule::predicate(
                "refresh_interval",
                format!(
                    "must be 0 (off) or between {MIN_REFRESH_INTERVAL_SECS} and {MAX_REFRESH_INTERVAL_SECS} seconds"
                ),
                |v: &Value| {
                    v.as_u64().is_some_and(|n| {
                        n == 0 || (MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS).contains(&n)
                    })
                },
            )],
        ),
        ("customMessage", vec![rules::max_length(MAX_CUSTOM_MESSAGE_LEN)]),
        (
            "apiEndpoint",
            vec![
                rules::required(),
                ValidationRule::predicate(
                    "endpoint",
                    "must be an absolute path or an http(s) URL",
                    |v: &Value| v.as_str().is_some_and(|s| s.starts_with('/') || s.starts_with("http")),
                ),
            ],
        ),
    ]
}

/// Form state over one plugin's persisted settings.
pub struct SettingsForm {
    key: String,
    service: Option<Arc<dyn SettingsService>>,
    handler: ErrorHandler,
    rules: Vec<(&'static str, Vec<ValidationRule<Value>>)>,
    saved: PluginSettings,
    draft: PluginSettings,
    field_errors: BTreeMap<String, String>,
    load_error: Option<PluginError>,
}

impl std::fmt::Debug for SettingsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsForm")
            .field("key", &self.key)
            .field("draft", &self.draft)
            .field("field_errors", &self.field_errors)
            .finish_non_exhaustive()
    }
}

impl SettingsForm {
    pub fn new(plugin_id: &str, service: Option<Arc<dyn SettingsService>>, handler: ErrorHandler) -> Self {
        Self {
            key: settings_key(plugin_id),
            service,
            handler,
            rules: field_rules(),
            saved: PluginSettings::default(),
            draft: PluginSettings::default(),
            field_errors: BTreeMap::new(),
            load_error: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn draft(&self) -> &PluginSettings {
        &self.draft
    }

    pub fn saved(&self) -> &PluginSettings {
        &self.saved
    }

    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn load_error(&self) -> Option<&PluginError> {
        self.load_error.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved
    }

    /// Load persisted settings. A read failure or a malformed value is
    /// recorded and the form falls back to defaults.
    pub async fn load(&mut self) -> &PluginSettings {
        self.load_error = None;
        let settings = match self.read_persisted().await {
            Ok(Some(value)) => match PluginSettings::from_value(&value) {
                Ok(settings) => settings,
                Err(err) => {
                    self.load_error = Some(self.handler.record_error(err));
                    PluginSettings::default()
                }
            },
            Ok(None) => PluginSettings::default(),
            Err(err) => {
                self.load_error = Some(err);
                PluginSettings::default()
            }
        };
        debug!(key = %self.key, "Settings loaded");
        self.saved = settings.clone();
        self.draft = settings;
        self.field_errors.clear();
        &self.draft
    }

    async fn read_persisted(&self) -> PluginResult<Option<Value>> {
        let Some(service) = &self.service else {
            return Ok(None);
        };
        let key = self.key.as_str();
        self.handler
            .safe_async(|| service.get_setting(key), None, RecoveryStrategy::Escalate)
            .await
            .map(Option::flatten)
    }

    /// Edit one field of the draft and re-validate that field.
    pub fn set_field(&mut self, field: &str, value: Value) -> PluginResult<()> {
        self.draft.set(field, value)?;
        match self.validate_field(field) {
            Ok(()) => {
                self.field_errors.remove(field);
                Ok(())
            }
            Err(err) => {
                self.field_errors.insert(field.to_string(), err.message.clone());
                Err(err)
            }
        }
    }

    fn validate_field(&self, field: &str) -> PluginResult<()> {
        let Some((_, rules)) = self.rules.iter().find(|(name, _)| *name == field) else {
            return Ok(());
        };
        let value = self.draft.get(field).unwrap_or(Value::Null);
        self.handler.validate(&value, rules, field)
    }

    /// Validate every field. Returns the first failure; all failures are
    /// kept in [`Self::field_errors`].
    pub fn validate(&mut self) -> PluginResult<()> {
        self.field_errors.clear();
        let mut first = None;
        for (field, _) in &self.rules {
            if let Err(err) = self.validate_field(field) {
                self.field_errors.insert(field.to_string(), err.message.clone());
                first.get_or_insert(err);
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Validate and persist the draft.
    pub async fn save(&mut self) -> PluginResult<()> {
        self.validate()?;
        let service = self.service.clone().ok_or_else(|| {
            PluginError::service("settings", "SETTINGS_UNAVAILABLE", "Settings service not available")
        })?;
        let key = self.key.as_str();
        let value = self.draft.to_value();
        self.handler
            .safe_async(|| service.set_setting(key, value.clone()), None, RecoveryStrategy::Escalate)
            .await?;
        self.saved = self.draft.clone();
        info!(key = %self.key, "Settings saved");
        Ok(())
    }

    /// Restore defaults in the draft. Nothing is persisted until [`Self::save`].
    pub fn reset(&mut self) {
        self.draft = PluginSettings::default();
        self.field_errors.clear();
    }

    /// Throw away unsaved edits.
    pub fn discard(&mut self) {
        self.draft = self.saved.clone();
        self.field_errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braindrive_core::{ErrorContext, ErrorKind};
    use braindrive_recovery::HandlerConfig;
    use braindrive_services::mock::{MockLegacySettingsStore, MockSettingsService};
    use braindrive_services::HostSettings;
    use serde_json::json;

    fn handler() -> ErrorHandler {
        ErrorHandler::new(
            HandlerConfig { enable_logging: false, ..Default::default() },
            ErrorContext::new("SettingsForm").with_plugin("demo"),
        )
    }

    #[tokio::test]
    async fn load_edit_save_round_trip() {
        let service = Arc::new(MockSettingsService::new());
        let mut form = SettingsForm::new("demo", Some(service.clone()), handler());
        form.load().await;
        assert_eq!(form.draft(), &PluginSettings::default());

        form.set_field("customMessage", json!("Hello")).unwrap();
        form.set_field("refreshIntervalSecs", json!(30)).unwrap();
        assert!(form.is_dirty());
        form.save().await.unwrap();
        assert!(!form.is_dirty());

        let stored = service.snapshot().remove("demo_settings").unwrap();
        assert_eq!(stored["customMessage"], "Hello");

        let mut reloaded = SettingsForm::new("demo", Some(service), handler());
        assert_eq!(reloaded.load().await.refresh_interval_secs, 30);
    }

    #[tokio::test]
    async fn malformed_settings_fall_back_to_defaults() {
        let handler = handler();
        let service = Arc::new(
            MockSettingsService::new().with_value("demo_settings", json!({"refreshIntervalSecs": "often"})),
        );
        let mut form = SettingsForm::new("demo", Some(service), handler.clone());
        let loaded = form.load().await.clone();
        assert_eq!(loaded, PluginSettings::default());
        let err = form.load_error().unwrap();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(handler.error_stats().count_for_kind(ErrorKind::Validation), 1);
    }

    #[tokio::test]
    async fn invalid_fields_block_save() {
        let service = Arc::new(MockSettingsService::new());
        let mut form = SettingsForm::new("demo", Some(service.clone()), handler());
        form.load().await;

        let err = form.set_field("refreshIntervalSecs", json!(2)).unwrap_err();
        assert_eq!(err.as_validation().unwrap().field, "refreshIntervalSecs");
        form.set_field("apiEndpoint", json!("data")).unwrap_err();
        form.set_field("customMessage", json!("x".repeat(201))).unwrap_err();
        assert_eq!(form.field_errors().len(), 3);

        assert!(form.save().await.is_err());
        assert!(service.snapshot().is_empty());
    }

    #[tokio::test]
    async fn reset_and_discard() {
        let service = Arc::new(MockSettingsService::new());
        let mut form = SettingsForm::new("demo", Some(service), handler());
        form.load().await;
        form.set_field("showAdvancedOptions", json!(true)).unwrap();
        form.save().await.unwrap();

        form.reset();
        assert!(!form.draft().show_advanced_options);
        assert!(form.is_dirty());
        form.discard();
        assert!(form.draft().show_advanced_options);
    }

    #[tokio::test]
    async fn legacy_hosts_are_adapted() {
        let store = Arc::new(MockLegacySettingsStore::new());
        let service = HostSettings::Legacy(store.clone()).resolve();
        let mut form = SettingsForm::new("demo", Some(service), handler());
        form.load().await;
        form.set_field("enableNotifications", json!(false)).unwrap();
        form.save().await.unwrap();
        assert_eq!(store.raw("demo_settings").unwrap()["enableNotifications"], false);
    }

    #[test]
    fn unknown_and_mistyped_fields() {
        let mut settings = PluginSettings::default();
        assert!(settings.set("colour", json!("red")).is_err());
        let err = settings.set("showAdvancedOptions", json!("yes")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!settings.show_advanced_options);
    }
}
