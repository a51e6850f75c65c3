//! Plugin Event Logger
//!
//! Lifecycle events of a mounted plugin component, redacted and emitted as
//! structured `tracing` records under the `plugin_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::redact::{redact_json, redact_sensitive_data};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PluginLogEvent {
    Mounted { services: Vec<String> },
    ThemeChanged { theme: String },
    PageChanged { page_id: String },
    DataLoaded { items: usize },
    ErrorRaised {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Value::is_null")]
        details: Value,
    },
    Unmounted { released_subscriptions: usize },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub plugin_id: String,
    pub module_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: PluginLogEvent,
}

/// Emits events for one plugin module.
#[derive(Debug, Clone)]
pub struct PluginEventLogger {
    plugin_id: String,
    module_id: String,
    redact: bool,
}

impl PluginEventLogger {
    /// A logger that redacts error text and details.
    pub fn new(plugin_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self { plugin_id: plugin_id.into(), module_id: module_id.into(), redact: true }
    }

    pub fn with_redaction(mut self, redact: bool) -> Self {
        self.redact = redact;
        self
    }

    pub fn redacts(&self) -> bool {
        self.redact
    }

    /// Logs the event, redacting error text first when enabled. Returns the
    /// entry that was logged.
    pub fn log(&self, mut event: PluginLogEvent) -> EventLogEntry {
        if let (true, PluginLogEvent::ErrorRaised { message, details, .. }) = (self.redact, &mut event) {
            *message = redact_sensitive_data(message);
            redact_json(details);
        }

        let entry = EventLogEntry {
            plugin_id: self.plugin_id.clone(),
            module_id: self.module_id.clone(),
            timestamp: Utc::now(),
            event,
        };
        let payload = serde_json::to_string(&entry).unwrap_or_default();

        match entry.event {
            PluginLogEvent::ErrorRaised { .. } => {
                warn!(target: "plugin_events", plugin = %entry.plugin_id, event = %payload, "Plugin event")
            }
            _ => info!(target: "plugin_events", plugin = %entry.plugin_id, event = %payload, "Plugin event"),
        }
        entry
    }
}
