//! Structured logging for BrainDrive plugins.
//!
//! Log redaction, JSON file output with daily rotation, and plugin lifecycle
//! event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, PluginEventLogger, PluginLogEvent};
pub use logger::init_logger;
pub use redact::{redact_json, redact_sensitive_data};
