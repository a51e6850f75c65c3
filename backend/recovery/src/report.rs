//! Error reporting hooks.
//!
//! Reporting is fire-and-forget diagnostics: reporters never fail and their
//! output has no effect on the recovery path.

use braindrive_core::PluginError;
use parking_lot::Mutex;
use tracing::info;

pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &PluginError);
}

/// Emits each report as a structured event on the `plugin_error_reports` target.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &PluginError) {
        let context = error.context.as_ref();
        info!(
            target: "plugin_error_reports",
            kind = %error.kind,
            code = %error.code,
            recoverable = error.recoverable,
            component = context.map(|c| c.component.as_str()).unwrap_or(""),
            plugin_id = context.and_then(|c| c.plugin_id.as_deref()).unwrap_or(""),
            "{}",
            error.message
        );
    }
}

/// Keeps every report in memory. Used by the dev harness and tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<PluginError>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<PluginError> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ErrorReporter for MemoryReporter {
    fn report(&self, error: &PluginError) {
        self.reports.lock().push(error.clone());
    }
}
