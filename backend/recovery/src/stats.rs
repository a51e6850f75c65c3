use std::collections::BTreeMap;

use braindrive_core::{ErrorKind, PluginError};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Running failure counters kept by an [`crate::ErrorHandler`].
///
/// Advisory only; nothing in the recovery path reads these back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub total: u64,
    pub by_kind: BTreeMap<ErrorKind, u64>,
    pub by_code: BTreeMap<String, u64>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl ErrorStats {
    pub fn record(&mut self, error: &PluginError) {
        self.total += 1;
        *self.by_kind.entry(error.kind).or_default() += 1;
        *self.by_code.entry(error.code.clone()).or_default() += 1;
        self.last_error_at = Some(error.timestamp);
    }

    pub fn count_for_kind(&self, kind: ErrorKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn count_for_code(&self, code: &str) -> u64 {
        self.by_code.get(code).copied().unwrap_or(0)
    }
}
