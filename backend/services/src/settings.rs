//! Settings adapter: hosts that only expose the legacy `get`/`set` pair are
//! wrapped once, at bundle construction, so the rest of the plugin only ever
//! sees [`SettingsService`].

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::capabilities::{LegacySettingsStore, SettingsService};

pub struct LegacySettingsAdapter {
    inner: Arc<dyn LegacySettingsStore>,
}

impl LegacySettingsAdapter {
    pub fn new(inner: Arc<dyn LegacySettingsStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SettingsService for LegacySettingsAdapter {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        debug!(key, "Reading setting through legacy store");
        self.inner
            .get(key)
            .await
            .with_context(|| format!("legacy settings get failed for '{key}'"))
    }

    async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        debug!(key, "Writing setting through legacy store");
        self.inner
            .set(key, value)
            .await
            .with_context(|| format!("legacy settings set failed for '{key}'"))
    }
}

/// What a host handed us for settings, before resolution.
pub enum HostSettings {
    Modern(Arc<dyn SettingsService>),
    Legacy(Arc<dyn LegacySettingsStore>),
}

impl HostSettings {
    pub fn resolve(self) -> Arc<dyn SettingsService> {
        match self {
            Self::Modern(service) => service,
            Self::Legacy(store) => Arc::new(LegacySettingsAdapter::new(store)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockLegacySettingsStore, MockSettingsService};
    use serde_json::json;

    #[tokio::test]
    async fn legacy_store_round_trips_through_adapter() {
        let store = Arc::new(MockLegacySettingsStore::new());
        let settings = HostSettings::Legacy(store.clone()).resolve();
        settings.set_setting("theme_pref", json!({"compact": true})).await.unwrap();
        assert_eq!(settings.get_setting("theme_pref").await.unwrap(), Some(json!({"compact": true})));
        assert_eq!(store.raw("theme_pref"), Some(json!({"compact": true})));
    }

    #[tokio::test]
    async fn modern_service_passes_through() {
        let settings = HostSettings::Modern(Arc::new(MockSettingsService::new())).resolve();
        settings.set_setting("k", json!(3)).await.unwrap();
        assert_eq!(settings.get_setting("k").await.unwrap(), Some(json!(3)));
        assert_eq!(settings.get_setting("missing").await.unwrap(), None);
    }
}
