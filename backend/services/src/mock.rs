//! In-process stand-ins for the host capabilities.
//!
//! Used by the dev harness and by tests. Each mock exposes a few `simulate_*`
//! style helpers so host-side events can be driven from outside.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use braindrive_core::{NetworkError, PageContext, Theme};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::bundle::ServiceBundle;
use crate::capabilities::{
    ApiResponse, ApiService, EventService, HttpMethod, LegacySettingsStore, MessageListener,
    PageContextListener, PageContextService, SettingsService, ThemeListener, ThemeService,
};
use crate::listeners::{ListenerSet, ListenerToken};
use crate::settings::HostSettings;

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockThemeService {
    theme: RwLock<Theme>,
    listeners: ListenerSet<Theme>,
}

impl MockThemeService {
    pub fn new(theme: Theme) -> Self {
        Self { theme: RwLock::new(theme), listeners: ListenerSet::new() }
    }

    /// Change the theme and notify listeners, as the host does.
    pub fn simulate_theme_change(&self, theme: Theme) -> usize {
        *self.theme.write() = theme;
        debug!(%theme, "Mock theme changed");
        self.listeners.emit(&theme)
    }

    pub fn toggle(&self) -> Theme {
        let next = self.theme.read().toggled();
        self.simulate_theme_change(next);
        next
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ThemeService for MockThemeService {
    fn current_theme(&self) -> Result<Theme> {
        Ok(*self.theme.read())
    }

    fn add_theme_change_listener(&self, listener: ThemeListener) -> Result<ListenerToken> {
        Ok(self.listeners.add(listener))
    }

    fn remove_theme_change_listener(&self, token: ListenerToken) -> bool {
        self.listeners.remove(token)
    }
}

// ---------------------------------------------------------------------------
// Page context
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockPageContextService {
    context: RwLock<Option<PageContext>>,
    listeners: ListenerSet<PageContext>,
}

impl MockPageContextService {
    pub fn new(context: Option<PageContext>) -> Self {
        Self { context: RwLock::new(context), listeners: ListenerSet::new() }
    }

    pub fn navigate(&self, context: PageContext) -> usize {
        info!(route = %context.page_route, "Mock page navigation");
        *self.context.write() = Some(context.clone());
        self.listeners.emit(&context)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl PageContextService for MockPageContextService {
    fn current_page_context(&self) -> Result<Option<PageContext>> {
        Ok(self.context.read().clone())
    }

    fn on_page_context_change(&self, listener: PageContextListener) -> Result<ListenerToken> {
        Ok(self.listeners.add(listener))
    }

    fn remove_page_context_listener(&self, token: ListenerToken) -> bool {
        self.listeners.remove(token)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSettingsService {
    values: RwLock<HashMap<String, Value>>,
}

impl MockSettingsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: impl Into<String>, value: Value) -> Self {
        self.values.write().insert(key.into(), value);
        self
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }
}

#[async_trait]
impl SettingsService for MockSettingsService {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        debug!(key, "Mock setting saved");
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings store exposing only the legacy `get`/`set` pair.
#[derive(Default)]
pub struct MockLegacySettingsStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MockLegacySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }
}

#[async_trait]
impl LegacySettingsStore for MockLegacySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// Canned-response API. Unknown GET/DELETE routes answer 404; unknown
/// POST/PUT routes echo the body back.
#[derive(Default)]
pub struct MockApiService {
    routes: RwLock<HashMap<(HttpMethod, String), Value>>,
    scripted_failures: Mutex<HashMap<String, VecDeque<NetworkError>>>,
    calls: Mutex<Vec<(HttpMethod, String)>>,
    latency: Duration,
}

impl MockApiService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn route(&self, method: HttpMethod, url: impl Into<String>, data: Value) {
        self.routes.write().insert((method, url.into()), data);
    }

    /// Make the next `times` calls to `url` fail with `status` (`None` = connection error).
    pub fn fail_next(&self, url: &str, times: usize, status: Option<u16>) {
        let mut failures = self.scripted_failures.lock();
        let queue = failures.entry(url.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(NetworkError::new(url, status, "scripted failure"));
        }
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|(_, u)| u == url).count()
    }
}

#[async_trait]
impl ApiService for MockApiService {
    async fn request(&self, method: HttpMethod, url: &str, body: Option<Value>) -> Result<ApiResponse> {
        self.calls.lock().push((method, url.to_string()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.scripted_failures.lock().get_mut(url).and_then(VecDeque::pop_front);
        if let Some(failure) = scripted {
            debug!(%method, url, status = ?failure.status, "Mock API scripted failure");
            return Err(failure.into());
        }

        if let Some(data) = self.routes.read().get(&(method, url.to_string())) {
            return Ok(ApiResponse::ok(data.clone()));
        }

        match (method, body) {
            (HttpMethod::Post | HttpMethod::Put, Some(body)) => Ok(ApiResponse::ok(body)),
            _ => Err(NetworkError::new(url, Some(404), "no mock route").into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockEventService {
    subscribers: RwLock<HashMap<String, Arc<ListenerSet<Value>>>>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl MockEventService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_messages(&self) -> Vec<(String, Value)> {
        self.sent.lock().clone()
    }

    pub fn subscriber_count(&self, target: &str) -> usize {
        self.subscribers.read().get(target).map(|s| s.len()).unwrap_or(0)
    }
}

impl EventService for MockEventService {
    fn send_message(&self, target: &str, message: Value) -> Result<()> {
        self.sent.lock().push((target.to_string(), message.clone()));
        let listeners = self.subscribers.read().get(target).cloned();
        let delivered = listeners.map(|l| l.emit(&message)).unwrap_or(0);
        debug!(target, delivered, "Mock event delivered");
        Ok(())
    }

    fn subscribe_to_messages(&self, target: &str, listener: MessageListener) -> Result<ListenerToken> {
        let set = Arc::clone(self.subscribers.write().entry(target.to_string()).or_default());
        Ok(set.add(listener))
    }

    fn unsubscribe_from_messages(&self, target: &str, token: ListenerToken) -> bool {
        let set = self.subscribers.read().get(target).cloned();
        set.is_some_and(|s| s.remove(token))
    }
}

// ---------------------------------------------------------------------------
// Whole bundle
// ---------------------------------------------------------------------------

/// One of each mock, kept concrete so callers can drive them.
pub struct MockServices {
    pub theme: Arc<MockThemeService>,
    pub page_context: Arc<MockPageContextService>,
    pub settings: Arc<MockSettingsService>,
    pub api: Arc<MockApiService>,
    pub event: Arc<MockEventService>,
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            theme: Arc::new(MockThemeService::new(Theme::Light)),
            page_context: Arc::new(MockPageContextService::new(Some(sample_page_context()))),
            settings: Arc::new(MockSettingsService::new()),
            api: Arc::new(MockApiService::new()),
            event: Arc::new(MockEventService::new()),
        }
    }

    /// Register `data` as the GET response for `url`.
    pub fn with_sample_data(self, url: &str, data: Value) -> Self {
        self.api.route(HttpMethod::Get, url, data);
        self
    }

    pub fn bundle(&self) -> ServiceBundle {
        ServiceBundle::new()
            .with_theme(self.theme.clone())
            .with_page_context(self.page_context.clone())
            .with_settings(HostSettings::Modern(self.settings.clone()))
            .with_api(self.api.clone())
            .with_event(self.event.clone())
    }
}

impl Default for MockServices {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sample_page_context() -> PageContext {
    PageContext {
        page_id: "dev-page".to_string(),
        page_name: "Development Page".to_string(),
        page_route: "/dev".to_string(),
        is_studio_page: false,
    }
}

/// Sample payload served by the dev harness.
pub fn sample_data() -> Value {
    json!({
        "items": [
            { "id": 1, "name": "Sample Item 1", "status": "active" },
            { "id": 2, "name": "Sample Item 2", "status": "inactive" },
            { "id": 3, "name": "Sample Item 3", "status": "active" }
        ],
        "total": 3
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settings_round_trip() {
        let mocks = MockServices::new();
        let settings = mocks.bundle().settings.unwrap();
        let value = json!({ "refreshInterval": 30, "tags": ["a", "b"] });
        settings.set_setting("plugin_settings", value.clone()).await.unwrap();
        assert_eq!(settings.get_setting("plugin_settings").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn api_scripted_failures_then_route() {
        let api = MockApiService::new();
        api.route(HttpMethod::Get, "/api/data", json!({"ok": true}));
        api.fail_next("/api/data", 1, Some(503));

        let err = api.get("/api/data").await.unwrap_err();
        let net = err.downcast_ref::<NetworkError>().unwrap();
        assert_eq!(net.status, Some(503));

        let resp = api.get("/api/data").await.unwrap();
        assert_eq!(resp.data, json!({"ok": true}));
        assert_eq!(api.call_count("/api/data"), 2);
    }

    #[tokio::test]
    async fn api_unknown_route_is_404_but_post_echoes() {
        let api = MockApiService::new();
        let err = api.delete("/nothing").await.unwrap_err();
        assert_eq!(err.downcast_ref::<NetworkError>().unwrap().status, Some(404));
        let resp = api.post("/items", json!({"name": "x"})).await.unwrap();
        assert_eq!(resp.data["name"], "x");
    }

    #[test]
    fn theme_toggle_notifies() {
        let theme = MockThemeService::new(Theme::Light);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        theme.add_theme_change_listener(Arc::new(move |t: &Theme| s.lock().push(*t))).unwrap();
        assert_eq!(theme.toggle(), Theme::Dark);
        assert_eq!(theme.current_theme().unwrap(), Theme::Dark);
        assert_eq!(*seen.lock(), vec![Theme::Dark]);
    }

    #[test]
    fn events_reach_target_subscribers_only() {
        let events = MockEventService::new();
        let got = Arc::new(Mutex::new(Vec::new()));
        let g = got.clone();
        let token = events
            .subscribe_to_messages("module-b", Arc::new(move |m: &Value| g.lock().push(m.clone())))
            .unwrap();
        events.send_message("module-b", json!({"type": "refresh"})).unwrap();
        events.send_message("module-c", json!({"type": "ignored"})).unwrap();
        assert_eq!(got.lock().len(), 1);
        assert!(events.unsubscribe_from_messages("module-b", token));
        assert_eq!(events.sent_messages().len(), 2);
    }
}
