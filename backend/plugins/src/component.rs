//! The plugin component: explicit state, lifecycle, and a pure render.
//!
//! State lives behind `Arc<RwLock<_>>` so host listener callbacks and the
//! refresh task can update it. Teardown flips a liveness flag and aborts
//! every task the component spawned; results that resolve afterwards are
//! dropped without touching state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use braindrive_core::{
    ErrorContext, ErrorKind, NetworkError, PageContext, PluginConfig, PluginError, PluginResult, ServiceName, Theme,
};
use braindrive_logging::{PluginEventLogger, PluginLogEvent};
use braindrive_recovery::{user_message, ErrorHandler, HandlerConfig, RecoveryStrategy};
use braindrive_services::mock::sample_data;
use braindrive_services::{ApiService, ServiceBundle, Subscriptions};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::boundary::{BoundaryKey, ErrorBoundary};
use crate::lifecycle::{
    finish_mount, run_teardown_hooks, DefaultPluginLifecycle, PluginLifecycle, PluginLifecycleContext,
    PluginState,
};
use crate::panel::{ErrorPanel, RetryDecision};
use crate::settings::{settings_key, PluginSettings};
use crate::view::ViewNode;

/// Messages kept from the event bus.
const MAX_MESSAGES: usize = 50;

/// What the host passes to a plugin instance.
#[derive(Clone)]
pub struct ComponentProps {
    pub plugin_id: String,
    pub module_id: String,
    pub instance_id: String,
    pub config: PluginConfig,
    pub services: ServiceBundle,
}

impl ComponentProps {
    pub fn new(plugin_id: impl Into<String>, module_id: impl Into<String>, services: ServiceBundle) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            module_id: module_id.into(),
            instance_id: Uuid::new_v4().to_string(),
            config: PluginConfig::new(),
            services,
        }
    }

    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComponentState {
    pub is_loading: bool,
    pub is_initializing: bool,
    pub error: Option<PluginError>,
    /// Capability and configuration problems found during mount. They do
    /// not block the content.
    pub init_errors: Vec<PluginError>,
    pub current_theme: Theme,
    pub page_context: Option<PageContext>,
    pub data: Option<Value>,
    pub last_updated: Option<DateTime<Utc>>,
    pub settings: PluginSettings,
    pub messages: Vec<Value>,
    pub panel: ErrorPanel,
}

type SharedState = Arc<RwLock<ComponentState>>;

pub type Renderer = Arc<dyn Fn(&ComponentState) -> ViewNode + Send + Sync>;

/// Loads data into shared state. Cloned into background tasks.
#[derive(Clone)]
struct DataLoader {
    api: Option<Arc<dyn ApiService>>,
    handler: ErrorHandler,
    state: SharedState,
    alive: Arc<AtomicBool>,
    events: PluginEventLogger,
}

impl DataLoader {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn load(&self) -> PluginResult<()> {
        if !self.is_alive() {
            return Ok(());
        }
        let endpoint = {
            let mut state = self.state.write();
            state.is_loading = true;
            state.settings.api_endpoint.clone()
        };

        let result = match &self.api {
            Some(api) => {
                self.handler
                    .safe_async(|| fetch(api.as_ref(), &endpoint), None, RecoveryStrategy::Retry)
                    .await
            }
            None => Ok(Some(sample_data())),
        };

        if !self.is_alive() {
            debug!(endpoint = %endpoint, "Dropping load result for torn-down component");
            return Ok(());
        }

        match result {
            Ok(Some(data)) => {
                let items = item_count(&data);
                {
                    let mut state = self.state.write();
                    state.is_loading = false;
                    state.data = Some(data);
                    state.error = None;
                    state.last_updated = Some(Utc::now());
                    state.panel.clear();
                }
                self.events.log(PluginLogEvent::DataLoaded { items });
                Ok(())
            }
            Ok(None) => {
                self.state.write().is_loading = false;
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.write();
                    state.is_loading = false;
                    state.error = Some(err.clone());
                    state.panel.show(err.clone());
                }
                self.events.log(PluginLogEvent::ErrorRaised {
                    code: err.code.clone(),
                    message: err.message.clone(),
                    details: err.details.clone(),
                });
                Err(err)
            }
        }
    }
}

async fn fetch(api: &dyn ApiService, url: &str) -> anyhow::Result<Value> {
    let response = api.get(url).await.with_context(|| format!("GET {url}"))?;
    if response.status >= 400 {
        return Err(NetworkError::new(
            url,
            Some(response.status),
            format!("Request failed with status {}", response.status),
        )
        .into());
    }
    Ok(response.data)
}

fn item_count(data: &Value) -> usize {
    match data {
        Value::Array(items) => items.len(),
        other => other.get("items").and_then(Value::as_array).map_or(0, Vec::len),
    }
}

pub struct PluginComponent {
    props: ComponentProps,
    handler: ErrorHandler,
    state: SharedState,
    subscriptions: Subscriptions,
    alive: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
    phase: PluginState,
    lifecycle: Arc<dyn PluginLifecycle>,
    renderer: Renderer,
    boundary: ErrorBoundary,
    events: PluginEventLogger,
}

impl PluginComponent {
    pub fn new(props: ComponentProps, config: HandlerConfig) -> Self {
        let context = ErrorContext::new("PluginComponent")
            .with_plugin(props.plugin_id.clone())
            .with_module(props.module_id.clone());
        Self::with_handler(props, ErrorHandler::new(config, context))
    }

    /// Build with an existing handler, sharing its statistics.
    pub fn with_handler(props: ComponentProps, handler: ErrorHandler) -> Self {
        let mut state = ComponentState {
            panel: ErrorPanel::new(handler.config().max_retries),
            ..Default::default()
        };
        match PluginSettings::from_config(&props.config) {
            Ok(settings) => state.settings = settings,
            Err(err) => state.init_errors.push(handler.record_error(err)),
        }

        let key = BoundaryKey::new(props.plugin_id.clone(), props.module_id.clone());
        let boundary = ErrorBoundary::new(handler.scoped(ErrorContext::new("ErrorBoundary")), key);
        Self {
            subscriptions: Subscriptions::new(props.services.clone()),
            events: PluginEventLogger::new(props.plugin_id.clone(), props.module_id.clone()),
            state: Arc::new(RwLock::new(state)),
            alive: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
            phase: PluginState::Unmounted,
            lifecycle: Arc::new(DefaultPluginLifecycle),
            renderer: Arc::new(render),
            boundary,
            handler,
            props,
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn PluginLifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Whether error text in plugin event logs is redacted. On by default.
    pub fn with_log_redaction(mut self, redact: bool) -> Self {
        self.events = self.events.clone().with_redaction(redact);
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn props(&self) -> &ComponentProps {
        &self.props
    }

    pub fn handler(&self) -> &ErrorHandler {
        &self.handler
    }

    pub fn phase(&self) -> PluginState {
        self.phase
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ComponentState {
        self.state.read().clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn running_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn lifecycle_ctx(&self) -> PluginLifecycleContext {
        PluginLifecycleContext {
            plugin_id: self.props.plugin_id.clone(),
            module_id: self.props.module_id.clone(),
            instance_id: self.props.instance_id.clone(),
        }
    }

    fn loader(&self) -> DataLoader {
        DataLoader {
            api: self.props.services.api.clone(),
            handler: self.handler.clone(),
            state: self.state.clone(),
            alive: self.alive.clone(),
            events: self.events.clone(),
        }
    }

    /// Initialize capabilities, load initial data and start auto refresh.
    ///
    /// Each capability is initialized on its own; a failure is recorded as a
    /// `ServiceInit` error and the others still initialize. A failed data
    /// load shows the error panel but does not fail the mount. Only a
    /// `before_mount` hook failure aborts.
    pub async fn mount(&mut self) -> PluginResult<()> {
        if !self.phase.can_mount() {
            return Err(PluginError::component("Component is already mounted").with_recoverable(false));
        }
        if self.phase == PluginState::Failed {
            let released = self.release_resources();
            debug!(plugin = %self.props.plugin_id, released, "Released resources of failed mount");
            self.state.write().init_errors.retain(|e| e.kind != ErrorKind::ServiceInit);
        }
        self.phase = PluginState::Mounting;
        self.alive.store(true, Ordering::SeqCst);
        self.state.write().is_initializing = true;

        let ctx = self.lifecycle_ctx();
        if let Err(e) = self.lifecycle.before_mount(&ctx).await {
            let err = self.handler.handle_error(e.context("before_mount hook failed"));
            {
                let mut state = self.state.write();
                state.is_initializing = false;
                state.error = Some(err.clone());
            }
            self.alive.store(false, Ordering::SeqCst);
            self.phase = PluginState::Failed;
            return Err(err);
        }

        if let Err(e) = self.init_theme() {
            self.init_failed(ServiceName::Theme, e);
        }
        if let Err(e) = self.init_page_context() {
            self.init_failed(ServiceName::PageContext, e);
        }
        if let Err(e) = self.init_settings().await {
            self.init_failed(ServiceName::Settings, e);
        }
        if let Err(e) = self.init_messages() {
            self.init_failed(ServiceName::Event, e);
        }
        self.state.write().is_initializing = false;

        if let Err(err) = self.loader().load().await {
            warn!(plugin = %self.props.plugin_id, code = %err.code, "Initial data load failed");
        }
        self.start_refresh_task();

        self.phase = finish_mount(self.lifecycle.as_ref(), &ctx).await;
        self.events.log(PluginLogEvent::Mounted {
            services: self.props.services.available().iter().map(|s| s.as_str().to_string()).collect(),
        });
        Ok(())
    }

    fn init_failed(&self, service: ServiceName, e: anyhow::Error) {
        let err = self.handler.record_error(PluginError::service_init(service, format!("{e:#}")));
        self.state.write().init_errors.push(err);
    }

    fn init_theme(&mut self) -> anyhow::Result<()> {
        let Some(theme) = self.props.services.theme.clone() else {
            return Ok(());
        };
        self.state.write().current_theme = theme.current_theme()?;

        let state = self.state.clone();
        let alive = self.alive.clone();
        let events = self.events.clone();
        self.subscriptions.on_theme_change(Arc::new(move |theme: &Theme| {
            if !alive.load(Ordering::SeqCst) {
                return;
            }
            state.write().current_theme = *theme;
            events.log(PluginLogEvent::ThemeChanged { theme: theme.to_string() });
        }))?;
        Ok(())
    }

    fn init_page_context(&mut self) -> anyhow::Result<()> {
        let Some(pages) = self.props.services.page_context.clone() else {
            return Ok(());
        };
        self.state.write().page_context = pages.current_page_context()?;

        let state = self.state.clone();
        let alive = self.alive.clone();
        let events = self.events.clone();
        self.subscriptions.on_page_context_change(Arc::new(move |page: &PageContext| {
            if !alive.load(Ordering::SeqCst) {
                return;
            }
            state.write().page_context = Some(page.clone());
            events.log(PluginLogEvent::PageChanged { page_id: page.page_id.clone() });
        }))?;
        Ok(())
    }

    /// Persisted settings override the host config. A malformed stored value
    /// is a validation problem, not a capability failure.
    async fn init_settings(&mut self) -> anyhow::Result<()> {
        let Some(service) = self.props.services.settings.clone() else {
            return Ok(());
        };
        let key = settings_key(&self.props.plugin_id);
        let Some(stored) = service.get_setting(&key).await? else {
            return Ok(());
        };
        match PluginSettings::from_value(&stored) {
            Ok(settings) => self.state.write().settings = settings,
            Err(err) => {
                let err = self.handler.record_error(err);
                self.state.write().init_errors.push(err);
            }
        }
        Ok(())
    }

    fn init_messages(&mut self) -> anyhow::Result<()> {
        if self.props.services.event.is_none() {
            return Ok(());
        }
        let state = self.state.clone();
        let alive = self.alive.clone();
        let target = self.props.module_id.clone();
        self.subscriptions.on_message(&target, Arc::new(move |message: &Value| {
            if !alive.load(Ordering::SeqCst) {
                return;
            }
            let mut state = state.write();
            state.messages.push(message.clone());
            let overflow = state.messages.len().saturating_sub(MAX_MESSAGES);
            state.messages.drain(..overflow);
        }))?;
        Ok(())
    }

    fn start_refresh_task(&mut self) {
        let secs = self.state.read().settings.refresh_interval_secs;
        if secs == 0 {
            return;
        }
        let loader = self.loader();
        let period = Duration::from_secs(secs);
        debug!(plugin = %self.props.plugin_id, secs, "Starting refresh task");
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !loader.is_alive() {
                    break;
                }
                let _ = loader.load().await;
            }
        }));
    }

    /// Reload data now.
    pub async fn refresh(&self) -> PluginResult<()> {
        if !self.phase.is_active() {
            return Err(PluginError::component("Component is not mounted").with_recoverable(false));
        }
        self.loader().load().await
    }

    /// Reload data in the background. The task is aborted on teardown.
    pub fn spawn_refresh(&mut self) {
        self.tasks.retain(|t| !t.is_finished());
        let loader = self.loader();
        self.tasks.push(tokio::spawn(async move {
            let _ = loader.load().await;
        }));
    }

    /// Retry after an error, as offered by the error panel.
    pub async fn retry(&self) -> PluginResult<()> {
        let decision = self.state.write().panel.begin_retry();
        match decision {
            RetryDecision::NothingToRetry => Ok(()),
            RetryDecision::Exhausted => {
                let err = self.state.read().error.clone().unwrap_or_else(|| {
                    PluginError::component("Retry limit reached").with_recoverable(false)
                });
                Err(err.requiring_user_action())
            }
            RetryDecision::Allowed(attempt) => {
                info!(plugin = %self.props.plugin_id, attempt, "Retrying after error");
                self.state.write().error = None;
                self.loader().load().await
            }
        }
    }

    pub fn dismiss_error(&self) {
        self.state.write().panel.dismiss();
    }

    /// Change the identifying props. The error boundary resets on the next
    /// render.
    pub fn set_identity(&mut self, plugin_id: impl Into<String>, module_id: impl Into<String>) {
        self.props.plugin_id = plugin_id.into();
        self.props.module_id = module_id.into();
    }

    /// Render the current state under the error boundary.
    pub fn view(&mut self) -> ViewNode {
        let snapshot = self.state();
        let key = BoundaryKey::new(self.props.plugin_id.clone(), self.props.module_id.clone());
        let renderer = self.renderer.clone();
        self.boundary.render(&key, || renderer(&snapshot))
    }

    /// Release every registration and stop every task. Returns how many
    /// registrations were released.
    pub async fn teardown(&mut self) -> usize {
        if matches!(self.phase, PluginState::Unmounted | PluginState::TearingDown) {
            return 0;
        }
        self.phase = PluginState::TearingDown;
        self.stop_tasks();

        let ctx = self.lifecycle_ctx();
        let mut released = 0;
        let subscriptions = &mut self.subscriptions;
        self.phase = run_teardown_hooks(self.lifecycle.as_ref(), &ctx, || {
            released = subscriptions.release_all();
        })
        .await;
        self.state.write().is_loading = false;
        self.events.log(PluginLogEvent::Unmounted { released_subscriptions: released });
        released
    }
}

impl PluginComponent {
    fn stop_tasks(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Stop tasks and drop registrations left by a mount that did not reach
    /// `Active`. Lifecycle hooks do not run.
    fn release_resources(&mut self) -> usize {
        self.stop_tasks();
        self.subscriptions.release_all()
    }
}

impl Drop for PluginComponent {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Default view of the template module. Pure in `state`.
pub fn render(state: &ComponentState) -> ViewNode {
    let theme = state.current_theme;
    let root = ViewNode::element("div").class("plugin-template").class(format!("theme-{theme}"));

    if state.is_initializing {
        return root.child(ViewNode::element("div").class("loading").child(ViewNode::text("Initializing plugin...")));
    }

    let page = match &state.page_context {
        Some(page) => format!("Page: {} ({})", page.page_name, page.page_route),
        None => "No page context".to_string(),
    };
    let mut root = root.child(
        ViewNode::element("header")
            .child(ViewNode::element("h2").child(ViewNode::text("Plugin Template")))
            .child(ViewNode::text(format!("Theme: {theme}")))
            .child(ViewNode::text(page)),
    );

    if !state.init_errors.is_empty() {
        root = root.child(
            ViewNode::element("ul")
                .class("plugin-warnings")
                .children(state.init_errors.iter().map(|e| ViewNode::text(user_message(e)))),
        );
    }
    if let Some(panel) = state.panel.render() {
        root = root.child(panel);
    }
    if !state.settings.custom_message.is_empty() {
        root = root.child(ViewNode::element("p").class("custom-message").child(ViewNode::text(
            state.settings.custom_message.clone(),
        )));
    }

    root = root.child(render_data(state));

    let updated = match state.last_updated {
        Some(at) => format!("Last updated: {}", at.format("%H:%M:%S")),
        None => "Never updated".to_string(),
    };
    let mut footer = ViewNode::element("footer")
        .child(ViewNode::text(updated))
        .child(ViewNode::button("refresh", "Refresh", state.is_loading));
    if state.settings.show_advanced_options {
        footer = footer.child(
            ViewNode::element("div")
                .class("advanced")
                .child(ViewNode::text(format!("Endpoint: {}", state.settings.api_endpoint)))
                .child(ViewNode::text(format!(
                    "Auto refresh: {}",
                    match state.settings.refresh_interval_secs {
                        0 => "off".to_string(),
                        secs => format!("every {secs}s"),
                    }
                ))),
        );
    }
    root.child(footer)
}

fn render_data(state: &ComponentState) -> ViewNode {
    let section = ViewNode::element("section").class("plugin-data");
    let items = state.data.as_ref().and_then(|d| match d {
        Value::Array(items) => Some(items),
        other => other.get("items").and_then(Value::as_array),
    });
    match items {
        Some(items) if !items.is_empty() => section.child(ViewNode::element("ul").class("data-list").children(
            items.iter().map(|item| {
                let name = item.get("name").and_then(Value::as_str).unwrap_or("Unnamed");
                match item.get("status").and_then(Value::as_str) {
                    Some(status) => ViewNode::text(format!("{name} ({status})")),
                    None => ViewNode::text(name),
                }
            }),
        )),
        _ if state.is_loading => section.child(ViewNode::text("Loading data...")),
        _ if state.error.is_some() => section,
        _ => section.child(ViewNode::text("No data available")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_API_ENDPOINT;
    use anyhow::anyhow;
    use braindrive_services::mock::{sample_page_context, MockApiService, MockServices, MockSettingsService};
    use braindrive_services::{EventService, HostSettings, HttpMethod, ListenerToken, ThemeListener, ThemeService};
    use serde_json::json;

    fn fast_config(max_retries: u32) -> HandlerConfig {
        HandlerConfig { max_retries, retry_delay_ms: 5, enable_logging: false, ..Default::default() }
    }

    fn mocks() -> MockServices {
        MockServices::new().with_sample_data(DEFAULT_API_ENDPOINT, sample_data())
    }

    fn component(services: ServiceBundle, max_retries: u32) -> PluginComponent {
        PluginComponent::new(ComponentProps::new("demo", "PluginTemplate", services), fast_config(max_retries))
    }

    struct BrokenTheme;

    impl ThemeService for BrokenTheme {
        fn current_theme(&self) -> anyhow::Result<Theme> {
            Err(anyhow!("theme bridge offline"))
        }
        fn add_theme_change_listener(&self, _: ThemeListener) -> anyhow::Result<ListenerToken> {
            Err(anyhow!("theme bridge offline"))
        }
        fn remove_theme_change_listener(&self, _: ListenerToken) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn mount_initializes_everything() {
        let mocks = mocks();
        let mut c = component(mocks.bundle(), 3);
        c.mount().await.unwrap();

        let state = c.state();
        assert_eq!(c.phase(), PluginState::Active);
        assert!(!state.is_initializing && !state.is_loading);
        assert_eq!(state.page_context, Some(sample_page_context()));
        assert_eq!(item_count(state.data.as_ref().unwrap()), 3);
        assert!(state.init_errors.is_empty());
        assert_eq!(c.subscription_count(), 3);

        let view = c.view();
        assert!(view.has_class("theme-light"));
        assert!(view.text_content().contains("Sample Item 2 (inactive)"));
    }

    #[tokio::test]
    async fn listeners_update_state_until_teardown() {
        let mocks = mocks();
        let mut c = component(mocks.bundle(), 3);
        c.mount().await.unwrap();

        mocks.theme.simulate_theme_change(Theme::Dark);
        assert_eq!(c.state().current_theme, Theme::Dark);
        mocks.event.send_message("PluginTemplate", json!({"hello": 1})).unwrap();
        assert_eq!(c.state().messages.len(), 1);

        assert_eq!(c.teardown().await, 3);
        assert_eq!(mocks.theme.listener_count(), 0);
        assert_eq!(mocks.page_context.listener_count(), 0);
        assert_eq!(mocks.event.subscriber_count("PluginTemplate"), 0);

        mocks.theme.simulate_theme_change(Theme::Light);
        assert_eq!(c.state().current_theme, Theme::Dark);
        assert_eq!(c.phase(), PluginState::Unmounted);
    }

    #[tokio::test]
    async fn capability_failures_are_isolated() {
        let mocks = mocks();
        let bundle = mocks.bundle().with_theme(Arc::new(BrokenTheme));
        let mut c = component(bundle, 3);
        c.mount().await.unwrap();

        let state = c.state();
        assert_eq!(state.init_errors.len(), 1);
        assert_eq!(state.init_errors[0].code, "THEME_SERVICE_ERROR");
        assert_eq!(state.init_errors[0].kind, ErrorKind::ServiceInit);
        assert!(state.page_context.is_some());
        assert!(state.data.is_some());
        assert_eq!(c.handler().error_stats().count_for_code("THEME_SERVICE_ERROR"), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let mocks = mocks();
        mocks.api.fail_next(DEFAULT_API_ENDPOINT, 2, Some(503));
        let mut c = component(mocks.bundle(), 2);
        c.mount().await.unwrap();

        assert!(c.state().data.is_some());
        assert!(c.state().error.is_none());
        assert_eq!(mocks.api.call_count(DEFAULT_API_ENDPOINT), 3);
        assert_eq!(c.handler().error_stats().count_for_kind(ErrorKind::Network), 2);
    }

    #[tokio::test]
    async fn retry_from_panel_until_exhausted() {
        let mocks = mocks();
        mocks.api.fail_next(DEFAULT_API_ENDPOINT, 10, Some(503));
        let mut c = component(mocks.bundle(), 1);
        c.mount().await.unwrap();

        let state = c.state();
        assert_eq!(state.error.as_ref().unwrap().kind, ErrorKind::Network);
        assert!(state.panel.is_visible());

        assert!(c.retry().await.is_err());
        let err = c.retry().await.unwrap_err();
        assert!(err.requires_user_action);
        let view = c.view();
        assert!(view.find_class("terminal").is_some());
        // Initial load (2 attempts) + one manual retry (2 attempts).
        assert_eq!(mocks.api.call_count(DEFAULT_API_ENDPOINT), 4);
    }

    #[tokio::test]
    async fn retry_recovers_and_clears_panel() {
        let mocks = mocks();
        mocks.api.fail_next(DEFAULT_API_ENDPOINT, 2, Some(500));
        let mut c = component(mocks.bundle(), 1);
        c.mount().await.unwrap();
        assert!(c.state().error.is_some());

        c.retry().await.unwrap();
        let state = c.state();
        assert!(state.error.is_none());
        assert!(!state.panel.is_visible());
        assert!(state.data.is_some());
    }

    #[tokio::test]
    async fn works_without_any_capability() {
        let mut c = component(ServiceBundle::new(), 3);
        c.mount().await.unwrap();
        let state = c.state();
        assert_eq!(state.current_theme, Theme::Light);
        assert!(state.page_context.is_none());
        assert_eq!(item_count(state.data.as_ref().unwrap()), 3);
        assert_eq!(c.teardown().await, 0);
    }

    #[tokio::test]
    async fn late_results_after_teardown_are_dropped() {
        let mocks = mocks();
        let api = Arc::new(MockApiService::new().with_latency(Duration::from_millis(50)));
        api.route(HttpMethod::Get, DEFAULT_API_ENDPOINT, json!({"items": [{"name": "fresh"}]}));
        let mut c = component(mocks.bundle().with_api(api.clone()), 0);
        c.mount().await.unwrap();
        let first_update = c.state().last_updated;

        c.spawn_refresh();
        c.teardown().await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(c.state().last_updated, first_update);
        assert_eq!(c.running_tasks(), 0);
    }

    #[tokio::test]
    async fn refresh_task_follows_settings() {
        let mocks = mocks();
        let mut config = PluginConfig::new();
        config.insert("refreshIntervalSecs".into(), json!(60));
        let props = ComponentProps::new("demo", "PluginTemplate", mocks.bundle()).with_config(config);
        let mut c = PluginComponent::new(props, fast_config(0));
        c.mount().await.unwrap();
        assert_eq!(c.running_tasks(), 1);
        c.teardown().await;
        assert_eq!(c.running_tasks(), 0);
    }

    #[tokio::test]
    async fn malformed_persisted_settings_use_defaults() {
        let mocks = mocks();
        let settings = Arc::new(
            MockSettingsService::new().with_value("demo_settings", json!({"refreshIntervalSecs": "soon"})),
        );
        let bundle = mocks.bundle().with_settings(HostSettings::Modern(settings));
        let mut c = component(bundle, 3);
        c.mount().await.unwrap();

        let state = c.state();
        assert_eq!(state.settings, PluginSettings::default());
        assert_eq!(state.init_errors[0].kind, ErrorKind::Validation);
        assert!(state.data.is_some());
    }

    #[tokio::test]
    async fn boundary_catches_render_panics_and_resets_on_identity_change() {
        let mut c = component(mocks().bundle(), 3)
            .with_renderer(Arc::new(|state: &ComponentState| {
                if state.data.is_some() {
                    panic!("cannot render data");
                }
                ViewNode::text("empty")
            }));
        assert_eq!(c.view(), ViewNode::text("empty"));

        c.mount().await.unwrap();
        let view = c.view();
        assert!(view.has_class("plugin-error-boundary"));
        assert_eq!(c.handler().error_stats().count_for_kind(ErrorKind::Component), 1);

        c.set_identity("demo", "OtherModule");
        c.renderer = Arc::new(render);
        assert!(c.view().has_class("plugin-template"));
    }

    #[tokio::test]
    async fn double_mount_is_rejected() {
        let mut c = component(mocks().bundle(), 3);
        c.mount().await.unwrap();
        assert_eq!(c.mount().await.unwrap_err().kind, ErrorKind::Component);
    }

    struct RejectingAfterMount;

    #[async_trait::async_trait]
    impl PluginLifecycle for RejectingAfterMount {
        async fn before_mount(&self, _: &PluginLifecycleContext) -> anyhow::Result<()> {
            Ok(())
        }
        async fn after_mount(&self, _: &PluginLifecycleContext) -> anyhow::Result<()> {
            Err(anyhow!("analytics unavailable"))
        }
        async fn before_teardown(&self, _: &PluginLifecycleContext) -> anyhow::Result<()> {
            Ok(())
        }
        async fn after_teardown(&self, _: &PluginLifecycleContext) {}
    }

    #[tokio::test]
    async fn remount_after_failed_mount_does_not_duplicate_registrations() {
        let mocks = mocks();
        let mut config = PluginConfig::new();
        config.insert("refreshIntervalSecs".into(), json!(60));
        let props = ComponentProps::new("demo", "PluginTemplate", mocks.bundle().with_theme(Arc::new(BrokenTheme)))
            .with_config(config);
        let mut c = PluginComponent::new(props, fast_config(0)).with_lifecycle(Arc::new(RejectingAfterMount));

        c.mount().await.unwrap();
        assert_eq!(c.phase(), PluginState::Failed);
        assert_eq!(c.subscription_count(), 2);
        assert_eq!(c.running_tasks(), 1);
        assert_eq!(c.state().init_errors.len(), 1);

        c.mount().await.unwrap();
        assert_eq!(c.phase(), PluginState::Failed);
        assert_eq!(c.subscription_count(), 2);
        assert_eq!(c.running_tasks(), 1);
        assert_eq!(c.state().init_errors.len(), 1);
        assert_eq!(mocks.page_context.listener_count(), 1);
        assert_eq!(mocks.event.subscriber_count("PluginTemplate"), 1);

        assert_eq!(c.teardown().await, 2);
        assert_eq!(mocks.page_context.listener_count(), 0);
        assert_eq!(c.running_tasks(), 0);
    }

    #[tokio::test]
    async fn remount_after_failed_mount_keeps_one_theme_listener() {
        let mocks = mocks();
        let mut c = component(mocks.bundle(), 0).with_lifecycle(Arc::new(RejectingAfterMount));
        c.mount().await.unwrap();
        c.mount().await.unwrap();
        assert_eq!(mocks.theme.listener_count(), 1);
        assert_eq!(c.subscription_count(), 3);

        mocks.theme.simulate_theme_change(Theme::Dark);
        assert_eq!(c.state().current_theme, Theme::Dark);
    }

    #[test]
    fn event_log_redaction_follows_setting() {
        assert!(component(mocks().bundle(), 0).events.redacts());
        assert!(!component(mocks().bundle(), 0).with_log_redaction(false).events.redacts());
    }

    #[tokio::test]
    async fn refresh_requires_mount() {
        let c = component(mocks().bundle(), 3);
        assert!(c.refresh().await.is_err());
    }
}
