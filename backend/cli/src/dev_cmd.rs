//! `braindrive dev`: mount the plugin against mock host services, drive a
//! short scripted session and print what the plugin renders.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use braindrive_config::KitConfig;
use braindrive_core::{PageContext, PluginConfig, Theme};
use braindrive_plugin::{ComponentProps, PluginComponent};
use braindrive_recovery::ErrorStats;
use braindrive_services::mock::{sample_data, MockApiService, MockLegacySettingsStore, MockServices};
use braindrive_services::{EventService, HostSettings, HttpMethod};
use serde_json::json;
use tracing::info;

use crate::terminal_output::{dimmed, heading, key_value_table, note_info, note_success, note_warn};

#[derive(Debug, Clone, Default)]
pub struct DevOptions {
    /// Skip the API capability; the plugin falls back to local sample data.
    pub no_api: bool,
    /// Fail this many initial API calls (overrides the config).
    pub fail_first: Option<usize>,
}

pub async fn run(config: &KitConfig, options: DevOptions) -> Result<()> {
    let dev = config.dev.clone().unwrap_or_default();
    let plugin = config.plugin.clone().unwrap_or_default();
    let refresh = config.refresh.clone().unwrap_or_default();
    let redact_logs = config.logging.as_ref().and_then(|l| l.redact_sensitive).unwrap_or(true);
    let handler_config = config.error_handling.clone().unwrap_or_default().handler_config();

    let plugin_id = plugin.id.unwrap_or_else(|| "braindrive-plugin-template".to_string());
    let module_id = plugin.module_id.unwrap_or_else(|| "PluginTemplate".to_string());
    let endpoint = refresh.data_endpoint.unwrap_or_else(|| "/api/v1/plugin-template/data".to_string());

    let mocks = MockServices::new();
    mocks.theme.simulate_theme_change(Theme::parse_lossy(dev.theme.as_deref().unwrap_or("light")));

    let api = Arc::new(
        MockApiService::new().with_latency(Duration::from_millis(dev.api_latency_ms.unwrap_or(0))),
    );
    api.route(HttpMethod::Get, endpoint.clone(), sample_data());
    let failures = options.fail_first.unwrap_or(dev.fail_first_requests.unwrap_or(0) as usize);
    if failures > 0 {
        api.fail_next(&endpoint, failures, Some(503));
    }

    let mut bundle = mocks.bundle();
    if options.no_api {
        bundle.api = None;
    } else {
        bundle = bundle.with_api(api.clone());
    }
    if dev.legacy_settings.unwrap_or(false) {
        bundle = bundle.with_settings(HostSettings::Legacy(Arc::new(MockLegacySettingsStore::new())));
        note_info("Settings are served through the legacy get/set surface");
    }

    let mut module_config = PluginConfig::new();
    module_config.insert("apiEndpoint".into(), json!(endpoint));
    module_config.insert("refreshIntervalSecs".into(), json!(refresh.interval_secs.unwrap_or(0)));

    let props = ComponentProps::new(plugin_id.clone(), module_id.clone(), bundle).with_config(module_config);
    let attempts = handler_config.retry_policy().max_attempts();
    let mut component = PluginComponent::new(props, handler_config).with_log_redaction(redact_logs);

    heading(&format!("Mounting {plugin_id}/{module_id}"));
    note_info(&format!("Each data load runs up to {attempts} attempt(s)"));
    component.mount().await?;
    print_view(&mut component);

    let mut retries = 0;
    while component.state().panel.can_retry() {
        retries += 1;
        note_warn(&format!("Data load failed; retrying from the error panel (#{retries})"));
        match component.retry().await {
            Ok(()) => {
                note_success("Retry succeeded");
                print_view(&mut component);
            }
            Err(err) => note_warn(&component.handler().presentable_message(&err)),
        }
    }

    heading("Host toggles the theme");
    let theme = mocks.theme.toggle();
    info!(%theme, "Theme toggled by dev harness");
    print_view(&mut component);

    heading("Host navigates to a studio page");
    mocks.page_context.navigate(PageContext {
        page_id: "studio-page".to_string(),
        page_name: "Studio".to_string(),
        page_route: "/studio".to_string(),
        is_studio_page: true,
    });
    mocks.event.send_message(&module_id, json!({ "type": "ping", "from": "dev-harness" }))?;
    print_view(&mut component);

    heading("Teardown");
    let released = component.teardown().await;
    note_success(&format!("Released {released} host registration(s)"));
    println!("{}", key_value_table(&stats_rows(&component.handler().error_stats())));
    println!("API calls: {}", api.call_count(&endpoint));
    Ok(())
}

fn print_view(component: &mut PluginComponent) {
    println!("{}", dimmed(&component.view().to_pretty_string()));
}

fn stats_rows(stats: &ErrorStats) -> Vec<(String, String)> {
    let mut rows = vec![("errors recorded".to_string(), stats.total.to_string())];
    rows.extend(stats.by_kind.iter().map(|(kind, n)| (format!("kind {kind}"), n.to_string())));
    rows.extend(stats.by_code.iter().map(|(code, n)| (format!("code {code}"), n.to_string())));
    rows
}
