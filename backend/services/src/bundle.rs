//! The capability bundle a host injects, and the owned set of registrations a
//! plugin instance makes against it.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use braindrive_core::ServiceName;
use tracing::debug;

use crate::capabilities::{
    ApiService, EventService, MessageListener, PageContextListener, PageContextService,
    SettingsService, ThemeListener, ThemeService,
};
use crate::listeners::ListenerToken;
use crate::settings::HostSettings;

/// Every capability is optional; hosts may omit any of them.
#[derive(Clone, Default)]
pub struct ServiceBundle {
    pub theme: Option<Arc<dyn ThemeService>>,
    pub page_context: Option<Arc<dyn PageContextService>>,
    pub settings: Option<Arc<dyn SettingsService>>,
    pub api: Option<Arc<dyn ApiService>>,
    pub event: Option<Arc<dyn EventService>>,
}

impl ServiceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, service: Arc<dyn ThemeService>) -> Self {
        self.theme = Some(service);
        self
    }

    pub fn with_page_context(mut self, service: Arc<dyn PageContextService>) -> Self {
        self.page_context = Some(service);
        self
    }

    /// Accepts either settings surface; legacy stores are adapted here.
    pub fn with_settings(mut self, settings: HostSettings) -> Self {
        self.settings = Some(settings.resolve());
        self
    }

    pub fn with_api(mut self, service: Arc<dyn ApiService>) -> Self {
        self.api = Some(service);
        self
    }

    pub fn with_event(mut self, service: Arc<dyn EventService>) -> Self {
        self.event = Some(service);
        self
    }

    pub fn has(&self, name: ServiceName) -> bool {
        match name {
            ServiceName::Theme => self.theme.is_some(),
            ServiceName::PageContext => self.page_context.is_some(),
            ServiceName::Settings => self.settings.is_some(),
            ServiceName::Api => self.api.is_some(),
            ServiceName::Event => self.event.is_some(),
        }
    }

    pub fn available(&self) -> Vec<ServiceName> {
        ServiceName::ALL.into_iter().filter(|n| self.has(*n)).collect()
    }
}

impl std::fmt::Debug for ServiceBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBundle").field("available", &self.available()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Registration {
    Theme(ListenerToken),
    PageContext(ListenerToken),
    Messages { target: String, token: ListenerToken },
}

/// Registrations owned by one plugin instance.
///
/// Released on [`Subscriptions::release_all`] or when dropped.
pub struct Subscriptions {
    services: ServiceBundle,
    registrations: Vec<Registration>,
}

impl Subscriptions {
    pub fn new(services: ServiceBundle) -> Self {
        Self { services, registrations: Vec::new() }
    }

    pub fn on_theme_change(&mut self, listener: ThemeListener) -> Result<ListenerToken> {
        let service = self
            .services
            .theme
            .as_ref()
            .ok_or_else(|| anyhow!("theme service not available"))?;
        let token = service.add_theme_change_listener(listener)?;
        self.registrations.push(Registration::Theme(token));
        Ok(token)
    }

    pub fn on_page_context_change(&mut self, listener: PageContextListener) -> Result<ListenerToken> {
        let service = self
            .services
            .page_context
            .as_ref()
            .ok_or_else(|| anyhow!("page context service not available"))?;
        let token = service.on_page_context_change(listener)?;
        self.registrations.push(Registration::PageContext(token));
        Ok(token)
    }

    pub fn on_message(&mut self, target: &str, listener: MessageListener) -> Result<ListenerToken> {
        let service = self
            .services
            .event
            .as_ref()
            .ok_or_else(|| anyhow!("event service not available"))?;
        let token = service.subscribe_to_messages(target, listener)?;
        self.registrations.push(Registration::Messages { target: target.to_string(), token });
        Ok(token)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Remove every registration from its service. Returns how many the
    /// services acknowledged.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for registration in self.registrations.drain(..) {
            let removed = match &registration {
                Registration::Theme(token) => self
                    .services
                    .theme
                    .as_ref()
                    .is_some_and(|s| s.remove_theme_change_listener(*token)),
                Registration::PageContext(token) => self
                    .services
                    .page_context
                    .as_ref()
                    .is_some_and(|s| s.remove_page_context_listener(*token)),
                Registration::Messages { target, token } => self
                    .services
                    .event
                    .as_ref()
                    .is_some_and(|s| s.unsubscribe_from_messages(target, *token)),
            };
            if removed {
                released += 1;
            } else {
                debug!(?registration, "Registration was already gone");
            }
        }
        released
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        if !self.registrations.is_empty() {
            self.release_all();
        }
    }
}
