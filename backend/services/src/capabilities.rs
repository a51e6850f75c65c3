//! Host capability interfaces.
//!
//! The host injects a bundle of these into every plugin instance. All
//! registration calls return a [`ListenerToken`]; removal is by token.

use anyhow::Result;
use async_trait::async_trait;
use braindrive_core::{PageContext, Theme};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listeners::{Listener, ListenerToken};

pub type ThemeListener = Listener<Theme>;
pub type PageContextListener = Listener<PageContext>;
pub type MessageListener = Listener<Value>;

pub trait ThemeService: Send + Sync {
    fn current_theme(&self) -> Result<Theme>;
    fn add_theme_change_listener(&self, listener: ThemeListener) -> Result<ListenerToken>;
    fn remove_theme_change_listener(&self, token: ListenerToken) -> bool;
}

pub trait PageContextService: Send + Sync {
    /// `None` when the plugin is not rendered on a page (e.g. in a preview).
    fn current_page_context(&self) -> Result<Option<PageContext>>;
    fn on_page_context_change(&self, listener: PageContextListener) -> Result<ListenerToken>;
    fn remove_page_context_listener(&self, token: ListenerToken) -> bool;
}

/// Uniform settings access. Values are arbitrary JSON.
#[async_trait]
pub trait SettingsService: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>>;
    async fn set_setting(&self, key: &str, value: Value) -> Result<()>;
}

/// The older `get`/`set` settings surface some hosts still expose.
#[async_trait]
pub trait LegacySettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Value,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self { status: 200, data }
    }
}

/// Thin HTTP-like call surface provided by the host.
#[async_trait]
pub trait ApiService: Send + Sync {
    async fn request(&self, method: HttpMethod, url: &str, body: Option<Value>) -> Result<ApiResponse>;

    async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.request(HttpMethod::Get, url, None).await
    }

    async fn post(&self, url: &str, body: Value) -> Result<ApiResponse> {
        self.request(HttpMethod::Post, url, Some(body)).await
    }

    async fn put(&self, url: &str, body: Value) -> Result<ApiResponse> {
        self.request(HttpMethod::Put, url, Some(body)).await
    }

    async fn delete(&self, url: &str) -> Result<ApiResponse> {
        self.request(HttpMethod::Delete, url, None).await
    }
}

/// Message passing between plugin modules on the same page.
pub trait EventService: Send + Sync {
    fn send_message(&self, target: &str, message: Value) -> Result<()>;
    fn subscribe_to_messages(&self, target: &str, listener: MessageListener) -> Result<ListenerToken>;
    fn unsubscribe_from_messages(&self, target: &str, token: ListenerToken) -> bool;
}
