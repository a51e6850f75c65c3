use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key/value plugin configuration as persisted by the host.
pub type PluginConfig = serde_json::Map<String, serde_json::Value>;

/// Host color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Hosts occasionally send unknown scheme names; treat them as light.
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// The page the plugin is currently rendered on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_id: String,
    pub page_name: String,
    pub page_route: String,
    pub is_studio_page: bool,
}

/// Identifies where an error was raised.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>) -> Self {
        Self { component: component.into(), plugin_id: None, module_id: None }
    }

    pub fn with_plugin(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }
}

/// Host capabilities a plugin can be handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceName {
    Theme,
    PageContext,
    Settings,
    Api,
    Event,
}

impl ServiceName {
    pub const ALL: [ServiceName; 5] =
        [Self::Theme, Self::PageContext, Self::Settings, Self::Api, Self::Event];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::PageContext => "pageContext",
            Self::Settings => "settings",
            Self::Api => "api",
            Self::Event => "event",
        }
    }

    pub fn init_error_code(self) -> &'static str {
        match self {
            Self::Theme => "THEME_SERVICE_ERROR",
            Self::PageContext => "PAGE_CONTEXT_SERVICE_ERROR",
            Self::Settings => "SETTINGS_SERVICE_ERROR",
            Self::Api => "API_SERVICE_ERROR",
            Self::Event => "EVENT_SERVICE_ERROR",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown service '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parsing() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(Theme::parse_lossy("sepia"), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }

    #[test]
    fn page_context_uses_host_field_names() {
        let ctx: PageContext = serde_json::from_value(serde_json::json!({
            "pageId": "p1",
            "pageName": "Home",
            "pageRoute": "/home",
            "isStudioPage": true
        }))
        .unwrap();
        assert_eq!(ctx.page_route, "/home");
        assert!(ctx.is_studio_page);
    }

    #[test]
    fn service_names_round_trip_through_str() {
        for name in ServiceName::ALL {
            assert_eq!(name.as_str().parse::<ServiceName>().unwrap(), name);
        }
        assert!("telemetry".parse::<ServiceName>().is_err());
    }
}
