use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{ErrorContext, ServiceName};

/// Broad category of a plugin failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A request to the host API failed.
    Network,
    /// A value failed a validation rule.
    Validation,
    /// A host capability returned an error.
    Service,
    /// A host capability could not be initialized.
    ServiceInit,
    /// Caught at the component boundary.
    Component,
    /// Rendering the view tree failed.
    Render,
    Permission,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Service => "service",
            Self::ServiceInit => "service_init",
            Self::Component => "component",
            Self::Render => "render",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Code used when an error of this kind carries no more specific code.
    pub fn default_code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Service => "SERVICE_ERROR",
            Self::ServiceInit => "SERVICE_INIT_ERROR",
            Self::Component => "COMPONENT_ERROR",
            Self::Render => "RENDER_ERROR",
            Self::Permission => "PERMISSION_ERROR",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    pub fn recoverable_by_default(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Service | Self::ServiceInit | Self::Timeout | Self::Unknown
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host capability reported a failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{service} service error [{code}]: {message}")]
pub struct ServiceError {
    pub service: String,
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(
        service: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { service: service.into(), code: code.into(), message: message.into() }
    }
}

/// A value violated one of the rules applied to its field.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("invalid value for '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), value: None }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// A call through the API capability failed.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("request to {url} failed: {message}")]
pub struct NetworkError {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl NetworkError {
    pub fn new(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self { url: url.into(), status, message: message.into() }
    }

    /// Transport failures, server errors, timeouts and throttling are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self.status {
            None => true,
            Some(s) => s >= 500 || s == 408 || s == 429,
        }
    }
}

/// The typed error a [`PluginError`] was built from, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorCause {
    Service(ServiceError),
    Validation(ValidationError),
    Network(NetworkError),
}

/// User-presentable error produced by every recovery path in a plugin.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct PluginError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
    pub recoverable: bool,
    /// Set when the caller should offer a manual retry or dismiss.
    #[serde(default)]
    pub requires_user_action: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<ErrorCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

pub type PluginResult<T> = Result<T, PluginError>;

impl PluginError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            message: message.into(),
            details: Value::Null,
            recoverable: kind.recoverable_by_default(),
            requires_user_action: false,
            timestamp: Utc::now(),
            cause: None,
            context: None,
        }
    }

    pub fn component(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Component, message)
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    pub fn service(
        service: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ServiceError::new(service, code, message).into()
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::new(field, message).into()
    }

    pub fn network(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        NetworkError::new(url, status, message).into()
    }

    /// A capability failed to initialize; the code names the capability.
    pub fn service_init(service: ServiceName, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: service.init_error_code().to_string(),
            cause: Some(ErrorCause::Service(ServiceError::new(
                service.as_str(),
                service.init_error_code(),
                message.clone(),
            ))),
            ..Self::new(ErrorKind::ServiceInit, message)
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn requiring_user_action(mut self) -> Self {
        self.requires_user_action = true;
        self
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match &self.cause {
            Some(ErrorCause::Validation(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceError> {
        match &self.cause {
            Some(ErrorCause::Service(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_network(&self) -> Option<&NetworkError> {
        match &self.cause {
            Some(ErrorCause::Network(n)) => Some(n),
            _ => None,
        }
    }

    /// Normalize an arbitrary operation failure.
    ///
    /// Typed errors anywhere in the chain are recovered by downcast; anything
    /// else is reported as `Unknown` with the full context chain as message.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<PluginError>() {
                return e.clone();
            }
            if let Some(e) = cause.downcast_ref::<ValidationError>() {
                return e.clone().into();
            }
            if let Some(e) = cause.downcast_ref::<ServiceError>() {
                return e.clone().into();
            }
            if let Some(e) = cause.downcast_ref::<NetworkError>() {
                return e.clone().into();
            }
            if cause.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
                return Self::timeout(format!("{err:#}"));
            }
        }
        Self::new(ErrorKind::Unknown, format!("{err:#}"))
    }
}

impl From<anyhow::Error> for PluginError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

impl From<ServiceError> for PluginError {
    fn from(err: ServiceError) -> Self {
        Self {
            code: err.code.clone(),
            message: err.to_string(),
            cause: Some(ErrorCause::Service(err)),
            ..Self::new(ErrorKind::Service, String::new())
        }
    }
}

impl From<ValidationError> for PluginError {
    fn from(err: ValidationError) -> Self {
        Self {
            message: err.to_string(),
            details: serde_json::json!({ "field": err.field }),
            cause: Some(ErrorCause::Validation(err)),
            ..Self::new(ErrorKind::Validation, String::new())
        }
    }
}

impl From<NetworkError> for PluginError {
    fn from(err: NetworkError) -> Self {
        let details = match err.status {
            Some(status) => serde_json::json!({ "url": err.url, "status": status }),
            None => serde_json::json!({ "url": err.url }),
        };
        Self {
            message: err.to_string(),
            recoverable: err.is_transient(),
            details,
            cause: Some(ErrorCause::Network(err)),
            ..Self::new(ErrorKind::Network, String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn kind_defaults() {
        let err = PluginError::new(ErrorKind::Validation, "bad");
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert!(!err.recoverable);
        assert!(PluginError::new(ErrorKind::Network, "x").recoverable);
    }

    #[test]
    fn validation_error_keeps_field() {
        let err = PluginError::validation("refreshInterval", "must be positive");
        assert_eq!(err.kind, ErrorKind::Validation);
        let v = err.as_validation().unwrap();
        assert_eq!(v.field, "refreshInterval");
        assert_eq!(v.message, "must be positive");
        assert!(err.message.contains("refreshInterval"));
    }

    #[test]
    fn network_status_controls_recoverable() {
        assert!(PluginError::network("/api", Some(503), "unavailable").recoverable);
        assert!(PluginError::network("/api", None, "reset").recoverable);
        assert!(!PluginError::network("/api", Some(404), "missing").recoverable);
    }

    #[test]
    fn service_init_code_names_capability() {
        let err = PluginError::service_init(ServiceName::Theme, "no theme service");
        assert_eq!(err.kind, ErrorKind::ServiceInit);
        assert_eq!(err.code, "THEME_SERVICE_ERROR");
        assert_eq!(err.as_service().unwrap().service, "theme");
    }

    #[test]
    fn from_anyhow_recovers_typed_errors_through_context() {
        let inner = anyhow::Error::new(ServiceError::new("api", "E_DOWN", "down"));
        let wrapped = Err::<(), _>(inner).context("loading data").unwrap_err();
        let err = PluginError::from_anyhow(wrapped);
        assert_eq!(err.kind, ErrorKind::Service);
        assert_eq!(err.code, "E_DOWN");
    }

    #[test]
    fn from_anyhow_falls_back_to_unknown() {
        let err = PluginError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.code, "UNKNOWN_ERROR");
        assert!(err.recoverable);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn serializes_camel_case() {
        let err = PluginError::component("render exploded").requiring_user_action();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "component");
        assert_eq!(json["requiresUserAction"], true);
        assert!(json.get("details").is_none());
    }
}
