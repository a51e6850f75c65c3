pub mod error;
pub mod types;

pub use error::{
    ErrorCause, ErrorKind, NetworkError, PluginError, PluginResult, ServiceError, ValidationError,
};
pub use types::{ErrorContext, PageContext, PluginConfig, ServiceName, Theme};
