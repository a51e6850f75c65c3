//! Host capabilities consumed by BrainDrive plugins.
//!
//! The host injects a [`ServiceBundle`]; plugins register listeners through an
//! owned [`Subscriptions`] set so teardown releases everything it registered.

pub mod bundle;
pub mod capabilities;
pub mod listeners;
pub mod mock;
pub mod settings;

pub use bundle::{ServiceBundle, Subscriptions};
pub use capabilities::{
    ApiResponse, ApiService, EventService, HttpMethod, LegacySettingsStore, MessageListener,
    PageContextListener, PageContextService, SettingsService, ThemeListener, ThemeService,
};
pub use listeners::{Listener, ListenerSet, ListenerToken};
pub use mock::MockServices;
pub use settings::{HostSettings, LegacySettingsAdapter};
