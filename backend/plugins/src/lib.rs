//! `braindrive-plugin` — the plugin side of a BrainDrive module.
//!
//! A component is a struct with explicit state and a pure render function.
//! Around it: lifecycle hooks, a render error boundary, the error panel, the
//! settings form, and the manifest describing what the bundle exposes.

pub mod boundary;
pub mod bundle;
pub mod component;
pub mod lifecycle;
pub mod manifest;
pub mod panel;
pub mod settings;
pub mod view;

pub use boundary::{BoundaryKey, ErrorBoundary};
pub use bundle::{check_bundle, ArtifactStatus, BundleReport};
pub use component::{render, ComponentProps, ComponentState, PluginComponent, Renderer};
pub use lifecycle::{DefaultPluginLifecycle, PluginLifecycle, PluginLifecycleContext, PluginState};
pub use manifest::{load_manifest, read_manifest, ManifestError, PluginManifest, PluginModule};
pub use panel::{ErrorPanel, RetryDecision};
pub use settings::{settings_key, PluginSettings, SettingsForm};
pub use view::ViewNode;
