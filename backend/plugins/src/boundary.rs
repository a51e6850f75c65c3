//! Render error boundary.
//!
//! Catches panics raised while rendering a subtree, records them as
//! `Component` errors and substitutes a fallback view. The boundary resets
//! itself when the identifying props it guards change.

use std::panic::{catch_unwind, AssertUnwindSafe};

use braindrive_core::PluginError;
use braindrive_recovery::ErrorHandler;
use tracing::error;

use crate::panel::render_error;
use crate::view::ViewNode;

/// Props that identify the guarded subtree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundaryKey {
    pub plugin_id: String,
    pub module_id: String,
}

impl BoundaryKey {
    pub fn new(plugin_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self { plugin_id: plugin_id.into(), module_id: module_id.into() }
    }
}

#[derive(Debug)]
pub struct ErrorBoundary {
    handler: ErrorHandler,
    key: BoundaryKey,
    error: Option<PluginError>,
}

/// Extract a human-readable message from a panic payload.
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

impl ErrorBoundary {
    pub fn new(handler: ErrorHandler, key: BoundaryKey) -> Self {
        Self { handler, key, error: None }
    }

    pub fn error(&self) -> Option<&PluginError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn key(&self) -> &BoundaryKey {
        &self.key
    }

    pub fn reset(&mut self) {
        self.error = None;
    }

    /// Render `view` under the boundary.
    ///
    /// A changed `key` clears a previously caught error before rendering.
    /// While an error is held the fallback is returned without calling `view`.
    pub fn render(&mut self, key: &BoundaryKey, view: impl FnOnce() -> ViewNode) -> ViewNode {
        if *key != self.key {
            self.key = key.clone();
            self.reset();
        }
        if let Some(err) = &self.error {
            return fallback(err);
        }

        match catch_unwind(AssertUnwindSafe(view)) {
            Ok(node) => node,
            Err(payload) => {
                let msg = panic_message(payload);
                error!(
                    plugin = %self.key.plugin_id,
                    module = %self.key.module_id,
                    "Render panicked: {msg}"
                );
                let err = self.handler.record_error(
                    PluginError::component(format!("Render failed: {msg}"))
                        .with_recoverable(false)
                        .requiring_user_action(),
                );
                let node = fallback(&err);
                self.error = Some(err);
                node
            }
        }
    }
}

fn fallback(err: &PluginError) -> ViewNode {
    ViewNode::element("div")
        .class("plugin-error-boundary")
        .child(render_error(err, false, 0))
}
