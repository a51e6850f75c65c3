//! Plugin lifecycle hooks: before_mount, after_mount, before_teardown, after_teardown.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Current phase of a plugin component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Unmounted,
    Mounting,
    Active,
    TearingDown,
    Failed,
}

impl PluginState {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    /// Whether `mount` may run from this phase.
    pub fn can_mount(self) -> bool {
        matches!(self, Self::Unmounted | Self::Failed)
    }
}

/// Context passed to lifecycle hooks.
#[derive(Debug, Clone)]
pub struct PluginLifecycleContext {
    pub plugin_id: String,
    pub module_id: String,
    pub instance_id: String,
}

/// Hooks a plugin author can implement around mount and teardown.
#[async_trait]
pub trait PluginLifecycle: Send + Sync {
    /// Called before capabilities are initialized. Returning Err cancels the mount.
    async fn before_mount(&self, ctx: &PluginLifecycleContext) -> Result<()>;
    /// Called once initial data has been loaded (or failed to load).
    async fn after_mount(&self, ctx: &PluginLifecycleContext) -> Result<()>;
    /// Called before subscriptions are released.
    async fn before_teardown(&self, ctx: &PluginLifecycleContext) -> Result<()>;
    async fn after_teardown(&self, ctx: &PluginLifecycleContext);
}

/// Default lifecycle: logs each phase.
pub struct DefaultPluginLifecycle;

#[async_trait]
impl PluginLifecycle for DefaultPluginLifecycle {
    async fn before_mount(&self, ctx: &PluginLifecycleContext) -> Result<()> {
        debug!(plugin = %ctx.plugin_id, module = %ctx.module_id, "before_mount");
        Ok(())
    }

    async fn after_mount(&self, ctx: &PluginLifecycleContext) -> Result<()> {
        info!(plugin = %ctx.plugin_id, module = %ctx.module_id, instance = %ctx.instance_id, "Plugin mounted");
        Ok(())
    }

    async fn before_teardown(&self, ctx: &PluginLifecycleContext) -> Result<()> {
        debug!(plugin = %ctx.plugin_id, module = %ctx.module_id, "before_teardown");
        Ok(())
    }

    async fn after_teardown(&self, ctx: &PluginLifecycleContext) {
        info!(plugin = %ctx.plugin_id, module = %ctx.module_id, "Plugin torn down");
    }
}

/// Finish the mount sequence. A failing `after_mount` marks the plugin failed
/// but keeps what was already initialized.
pub async fn finish_mount(lifecycle: &dyn PluginLifecycle, ctx: &PluginLifecycleContext) -> PluginState {
    if let Err(e) = lifecycle.after_mount(ctx).await {
        warn!(plugin = %ctx.plugin_id, error = %e, "after_mount failed");
        return PluginState::Failed;
    }
    PluginState::Active
}

/// Run the teardown hooks. Hook failures are logged and never stop teardown.
pub async fn run_teardown_hooks<F>(
    lifecycle: &dyn PluginLifecycle,
    ctx: &PluginLifecycleContext,
    release: F,
) -> PluginState
where
    F: FnOnce(),
{
    debug!(plugin = %ctx.plugin_id, "Running teardown sequence");
    if let Err(e) = lifecycle.before_teardown(ctx).await {
        warn!(plugin = %ctx.plugin_id, error = %e, "before_teardown failed");
    }
    release();
    lifecycle.after_teardown(ctx).await;
    PluginState::Unmounted
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingAfterMount;

    #[async_trait]
    impl PluginLifecycle for FailingAfterMount {
        async fn before_mount(&self, _: &PluginLifecycleContext) -> Result<()> {
            Ok(())
        }
        async fn after_mount(&self, _: &PluginLifecycleContext) -> Result<()> {
            Err(anyhow!("analytics unavailable"))
        }
        async fn before_teardown(&self, _: &PluginLifecycleContext) -> Result<()> {
            Err(anyhow!("flush failed"))
        }
        async fn after_teardown(&self, _: &PluginLifecycleContext) {}
    }

    fn ctx() -> PluginLifecycleContext {
        PluginLifecycleContext {
            plugin_id: "demo".into(),
            module_id: "Main".into(),
            instance_id: "i-1".into(),
        }
    }

    #[tokio::test]
    async fn default_lifecycle_activates() {
        assert_eq!(finish_mount(&DefaultPluginLifecycle, &ctx()).await, PluginState::Active);
    }

    #[tokio::test]
    async fn hook_failures() {
        assert_eq!(finish_mount(&FailingAfterMount, &ctx()).await, PluginState::Failed);

        let released = AtomicBool::new(false);
        let state =
            run_teardown_hooks(&FailingAfterMount, &ctx(), || released.store(true, Ordering::SeqCst)).await;
        assert_eq!(state, PluginState::Unmounted);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn mount_is_allowed_from_idle_phases() {
        assert!(PluginState::Unmounted.can_mount());
        assert!(PluginState::Failed.can_mount());
        assert!(!PluginState::Active.can_mount());
    }
}
