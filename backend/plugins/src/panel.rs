//! The dismissible error panel shown over plugin content.

use braindrive_core::PluginError;
use braindrive_recovery::user_message;

use crate::view::ViewNode;

/// Panel state. Retry is offered while `retry_count < max_retries`; once the
/// budget is spent the panel is terminal and only dismiss remains.
#[derive(Debug, Clone, Default)]
pub struct ErrorPanel {
    error: Option<PluginError>,
    retry_count: u32,
    max_retries: u32,
    dismissed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry number `n` (1-based) may proceed.
    Allowed(u32),
    Exhausted,
    NothingToRetry,
}

impl ErrorPanel {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Default::default() }
    }

    /// Show `error`. The retry budget is kept across consecutive failures and
    /// only restored by [`Self::clear`].
    pub fn show(&mut self, error: PluginError) {
        self.error = Some(error);
        self.dismissed = false;
    }

    /// Hide the panel until the next error. Keeps the retry count.
    pub fn dismiss(&mut self) {
        self.dismissed = true;
    }

    /// The operation the panel was shown for succeeded.
    pub fn clear(&mut self) {
        self.error = None;
        self.retry_count = 0;
        self.dismissed = false;
    }

    pub fn error(&self) -> Option<&PluginError> {
        self.error.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.error.is_some() && !self.dismissed
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retries_left(&self) -> u32 {
        self.max_retries.saturating_sub(self.retry_count)
    }

    pub fn can_retry(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.recoverable || e.requires_user_action)
            && self.retries_left() > 0
    }

    pub fn is_terminal(&self) -> bool {
        self.error.is_some() && !self.can_retry()
    }

    /// Consume one retry if any are left.
    pub fn begin_retry(&mut self) -> RetryDecision {
        if self.error.is_none() {
            return RetryDecision::NothingToRetry;
        }
        if !self.can_retry() {
            return RetryDecision::Exhausted;
        }
        self.retry_count += 1;
        self.dismissed = false;
        RetryDecision::Allowed(self.retry_count)
    }

    pub fn render(&self) -> Option<ViewNode> {
        if !self.is_visible() {
            return None;
        }
        let error = self.error.as_ref()?;
        Some(render_error(error, self.can_retry(), self.retries_left()))
    }
}

/// Error panel markup; also used as the error boundary fallback.
pub fn render_error(error: &PluginError, can_retry: bool, retries_left: u32) -> ViewNode {
    let mut panel = ViewNode::element("div")
        .class("plugin-error-panel")
        .child(ViewNode::element("h3").child(ViewNode::text("Something went wrong")))
        .child(ViewNode::element("p").child(ViewNode::text(user_message(error))))
        .child(ViewNode::element("code").child(ViewNode::text(error.code.clone())));

    if can_retry {
        panel = panel
            .child(ViewNode::button("retry", format!("Retry ({retries_left} left)"), false));
    } else {
        panel = panel
            .class("terminal")
            .child(ViewNode::text("Retry limit reached. Reload the page or contact support."))
            .child(ViewNode::button("retry", "Retry", true));
    }
    panel.child(ViewNode::button("dismiss", "Dismiss", false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use braindrive_core::ErrorKind;

    fn network_error() -> PluginError {
        PluginError::network("/api/v1/data", Some(503), "Service unavailable")
    }

    #[test]
    fn retry_is_gated_by_max_retries() {
        let mut panel = ErrorPanel::new(2);
        assert_eq!(panel.begin_retry(), RetryDecision::NothingToRetry);

        panel.show(network_error());
        assert_eq!(panel.begin_retry(), RetryDecision::Allowed(1));
        panel.show(network_error());
        assert_eq!(panel.begin_retry(), RetryDecision::Allowed(2));
        panel.show(network_error());
        assert_eq!(panel.begin_retry(), RetryDecision::Exhausted);
        assert!(panel.is_terminal());

        let view = panel.render().unwrap();
        assert!(view.has_class("terminal"));
        assert_eq!(view.find_button("retry"), Some(&ViewNode::button("retry", "Retry", true)));
    }

    #[test]
    fn dismiss_hides_until_next_error() {
        let mut panel = ErrorPanel::new(3);
        panel.show(network_error());
        panel.dismiss();
        assert!(panel.render().is_none());
        panel.show(network_error());
        assert!(panel.is_visible());
    }

    #[test]
    fn clear_restores_budget() {
        let mut panel = ErrorPanel::new(1);
        panel.show(network_error());
        panel.begin_retry();
        panel.clear();
        panel.show(network_error());
        assert!(panel.can_retry());
    }

    #[test]
    fn non_recoverable_errors_are_terminal() {
        let mut panel = ErrorPanel::new(3);
        panel.show(PluginError::new(ErrorKind::Permission, "denied").with_recoverable(false));
        assert!(panel.is_terminal());
        let view = panel.render().unwrap();
        assert!(view.find_button("dismiss").is_some());
    }
}
