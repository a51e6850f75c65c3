//! Error handler: wraps single operations with a recovery strategy.
//!
//! A handler is a call-scoped decorator. Retry counts live on the stack of
//! each call; the only state shared between calls (and between clones of the
//! handler) is the advisory [`ErrorStats`] counter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use braindrive_core::{ErrorContext, PluginError, PluginResult, ValidationError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::messages::user_message;
use crate::policy::RetryPolicy;
use crate::report::{ErrorReporter, TracingReporter};
use crate::rules::ValidationRule;
use crate::stats::ErrorStats;
use crate::strategy::RecoveryStrategy;

/// Per-handler policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// 1.0 keeps the delay fixed between attempts.
    pub backoff_factor: f64,
    pub max_retry_delay_ms: u64,
    /// Per-attempt time limit; `None` lets an attempt run indefinitely.
    pub attempt_timeout_ms: Option<u64>,
    pub enable_logging: bool,
    pub enable_reporting: bool,
    /// Present friendly messages instead of raw error text.
    pub user_notification: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1_000,
            backoff_factor: 1.0,
            max_retry_delay_ms: 30_000,
            attempt_timeout_ms: None,
            enable_logging: true,
            enable_reporting: false,
            user_notification: true,
        }
    }
}

impl HandlerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay_ms: self.retry_delay_ms,
            backoff_factor: self.backoff_factor,
            max_delay_ms: self.max_retry_delay_ms,
        }
    }
}

#[derive(Clone)]
pub struct ErrorHandler {
    config: HandlerConfig,
    context: ErrorContext,
    stats: Arc<Mutex<ErrorStats>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ErrorHandler {
    pub fn new(config: HandlerConfig, context: ErrorContext) -> Self {
        Self {
            config,
            context,
            stats: Arc::new(Mutex::new(ErrorStats::default())),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// A handler for another component that shares this handler's counters.
    pub fn scoped(&self, context: ErrorContext) -> Self {
        Self { context, ..self.clone() }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// Normalize, count, log and report a failure.
    pub fn handle_error(&self, err: anyhow::Error) -> PluginError {
        self.record_error(PluginError::from_anyhow(err))
    }

    /// Count, log and report an already-typed failure.
    pub fn record_error(&self, mut err: PluginError) -> PluginError {
        if err.context.is_none() {
            err.context = Some(self.context.clone());
        }
        self.stats.lock().record(&err);

        if self.config.enable_logging {
            if err.recoverable {
                warn!(
                    component = %self.context.component,
                    kind = %err.kind,
                    code = %err.code,
                    "Recoverable plugin error: {}",
                    err.message
                );
            } else {
                error!(
                    component = %self.context.component,
                    kind = %err.kind,
                    code = %err.code,
                    "Plugin error: {}",
                    err.message
                );
            }
        }
        if self.config.enable_reporting {
            self.reporter.report(&err);
        }
        err
    }

    /// Run an async operation under `strategy`.
    ///
    /// `operation` is a factory so that retries get a fresh future. Returns
    /// `Ok(Some(value))` on success, the fallback (or `None`) when the
    /// strategy absorbs the failure, and `Err` when it surfaces it.
    pub async fn safe_async<T, F, Fut>(
        &self,
        mut operation: F,
        fallback: Option<T>,
        strategy: RecoveryStrategy,
    ) -> PluginResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let policy = self.config.retry_policy();
        let mut retries = 0u32;

        loop {
            let outcome = match self.config.attempt_timeout_ms {
                Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), operation()).await {
                    Ok(result) => result,
                    Err(elapsed) => Err(anyhow::Error::new(elapsed)),
                },
                None => operation().await,
            };

            let err = match outcome {
                Ok(value) => {
                    if retries > 0 {
                        debug!(
                            component = %self.context.component,
                            retries,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(Some(value));
                }
                Err(e) => self.handle_error(e),
            };

            match strategy {
                RecoveryStrategy::Retry => {
                    if err.recoverable && policy.should_retry(retries) {
                        retries += 1;
                        let delay = policy.delay_for(retries);
                        debug!(
                            component = %self.context.component,
                            retry = retries,
                            max = policy.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying failed operation"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return match fallback {
                        Some(value) => Ok(Some(value)),
                        None => Err(err),
                    };
                }
                RecoveryStrategy::Fallback => return Ok(fallback),
                RecoveryStrategy::Ignore => return Ok(None),
                RecoveryStrategy::Escalate => return Err(err),
                RecoveryStrategy::UserAction => return Err(err.requiring_user_action()),
            }
        }
    }

    /// Run an async operation, returning `fallback` on any failure.
    pub async fn with_fallback<T, F, Fut>(&self, operation: F, fallback: T) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.safe_async(operation, None, RecoveryStrategy::Fallback).await {
            Ok(Some(value)) => value,
            Ok(None) | Err(_) => fallback,
        }
    }

    /// Synchronous analogue of [`Self::safe_async`] with a fallback.
    pub fn safe_sync<T>(&self, operation: impl FnOnce() -> anyhow::Result<T>, fallback: T) -> T {
        match operation() {
            Ok(value) => value,
            Err(e) => {
                self.handle_error(e);
                fallback
            }
        }
    }

    /// Apply `rules` in order; the first violation becomes a validation error.
    pub fn validate<T: ?Sized>(
        &self,
        value: &T,
        rules: &[ValidationRule<T>],
        field_name: &str,
    ) -> PluginResult<()> {
        for rule in rules {
            if let Err(message) = rule.check(value) {
                debug!(field = field_name, rule = rule.name(), "Validation failed: {message}");
                let err: PluginError = ValidationError::new(field_name, message).into();
                return Err(err.with_context(self.context.clone()));
            }
        }
        Ok(())
    }

    /// The text to show a user for `err`, honouring `user_notification`.
    pub fn presentable_message(&self, err: &PluginError) -> String {
        if self.config.user_notification {
            user_message(err)
        } else {
            err.message.clone()
        }
    }

    pub fn error_stats(&self) -> ErrorStats {
        self.stats.lock().clone()
    }

    pub fn reset_error_counts(&self) {
        *self.stats.lock() = ErrorStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use crate::rules;
    use anyhow::anyhow;
    use braindrive_core::ErrorKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn handler(max_retries: u32, retry_delay_ms: u64) -> ErrorHandler {
        ErrorHandler::new(
            HandlerConfig { max_retries, retry_delay_ms, enable_logging: false, ..Default::default() },
            ErrorContext::new("TestComponent").with_plugin("test-plugin"),
        )
    }

    #[tokio::test]
    async fn fallback_never_propagates() {
        let h = handler(3, 1);
        let calls = AtomicU32::new(0);
        let result = h
            .safe_async(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<i32, _>(anyhow!("boom")) }
                },
                Some(42),
                RecoveryStrategy::Fallback,
            )
            .await;
        assert_eq!(result.unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_invokes_at_most_n_plus_one_times() {
        let h = handler(3, 1);
        let calls = AtomicU32::new(0);
        let result = h
            .safe_async(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(anyhow!("still down")) }
                },
                None,
                RecoveryStrategy::Retry,
            )
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.message, "still down");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(h.error_stats().total, 4);
    }

    #[tokio::test]
    async fn retry_exhaustion_uses_fallback_when_supplied() {
        let h = handler(1, 1);
        let result = h
            .safe_async(|| async { Err::<&str, _>(anyhow!("nope")) }, Some("cached"), RecoveryStrategy::Retry)
            .await;
        assert_eq!(result.unwrap(), Some("cached"));
    }

    #[tokio::test]
    async fn retry_recovers_after_two_failures() {
        let h = handler(2, 10);
        let calls = AtomicU32::new(0);
        let result = h
            .safe_async(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(anyhow!("transient failure {n}"))
                        } else {
                            Ok("loaded")
                        }
                    }
                },
                None,
                RecoveryStrategy::Retry,
            )
            .await;
        assert_eq!(result.unwrap(), Some("loaded"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let stats = h.error_stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.count_for_kind(ErrorKind::Unknown), 2);
    }

    #[tokio::test]
    async fn retry_skips_non_recoverable_errors() {
        let h = handler(3, 1);
        let calls = AtomicU32::new(0);
        let result = h
            .safe_async(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(anyhow::Error::new(braindrive_core::NetworkError::new("/api", Some(404), "missing"))) }
                },
                None,
                RecoveryStrategy::Retry,
            )
            .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ignore_escalate_and_user_action() {
        let h = handler(0, 0);
        let ignored = h
            .safe_async(|| async { Err::<i32, _>(anyhow!("x")) }, Some(1), RecoveryStrategy::Ignore)
            .await;
        assert_eq!(ignored.unwrap(), None);

        let escalated = h
            .safe_async(|| async { Err::<i32, _>(anyhow!("y")) }, Some(1), RecoveryStrategy::Escalate)
            .await
            .unwrap_err();
        assert!(!escalated.requires_user_action);

        let surfaced = h
            .safe_async(|| async { Err::<i32, _>(anyhow!("z")) }, None, RecoveryStrategy::UserAction)
            .await
            .unwrap_err();
        assert!(surfaced.requires_user_action);
        assert_eq!(surfaced.context.unwrap().component, "TestComponent");
        assert_eq!(h.error_stats().total, 3);
    }

    #[tokio::test]
    async fn attempt_timeout_becomes_timeout_error() {
        let h = ErrorHandler::new(
            HandlerConfig { attempt_timeout_ms: Some(10), enable_logging: false, ..Default::default() },
            ErrorContext::new("Slow"),
        );
        let err = h
            .safe_async(
                || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, anyhow::Error>(())
                },
                None,
                RecoveryStrategy::Escalate,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn concurrent_calls_are_independent() {
        let h = handler(1, 5);
        let a = h.safe_async(|| async { Err::<i32, _>(anyhow!("a")) }, Some(1), RecoveryStrategy::Retry);
        let b = h.safe_async(|| async { Ok::<_, anyhow::Error>(2) }, None, RecoveryStrategy::Retry);
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap(), Some(1));
        assert_eq!(b.unwrap(), Some(2));
        assert_eq!(h.error_stats().total, 2);
    }

    #[tokio::test]
    async fn with_fallback_unwraps_value() {
        let h = handler(0, 0);
        assert_eq!(h.with_fallback(|| async { Ok(7) }, 0).await, 7);
        assert_eq!(h.with_fallback(|| async { Err(anyhow!("gone")) }, 0).await, 0);
    }

    #[test]
    fn safe_sync_returns_fallback_on_error() {
        let h = handler(3, 0);
        assert_eq!(h.safe_sync(|| Ok(5), 0), 5);
        assert_eq!(h.safe_sync(|| Err(anyhow!("parse failure")), 0), 0);
        assert_eq!(h.error_stats().total, 1);
    }

    #[test]
    fn validate_reports_first_failing_rule() {
        let h = handler(3, 0);
        let rules = vec![
            ValidationRule::new("r1", |_: &serde_json::Value| Err("first rule failed".to_string())),
            ValidationRule::new("r2", |_: &serde_json::Value| Err("second rule failed".to_string())),
        ];
        let err = h.validate(&json!("x"), &rules, "title").unwrap_err();
        let v = err.as_validation().unwrap();
        assert_eq!(v.field, "title");
        assert_eq!(v.message, "first rule failed");

        let rules = vec![rules::required(), rules::max_length(3)];
        assert!(h.validate(&json!("abc"), &rules, "title").is_ok());
    }

    #[test]
    fn reporting_and_reset() {
        let reporter = Arc::new(MemoryReporter::new());
        let h = ErrorHandler::new(
            HandlerConfig { enable_reporting: true, enable_logging: false, ..Default::default() },
            ErrorContext::new("Reported"),
        )
        .with_reporter(reporter.clone());
        h.safe_sync(|| Err::<(), _>(anyhow!("first")), ());
        let scoped = h.scoped(ErrorContext::new("Child"));
        scoped.safe_sync(|| Err::<(), _>(anyhow!("second")), ());

        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.reports()[1].context.as_ref().unwrap().component, "Child");
        assert_eq!(h.error_stats().total, 2);

        h.reset_error_counts();
        assert_eq!(scoped.error_stats(), ErrorStats::default());
    }

    #[test]
    fn presentable_message_respects_user_notification() {
        let err = PluginError::validation("name", "is required");
        assert_eq!(handler(0, 0).presentable_message(&err), "Invalid name: is required");
        let raw = ErrorHandler::new(
            HandlerConfig { user_notification: false, ..Default::default() },
            ErrorContext::new("Raw"),
        );
        assert_eq!(raw.presentable_message(&err), err.message);
    }
}
