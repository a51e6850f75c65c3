//! `braindrive-recovery` — uniform recovery policy around plugin operations.
//!
//! Provides:
//! - [`ErrorHandler`] with `safe_async`, `safe_sync` and `validate`
//! - Recovery strategies (retry, fallback, ignore, escalate, user action)
//! - Ordered validation rules
//! - Advisory failure statistics and reporting hooks

pub mod handler;
pub mod messages;
pub mod policy;
pub mod report;
pub mod rules;
pub mod stats;
pub mod strategy;

pub use handler::{ErrorHandler, HandlerConfig};
pub use messages::user_message;
pub use policy::RetryPolicy;
pub use report::{ErrorReporter, MemoryReporter, TracingReporter};
pub use rules::ValidationRule;
pub use stats::ErrorStats;
pub use strategy::RecoveryStrategy;
