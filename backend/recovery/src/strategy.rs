use serde::{Deserialize, Serialize};

/// What a handler does when a wrapped operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStrategy {
    /// Re-invoke the operation up to the configured retry limit.
    Retry,
    /// Substitute the caller-supplied fallback and suppress the error.
    #[default]
    Fallback,
    /// Swallow the error and return nothing.
    Ignore,
    /// Record the error and hand it back to the caller.
    Escalate,
    /// Hand the error back flagged for a manual retry or dismiss.
    UserAction,
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Retry => "RETRY",
            Self::Fallback => "FALLBACK",
            Self::Ignore => "IGNORE",
            Self::Escalate => "ESCALATE",
            Self::UserAction => "USER_ACTION",
        };
        f.write_str(s)
    }
}
