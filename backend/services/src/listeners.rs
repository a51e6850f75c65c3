//! Listener registry with registration tokens.
//!
//! Listeners run in registration order. Callbacks are invoked outside the
//! lock so a listener may register or remove listeners while being notified.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle returned by every `add_*`/`subscribe_*` call; pass it back to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerToken(Uuid);

impl ListenerToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

pub struct ListenerSet<A> {
    entries: RwLock<Vec<(ListenerToken, Listener<A>)>>,
}

impl<A> Default for ListenerSet<A> {
    fn default() -> Self {
        Self { entries: RwLock::new(Vec::new()) }
    }
}

impl<A> ListenerSet<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener<A>) -> ListenerToken {
        let token = ListenerToken::new();
        self.entries.write().push((token, listener));
        token
    }

    /// Returns false when the token was unknown (already removed).
    pub fn remove(&self, token: ListenerToken) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(t, _)| *t != token);
        entries.len() != before
    }

    /// Notify every listener; returns how many were called.
    pub fn emit(&self, value: &A) -> usize {
        let snapshot: Vec<Listener<A>> =
            self.entries.read().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in &snapshot {
            listener(value);
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
