//! In-memory session store backing the session channel of the intent
//! tracker.
//!
//! Keyed by an opaque UUID carried in the `sb_session` cookie. Bounded: when
//! the store is full, [`SessionStore::begin`] returns `None` and callers fall
//! back to the cookie channel alone. Sessions are started lazily, only at the
//! moment a capture needs one.

use crate::intent::SiteId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Name of the session cookie. No Max-Age: it lives for the browser session.
pub const SESSION_COOKIE: &str = "sb_session";

/// Default maximum number of concurrent sessions.
pub const DEFAULT_CAPACITY: usize = 10_000;

struct SessionData {
    upgrade_site_id: Option<SiteId>,
    last_seen: DateTime<Utc>,
}

pub struct SessionStore {
    capacity: usize,
    sessions: RwLock<HashMap<String, SessionData>>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh session and return its id.
    ///
    /// Returns `None` at capacity. Session storage being unavailable is
    /// tolerated everywhere, never an error.
    pub fn begin(&self) -> Option<String> {
        let mut sessions = self.write_lock();
        if sessions.len() >= self.capacity {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        sessions.insert(
            id.clone(),
            SessionData {
                upgrade_site_id: None,
                last_seen: Utc::now(),
            },
        );
        Some(id)
    }

    /// Run `f` against the upgrade-intent slot of session `id`, refreshing
    /// its idle timer. Returns `None` for unknown (or pruned) ids.
    ///
    /// The lock is scoped to this call, so `f` must not block.
    pub fn with_slot<R>(&self, id: &str, f: impl FnOnce(&mut Option<SiteId>) -> R) -> Option<R> {
        let mut sessions = self.write_lock();
        let data = sessions.get_mut(id)?;
        data.last_seen = Utc::now();
        Some(f(&mut data.upgrade_site_id))
    }

    /// Drop sessions idle longer than `max_idle`. Returns how many went.
    pub fn prune(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.write_lock();
        let before = sessions.len();
        sessions.retain(|_, data| data.last_seen >= cutoff);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock only means some writer panicked mid-update; the map is
    // still usable.
    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionData>> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, by: Duration) {
        let mut sessions = self.write_lock();
        if let Some(data) = sessions.get_mut(id) {
            data.last_seen = Utc::now() - by;
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
