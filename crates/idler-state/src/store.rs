//! StateStore — keyed reconciliation state with sliding expiration.
//!
//! Backed by a [`DashMap`] so tasks reconciling distinct targets never
//! contend on a single lock. Each entry records when it was last read or
//! written; an entry idle for longer than the TTL is treated as absent.
//! Last-access times use [`tokio::time::Instant`] so expiry follows a
//! paused test clock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::types::ReconciliationState;

/// Inactivity window after which a target's state is forgotten.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(20);

struct Entry {
    state: ReconciliationState,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_access) > ttl
    }
}

/// Thread-safe store of per-target state.
#[derive(Clone)]
pub struct StateStore {
    entries: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create a store with the default 20 s sliding expiration.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Get the state for `key`, or a default state if absent or expired.
    ///
    /// Counts as an access: a live entry's inactivity window restarts.
    pub fn get(&self, key: &str) -> ReconciliationState {
        let now = Instant::now();

        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.is_expired(now, self.ttl) {
                entry.last_access = now;
                return entry.state;
            }
        }

        // Expired entries read back as default. Remove only if still
        // expired, so a concurrent `set` is never discarded.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now, self.ttl))
            .is_some()
        {
            debug!(%key, "reconciliation state expired");
        }

        ReconciliationState::default()
    }

    /// Store (or overwrite) the state for `key` and restart its window.
    pub fn set(&self, key: &str, state: ReconciliationState) {
        self.entries.insert(
            key.to_string(),
            Entry {
                state,
                last_access: Instant::now(),
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now, self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "purged expired reconciliation state");
        }
        removed
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
