//! Per-target reconciliation state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping the state machine carries between cycles for one target.
///
/// `scaling_up` and `scaling_down` are never both set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationState {
    /// When continuous zero demand was first observed. `None` while active.
    pub idle_started: Option<DateTime<Utc>>,
    /// A restore was issued and the autoscaler has not reported it yet.
    pub scaling_up: bool,
    /// A scale-to-zero was issued and has not been observed yet.
    pub scaling_down: bool,
}

impl ReconciliationState {
    /// Time spent idle as of `now`. Zero when active or when the clock
    /// went backwards.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        self.idle_started
            .and_then(|started| (now - started).to_std().ok())
            .unwrap_or_default()
    }

    /// True once the target has been idle for longer than `cooldown`.
    pub fn is_idling(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.idle_started.is_some() && self.idle_for(now) > cooldown
    }
}
