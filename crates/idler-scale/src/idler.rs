//! Idler — the per-target scale-to-zero state machine.
//!
//! Given a target and this cycle's demand reading, updates the target's
//! [`ReconciliationState`](idler_state::ReconciliationState) and issues at
//! most one scale command through the [`ClusterApi`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use idler_core::{MetricReading, Target, parse_duration};
use idler_state::StateStore;
use tracing::{debug, error, info};

use crate::cluster::ClusterApi;

/// Cooldown applied when a target has no valid override annotation.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// What a single `reconcile` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    NoChange,
    /// Idle, but the cooldown has not elapsed yet.
    Idling { remaining: Duration },
    /// A scale-to-zero command was issued.
    ScaledToZero,
    /// The autoscaler reports zero replicas after a scale-to-zero.
    ScaleDownConfirmed,
    /// A restore command was issued.
    Restored { replicas: i32 },
    /// The autoscaler reports replicas again after a restore.
    RestoreConfirmed,
    /// The scale command failed; it is retried next cycle.
    ScaleFailed,
}

/// Drives targets between active, idling, and scaled-to-zero.
pub struct Idler {
    cluster: Arc<dyn ClusterApi>,
    store: StateStore,
    default_cooldown: Duration,
}

impl Idler {
    pub fn new(cluster: Arc<dyn ClusterApi>, store: StateStore) -> Self {
        Self {
            cluster,
            store,
            default_cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_default_cooldown(mut self, cooldown: Duration) -> Self {
        self.default_cooldown = cooldown;
        self
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterApi> {
        &self.cluster
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// The target's cooldown override, or the default when the annotation
    /// is absent or unparsable.
    pub fn cooldown_for(&self, target: &Target) -> Duration {
        match parse_duration(target.cooldown.as_deref()) {
            Some(cooldown) => cooldown,
            None => {
                if let Some(raw) = &target.cooldown {
                    debug!(function = %target.key(), cooldown = %raw, "invalid cooldown override, using default");
                }
                self.default_cooldown
            }
        }
    }

    /// Reconcile `target` against this cycle's reading.
    ///
    /// Must not run concurrently for the same target.
    pub async fn reconcile(&self, target: &Target, reading: MetricReading) -> Action {
        self.reconcile_at(target, reading, Utc::now()).await
    }

    /// [`reconcile`](Self::reconcile) with an explicit clock reading.
    pub async fn reconcile_at(
        &self,
        target: &Target,
        reading: MetricReading,
        now: DateTime<Utc>,
    ) -> Action {
        match reading {
            MetricReading::Idle => self.when_idle(target, now).await,
            MetricReading::Active => self.when_active(target).await,
        }
    }

    async fn when_idle(&self, target: &Target, now: DateTime<Utc>) -> Action {
        let key = target.key();
        let cooldown = self.cooldown_for(target);
        let mut state = self.store.get(&key);

        if state.idle_started.is_none() {
            state.idle_started = Some(now);
            state.scaling_up = false;
            debug!(function = %key, cooldown_secs = cooldown.as_secs(), "idle timer started");
        }

        if !state.is_idling(cooldown, now) {
            self.store.set(&key, state);
            return Action::Idling {
                remaining: cooldown.saturating_sub(state.idle_for(now)),
            };
        }

        let mut action = Action::NoChange;

        if !state.scaling_down && target.desired_replicas > 0 {
            match self.cluster.scale(&target.namespace, &target.scale_ref, 0).await {
                Ok(()) => {
                    state.scaling_down = true;
                    action = Action::ScaledToZero;
                    info!(function = %key, workload = %target.scale_ref, "scaled to zero");
                }
                Err(e) => {
                    action = Action::ScaleFailed;
                    error!(function = %key, workload = %target.scale_ref, error = %e, "scale to zero failed");
                }
            }
        }

        if state.scaling_down && target.desired_replicas == 0 {
            state.scaling_down = false;
            action = Action::ScaleDownConfirmed;
            debug!(function = %key, "scale to zero confirmed");
        }

        debug_assert!(!(state.scaling_up && state.scaling_down));
        self.store.set(&key, state);
        action
    }

    async fn when_active(&self, target: &Target) -> Action {
        let key = target.key();
        let mut state = self.store.get(&key);

        if state.idle_started.is_some() {
            state.idle_started = None;
            state.scaling_down = false;
            debug!(function = %key, "demand returned, idle timer cleared");
        }

        let mut action = Action::NoChange;

        if !state.scaling_up && target.desired_replicas == 0 {
            let replicas = target.restore_replicas();
            match self
                .cluster
                .scale(&target.namespace, &target.scale_ref, replicas)
                .await
            {
                Ok(()) => {
                    state.scaling_up = true;
                    action = Action::Restored { replicas };
                    info!(function = %key, workload = %target.scale_ref, replicas, "restored");
                }
                Err(e) => {
                    action = Action::ScaleFailed;
                    error!(function = %key, workload = %target.scale_ref, error = %e, "restore failed");
                }
            }
        }

        if state.scaling_up && target.desired_replicas > 0 {
            state.scaling_up = false;
            action = Action::RestoreConfirmed;
            debug!(function = %key, "restore confirmed");
        }

        debug_assert!(!(state.scaling_up && state.scaling_down));
        self.store.set(&key, state);
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use idler_state::ReconciliationState;

    use crate::testkit::{FakeCluster, ScaleCall, target};

    fn idler(cluster: &Arc<FakeCluster>) -> Idler {
        Idler::new(cluster.clone(), StateStore::new())
    }

    fn call(name: &str, replicas: i32) -> ScaleCall {
        ScaleCall {
            namespace: "default".to_string(),
            name: name.to_string(),
            replicas,
        }
    }

    #[tokio::test]
    async fn first_idle_reading_starts_timer() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        let t = target("api", 3);

        let action = idler.reconcile_at(&t, MetricReading::Idle, now).await;

        assert_eq!(action, Action::Idling { remaining: DEFAULT_COOLDOWN });
        let state = idler.store().get("default/api");
        assert_eq!(state.idle_started, Some(now));
        assert!(!state.scaling_down);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn first_idle_reading_clears_scaling_up() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        idler.store().set(
            "default/api",
            ReconciliationState {
                scaling_up: true,
                ..Default::default()
            },
        );

        idler.reconcile(&target("api", 1), MetricReading::Idle).await;

        assert!(!idler.store().get("default/api").scaling_up);
    }

    #[tokio::test]
    async fn idle_timer_keeps_first_start() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let started = Utc::now() - TimeDelta::minutes(10);
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(started),
                ..Default::default()
            },
        );

        let action = idler.reconcile(&target("api", 3), MetricReading::Idle).await;

        assert!(matches!(action, Action::Idling { .. }));
        assert_eq!(idler.store().get("default/api").idle_started, Some(started));
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn cooldown_elapsed_scales_to_zero_once() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(now - TimeDelta::minutes(31)),
                ..Default::default()
            },
        );
        let t = target("api", 3);

        let action = idler.reconcile_at(&t, MetricReading::Idle, now).await;
        assert_eq!(action, Action::ScaledToZero);
        assert!(idler.store().get("default/api").scaling_down);

        // The autoscaler has not caught up yet: no second command.
        let action = idler.reconcile_at(&t, MetricReading::Idle, now).await;
        assert_eq!(action, Action::NoChange);

        assert_eq!(cluster.calls(), vec![call("api", 0)]);
    }

    #[tokio::test]
    async fn cooldown_boundary_is_exclusive() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(now - TimeDelta::minutes(30)),
                ..Default::default()
            },
        );

        let action = idler
            .reconcile_at(&target("api", 3), MetricReading::Idle, now)
            .await;

        assert_eq!(action, Action::Idling { remaining: Duration::ZERO });
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn confirmed_scale_down_clears_flag() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(now - TimeDelta::hours(1)),
                scaling_down: true,
                ..Default::default()
            },
        );

        let action = idler
            .reconcile_at(&target("api", 0), MetricReading::Idle, now)
            .await;

        assert_eq!(action, Action::ScaleDownConfirmed);
        assert!(!idler.store().get("default/api").scaling_down);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn idle_at_zero_stays_quiet() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(now - TimeDelta::hours(2)),
                ..Default::default()
            },
        );

        let action = idler
            .reconcile_at(&target("api", 0), MetricReading::Idle, now)
            .await;

        assert_eq!(action, Action::NoChange);
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_scale_down_retries_next_cycle() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(now - TimeDelta::minutes(45)),
                ..Default::default()
            },
        );
        let t = target("api", 2);

        cluster.fail_scale(true);
        let action = idler.reconcile_at(&t, MetricReading::Idle, now).await;
        assert_eq!(action, Action::ScaleFailed);
        assert!(!idler.store().get("default/api").scaling_down);

        cluster.fail_scale(false);
        let action = idler.reconcile_at(&t, MetricReading::Idle, now).await;
        assert_eq!(action, Action::ScaledToZero);
        assert_eq!(cluster.calls(), vec![call("api", 0)]);
    }

    #[tokio::test]
    async fn cooldown_override_annotation() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let now = Utc::now();
        let mut t = target("api", 1);
        t.cooldown = Some("5m".to_string());
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(now - TimeDelta::minutes(6)),
                ..Default::default()
            },
        );

        let action = idler.reconcile_at(&t, MetricReading::Idle, now).await;

        assert_eq!(action, Action::ScaledToZero);
    }

    #[test]
    fn invalid_override_falls_back_to_default() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster).with_default_cooldown(Duration::from_secs(600));
        let mut t = target("api", 1);

        assert_eq!(idler.cooldown_for(&t), Duration::from_secs(600));

        t.cooldown = Some("later".to_string());
        assert_eq!(idler.cooldown_for(&t), Duration::from_secs(600));

        t.cooldown = Some("1h30m".to_string());
        assert_eq!(idler.cooldown_for(&t), Duration::from_secs(5400));
    }

    #[tokio::test]
    async fn demand_return_while_scaling_down_restores() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        idler.store().set(
            "default/api",
            ReconciliationState {
                idle_started: Some(Utc::now() - TimeDelta::hours(1)),
                scaling_down: true,
                ..Default::default()
            },
        );

        let action = idler.reconcile(&target("api", 0), MetricReading::Active).await;

        assert_eq!(action, Action::Restored { replicas: 1 });
        let state = idler.store().get("default/api");
        assert_eq!(state.idle_started, None);
        assert!(!state.scaling_down);
        assert!(state.scaling_up);
        assert_eq!(cluster.calls(), vec![call("api", 1)]);
    }

    #[tokio::test]
    async fn restore_uses_min_replicas() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let mut t = target("api", 0);
        t.min_replicas = Some(4);

        let action = idler.reconcile(&t, MetricReading::Active).await;

        assert_eq!(action, Action::Restored { replicas: 4 });
        assert_eq!(cluster.calls(), vec![call("api", 4)]);
    }

    #[tokio::test]
    async fn restore_is_not_reissued_until_confirmed() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let t = target("api", 0);

        idler.reconcile(&t, MetricReading::Active).await;
        let action = idler.reconcile(&t, MetricReading::Active).await;
        assert_eq!(action, Action::NoChange);
        assert_eq!(cluster.calls().len(), 1);

        let action = idler.reconcile(&target("api", 1), MetricReading::Active).await;
        assert_eq!(action, Action::RestoreConfirmed);
        assert!(!idler.store().get("default/api").scaling_up);
    }

    #[tokio::test]
    async fn failed_restore_retries_next_cycle() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);
        let t = target("api", 0);

        cluster.fail_scale(true);
        assert_eq!(
            idler.reconcile(&t, MetricReading::Active).await,
            Action::ScaleFailed
        );
        assert!(!idler.store().get("default/api").scaling_up);

        cluster.fail_scale(false);
        assert_eq!(
            idler.reconcile(&t, MetricReading::Active).await,
            Action::Restored { replicas: 1 }
        );
    }

    #[tokio::test]
    async fn active_with_replicas_is_no_change() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster);

        let action = idler.reconcile(&target("api", 2), MetricReading::Active).await;

        assert_eq!(action, Action::NoChange);
        assert_eq!(idler.store().get("default/api"), ReconciliationState::default());
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let cluster = Arc::new(FakeCluster::new());
        let idler = idler(&cluster).with_default_cooldown(Duration::from_secs(60));
        let start = Utc::now();

        // Idle for two minutes with 2 replicas.
        let t = target("api", 2);
        idler.reconcile_at(&t, MetricReading::Idle, start).await;
        let action = idler
            .reconcile_at(&t, MetricReading::Idle, start + TimeDelta::minutes(2))
            .await;
        assert_eq!(action, Action::ScaledToZero);

        // Autoscaler now reports zero.
        let t = target("api", 0);
        let action = idler
            .reconcile_at(&t, MetricReading::Idle, start + TimeDelta::minutes(3))
            .await;
        assert_eq!(action, Action::ScaleDownConfirmed);

        // Demand arrives.
        let action = idler
            .reconcile_at(&t, MetricReading::Active, start + TimeDelta::minutes(4))
            .await;
        assert_eq!(action, Action::Restored { replicas: 1 });

        let t = target("api", 1);
        let action = idler
            .reconcile_at(&t, MetricReading::Active, start + TimeDelta::minutes(5))
            .await;
        assert_eq!(action, Action::RestoreConfirmed);

        assert_eq!(cluster.calls(), vec![call("api", 0), call("api", 1)]);
        assert_eq!(idler.store().get("default/api"), ReconciliationState::default());
    }
}
