//! Reconciler — the polling loop.
//!
//! Every cycle lists the scale-to-zero targets, then reconciles each one
//! in its own task. The next cycle only starts after every task of the
//! current one has finished, so no two reconciliations of the same
//! target ever overlap.

use std::sync::Arc;
use std::time::Duration;

use idler_core::{MetricReading, Target};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cluster::MetricsApi;
use crate::idler::{Action, Idler};

/// Delay between the end of one cycle and the start of the next.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Why a target was left untouched this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The autoscaler has no object metric to query.
    MissingMetricName,
    /// The metrics backend errored, returned nothing, or returned a
    /// non-numeric value.
    MetricUnavailable,
}

/// Result of processing one target in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    Reconciled(Action),
    Skipped(SkipReason),
}

/// Summary of a single cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Discovery failed and no target was processed.
    pub discovery_failed: bool,
    pub discovered: usize,
    /// Per-target outcomes, sorted by target key.
    pub outcomes: Vec<(String, TargetOutcome)>,
    /// Tasks that panicked or were cancelled.
    pub failed: usize,
}

impl CycleReport {
    pub fn reconciled(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TargetOutcome::Reconciled(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TargetOutcome::Skipped(_)))
            .count()
    }

    pub fn outcome(&self, key: &str) -> Option<TargetOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, o)| *o)
    }
}

/// Periodically reconciles all scale-to-zero targets.
pub struct Reconciler {
    idler: Arc<Idler>,
    metrics: Arc<dyn MetricsApi>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(idler: Idler, metrics: Arc<dyn MetricsApi>) -> Self {
        Self {
            idler: Arc::new(idler),
            metrics,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn idler(&self) -> &Idler {
        &self.idler
    }

    /// Run one discovery + reconcile pass over all targets.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        self.idler.store().purge_expired();

        let targets = match self.idler.cluster().list_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                error!(error = %e, "failed to retrieve scaling information");
                report.discovery_failed = true;
                return report;
            }
        };

        report.discovered = targets.len();
        if targets.is_empty() {
            debug!("no scale-to-zero targets found");
            return report;
        }

        let mut tasks = JoinSet::new();
        for target in targets {
            let idler = Arc::clone(&self.idler);
            let metrics = Arc::clone(&self.metrics);
            tasks.spawn(async move {
                let outcome = reconcile_target(&idler, metrics.as_ref(), &target).await;
                (target.key(), outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => report.outcomes.push(entry),
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "reconcile task failed");
                }
            }
        }

        report.outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }

    /// Run cycles until `shutdown` flips or its sender is dropped.
    ///
    /// An in-flight cycle is abandoned on shutdown; its tasks are
    /// cancelled when the cycle future is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "idler started");

        while !*shutdown.borrow() {
            tokio::select! {
                report = self.run_cycle() => {
                    debug!(
                        discovered = report.discovered,
                        reconciled = report.reconciled(),
                        skipped = report.skipped(),
                        failed = report.failed,
                        "cycle complete"
                    );
                }
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("idler stopped");
    }
}

/// Fetch the target's demand and hand it to the state machine.
async fn reconcile_target(idler: &Idler, metrics: &dyn MetricsApi, target: &Target) -> TargetOutcome {
    let key = target.key();

    let Some(metric) = target.metric() else {
        warn!(function = %key, "unable to find metric name on autoscaler");
        return TargetOutcome::Skipped(SkipReason::MissingMetricName);
    };

    let raw = match metrics
        .current_value(&target.namespace, &target.name, metric)
        .await
    {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            warn!(function = %key, %metric, "unable to find metric value");
            return TargetOutcome::Skipped(SkipReason::MetricUnavailable);
        }
        Err(e) => {
            warn!(function = %key, %metric, error = %e, "failed to retrieve metrics");
            return TargetOutcome::Skipped(SkipReason::MetricUnavailable);
        }
    };

    let Some(reading) = MetricReading::from_quantity(&raw) else {
        warn!(function = %key, %metric, value = %raw, "metric value is not a quantity");
        return TargetOutcome::Skipped(SkipReason::MetricUnavailable);
    };

    TargetOutcome::Reconciled(idler.reconcile(target, reading).await)
}
