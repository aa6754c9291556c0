//! In-memory backends for tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! - [`FakeCluster`] — scripted target list, recorded scale calls,
//!   switchable discovery and scale failures.
//! - [`FakeMetrics`] — per-target raw values, errors or panics, with an
//!   optional response delay.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use idler_core::{ScaleRef, Target};

use crate::cluster::{ClusterApi, MetricsApi};
use crate::error::{ClusterError, ClusterResult};

/// Build a target named `name` in `default`, backed by a deployment of the
/// same name and measured by the `requests` metric.
pub fn target(name: &str, desired_replicas: i32) -> Target {
    Target {
        namespace: "default".to_string(),
        name: name.to_string(),
        desired_replicas,
        scale_ref: ScaleRef::deployment(name),
        min_replicas: None,
        cooldown: None,
        metric_name: Some("requests".to_string()),
    }
}

/// A recorded scale command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleCall {
    pub namespace: String,
    pub name: String,
    pub replicas: i32,
}

#[derive(Default)]
pub struct FakeCluster {
    targets: Mutex<Vec<Target>>,
    calls: Mutex<Vec<ScaleCall>>,
    fail_discovery: AtomicBool,
    fail_scale: AtomicBool,
    list_count: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(targets: Vec<Target>) -> Self {
        let cluster = Self::default();
        cluster.set_targets(targets);
        cluster
    }

    pub fn set_targets(&self, targets: Vec<Target>) {
        *self.targets.lock().unwrap() = targets;
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scale(&self, fail: bool) {
        self.fail_scale.store(fail, Ordering::SeqCst);
    }

    /// Every successful scale call so far, in order.
    pub fn calls(&self) -> Vec<ScaleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_targets(&self) -> ClusterResult<Vec<Target>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(ClusterError::Api("discovery unavailable".to_string()));
        }
        Ok(self.targets.lock().unwrap().clone())
    }

    async fn scale(&self, namespace: &str, scale_ref: &ScaleRef, replicas: i32) -> ClusterResult<()> {
        if self.fail_scale.load(Ordering::SeqCst) {
            return Err(ClusterError::Api("patch rejected".to_string()));
        }
        self.calls.lock().unwrap().push(ScaleCall {
            namespace: namespace.to_string(),
            name: scale_ref.name.clone(),
            replicas,
        });
        Ok(())
    }
}

/// Metrics keyed by target name. Unknown names answer `Ok(None)`.
#[derive(Default)]
pub struct FakeMetrics {
    values: Mutex<HashMap<String, Result<String, String>>>,
    panics: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), Ok(value.to_string()));
    }

    pub fn set_error(&self, name: &str, message: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), Err(message.to_string()));
    }

    /// Make queries for `name` panic inside the reconcile task.
    pub fn panic_on(&self, name: &str) {
        self.panics.lock().unwrap().insert(name.to_string());
    }

    /// Sleep for `delay` before answering any query.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl MetricsApi for FakeMetrics {
    async fn current_value(
        &self,
        _namespace: &str,
        name: &str,
        _metric: &str,
    ) -> ClusterResult<Option<String>> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let panics = self.panics.lock().unwrap().contains(name);
        if panics {
            panic!("metrics backend panicked for {name}");
        }

        match self.values.lock().unwrap().get(name) {
            Some(Ok(value)) => Ok(Some(value.clone())),
            Some(Err(message)) => Err(ClusterError::Api(message.clone())),
            None => Ok(None),
        }
    }
}
