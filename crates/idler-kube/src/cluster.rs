//! KubeCluster — autoscaler discovery and workload scaling.

use std::fmt::Debug;

use async_trait::async_trait;
use idler_core::labels::DISCOVERY_SELECTOR;
use idler_core::{ScaleRef, Target};
use idler_scale::{ClusterApi, ClusterError, ClusterResult};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::patch::replicas_patch;
use crate::target::target_from_hpa;

/// Convert any `Display` error into a `ClusterError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| ClusterError::$variant(e.to_string())
    };
}

/// Workload kinds a scale reference may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    /// Resolve the kind of `scale_ref`; anything but an `apps/v1`
    /// Deployment or StatefulSet is unsupported.
    pub fn of(scale_ref: &ScaleRef) -> ClusterResult<Self> {
        match scale_ref.kind.as_str() {
            "Deployment" => Ok(Self::Deployment),
            "StatefulSet" => Ok(Self::StatefulSet),
            other => Err(ClusterError::UnsupportedKind(other.to_string())),
        }
    }
}

/// [`ClusterApi`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Read the workload, diff a replica change, and send it as a JSON Patch.
    async fn scale_resource<K>(&self, namespace: &str, name: &str, replicas: i32) -> ClusterResult<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let current = api.get(name).await.map_err(map_err!(Api))?;

        let before = serde_json::to_value(&current).map_err(map_err!(Serialize))?;
        let diff = replicas_patch(&before, replicas)?;
        if diff.0.is_empty() {
            debug!(%namespace, %name, replicas, "replica count already applied");
            return Ok(());
        }

        let ops = serde_json::to_value(&diff).map_err(map_err!(Serialize))?;
        let patch = Patch::<()>::Json(serde_json::from_value(ops).map_err(map_err!(Serialize))?);
        api.patch(name, &PatchParams::default(), &patch)
            .await
            .map_err(map_err!(Api))?;
        Ok(())
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_targets(&self) -> ClusterResult<Vec<Target>> {
        let api: Api<HorizontalPodAutoscaler> = Api::all(self.client.clone());
        let params = ListParams::default().labels(DISCOVERY_SELECTOR);
        let list = api.list(&params).await.map_err(map_err!(Api))?;

        let mut targets = Vec::with_capacity(list.items.len());
        for hpa in &list.items {
            match target_from_hpa(hpa) {
                Ok(target) => targets.push(target),
                Err(e) => warn!(autoscaler = %hpa.name_any(), error = %e, "skipping autoscaler"),
            }
        }

        debug!(count = targets.len(), "discovered scale-to-zero targets");
        Ok(targets)
    }

    async fn scale(&self, namespace: &str, scale_ref: &ScaleRef, replicas: i32) -> ClusterResult<()> {
        match WorkloadKind::of(scale_ref)? {
            WorkloadKind::Deployment => {
                self.scale_resource::<Deployment>(namespace, &scale_ref.name, replicas)
                    .await
            }
            WorkloadKind::StatefulSet => {
                self.scale_resource::<StatefulSet>(namespace, &scale_ref.name, replicas)
                    .await
            }
        }
    }
}
