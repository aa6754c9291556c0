//! Backend seams: target discovery, scaling, and demand metrics.

use async_trait::async_trait;
use idler_core::{ScaleRef, Target};

use crate::error::ClusterResult;

/// Discovery and scaling against the cluster.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List every autoscaler opted into scale-to-zero.
    async fn list_targets(&self) -> ClusterResult<Vec<Target>>;

    /// Set the replica count of `scale_ref` in `namespace`, touching no
    /// other field.
    async fn scale(&self, namespace: &str, scale_ref: &ScaleRef, replicas: i32) -> ClusterResult<()>;
}

/// Current demand for a target.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Fetch the raw quantity of `metric` for the target `name`.
    ///
    /// `Ok(None)` means the metrics backend answered without a value.
    async fn current_value(
        &self,
        namespace: &str,
        name: &str,
        metric: &str,
    ) -> ClusterResult<Option<String>>;
}
