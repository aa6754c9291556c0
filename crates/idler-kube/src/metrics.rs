//! KubeMetrics — function demand from the custom metrics API.

use async_trait::async_trait;
use idler_core::labels::METRICS_DESCRIBED_OBJECT;
use idler_scale::{ClusterError, ClusterResult, MetricsApi};
use kube::Client;
use serde::Deserialize;

/// `custom.metrics.k8s.io/v1beta1` MetricValueList, reduced to the fields
/// the idler reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValueList {
    #[serde(default)]
    pub items: Vec<MetricValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricValue {
    /// Quantity string, e.g. `"0"` or `"1500m"`.
    pub value: String,
}

/// API path of a function metric.
pub fn metric_path(namespace: &str, name: &str, metric: &str) -> String {
    format!(
        "/apis/custom.metrics.k8s.io/v1beta1/namespaces/{namespace}/{METRICS_DESCRIBED_OBJECT}/{name}/{metric}"
    )
}

/// [`MetricsApi`] backed by the Kubernetes custom metrics API.
#[derive(Clone)]
pub struct KubeMetrics {
    client: Client,
}

impl KubeMetrics {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsApi for KubeMetrics {
    async fn current_value(
        &self,
        namespace: &str,
        name: &str,
        metric: &str,
    ) -> ClusterResult<Option<String>> {
        let request = http::Request::get(metric_path(namespace, name, metric))
            .body(Vec::new())
            .map_err(|e| ClusterError::Api(e.to_string()))?;

        let list: MetricValueList = self
            .client
            .request(request)
            .await
            .map_err(|e| ClusterError::Api(e.to_string()))?;

        Ok(list.items.into_iter().next().map(|item| item.value))
    }
}
