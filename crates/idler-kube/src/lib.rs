//! idler-kube — Kubernetes implementations of the idler backends.
//!
//! - [`KubeCluster`] lists `autoscaling/v2` HorizontalPodAutoscalers
//!   carrying the scale-to-zero labels and scales their target workloads
//!   with RFC 6902 JSON Patches that only touch `spec.replicas`.
//! - [`KubeMetrics`] reads function demand from the
//!   `custom.metrics.k8s.io/v1beta1` API.

pub mod cluster;
pub mod metrics;
pub mod patch;
pub mod target;

pub use cluster::KubeCluster;
pub use metrics::KubeMetrics;
