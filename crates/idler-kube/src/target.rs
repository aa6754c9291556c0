//! Conversion from HorizontalPodAutoscaler objects to idler targets.

use idler_core::labels::SCALE_TO_ZERO_COOLDOWN;
use idler_core::{ScaleRef, Target};
use idler_scale::{ClusterError, ClusterResult};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use kube::ResourceExt;

/// Build a [`Target`] from an autoscaler.
///
/// The metric name comes from the first object metric in the spec; an
/// autoscaler without one still converts, and is skipped later.
pub fn target_from_hpa(hpa: &HorizontalPodAutoscaler) -> ClusterResult<Target> {
    let name = hpa.name_any();
    let namespace = hpa
        .namespace()
        .ok_or_else(|| ClusterError::Malformed(format!("autoscaler {name} has no namespace")))?;
    let spec = hpa
        .spec
        .as_ref()
        .ok_or_else(|| ClusterError::Malformed(format!("autoscaler {namespace}/{name} has no spec")))?;
    let status = hpa
        .status
        .as_ref()
        .ok_or_else(|| ClusterError::Malformed(format!("autoscaler {namespace}/{name} has no status")))?;

    let metric_name = spec
        .metrics
        .as_ref()
        .and_then(|metrics| metrics.first())
        .and_then(|metric| metric.object.as_ref())
        .map(|object| object.metric.name.clone());

    Ok(Target {
        cooldown: hpa.annotations().get(SCALE_TO_ZERO_COOLDOWN).cloned(),
        desired_replicas: status.desired_replicas,
        scale_ref: ScaleRef {
            kind: spec.scale_target_ref.kind.clone(),
            name: spec.scale_target_ref.name.clone(),
        },
        min_replicas: spec.min_replicas,
        metric_name,
        namespace,
        name,
    })
}
