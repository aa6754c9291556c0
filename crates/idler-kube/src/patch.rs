//! Replica-count JSON Patches.
//!
//! A scale command is the RFC 6902 diff between the workload as read and
//! the same document with `spec.replicas` changed, so no other field is
//! sent back to the API server.

use idler_scale::{ClusterError, ClusterResult};
use json_patch::Patch;
use serde_json::Value;

/// Diff `resource` against a copy with `spec.replicas = replicas`.
///
/// Returns an empty patch when the replica count already matches.
pub fn replicas_patch(resource: &Value, replicas: i32) -> ClusterResult<Patch> {
    let mut modified = resource.clone();
    let spec = modified
        .get_mut("spec")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ClusterError::Malformed("resource has no spec".to_string()))?;
    spec.insert("replicas".to_string(), Value::from(replicas));

    Ok(json_patch::diff(resource, &modified))
}
