//! Error types for cluster and metrics backends.

use thiserror::Error;

/// Result type alias for backend operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors returned by [`ClusterApi`](crate::ClusterApi) and
/// [`MetricsApi`](crate::MetricsApi) implementations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("api error: {0}")]
    Api(String),

    #[error("unsupported scale target kind: {0}")]
    UnsupportedKind(String),

    #[error("malformed resource: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}
