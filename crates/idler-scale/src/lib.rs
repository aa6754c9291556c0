//! idler-scale — scale-to-zero reconciliation.
//!
//! Polls every scale-to-zero enabled autoscaler, reads its demand metric,
//! and drives each target through a small state machine:
//!
//! ```text
//! Active ──zero demand──▶ Idling ──cooldown elapsed──▶ ScalingDown ──replicas == 0──▶ Idle at zero
//!   ▲                       │                            │                              │
//!   └──────demand───────────┴────────────demand──────────┘                              │
//!   ▲                                                                                   │
//!   └──replicas > 0── ScalingUp ◀──────────────────────demand───────────────────────────┘
//! ```
//!
//! Scale commands are fire-and-forget. The `scaling_up`/`scaling_down`
//! flags suppress re-issuing a command until the autoscaler reports the
//! new replica count, and are only set when the command succeeded, so a
//! failed command is retried on the next cycle.
//!
//! The cluster and metrics backends are injected through [`ClusterApi`]
//! and [`MetricsApi`]; `idler-kube` provides the Kubernetes versions.

pub mod cluster;
pub mod error;
pub mod idler;
pub mod reconciler;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use cluster::{ClusterApi, MetricsApi};
pub use error::{ClusterError, ClusterResult};
pub use idler::{Action, DEFAULT_COOLDOWN, Idler};
pub use reconciler::{CycleReport, Reconciler, SkipReason, TargetOutcome, DEFAULT_INTERVAL};
