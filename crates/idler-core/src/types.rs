//! Target and metric types shared across faas-idler crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Replica count restored when a target has no usable minimum.
pub const DEFAULT_MIN_REPLICAS: i32 = 1;

// ── Target ─────────────────────────────────────────────────────────

/// The workload an autoscaler drives, i.e. what a scale command patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRef {
    /// Resource kind, e.g. `Deployment`.
    pub kind: String,
    pub name: String,
}

impl ScaleRef {
    pub fn deployment(name: impl Into<String>) -> Self {
        Self {
            kind: "Deployment".to_string(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ScaleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.apps/{}", self.kind.to_ascii_lowercase(), self.name)
    }
}

/// A scale-to-zero enabled autoscaler as observed in the current poll.
///
/// Targets are rebuilt from the cluster every cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub namespace: String,
    pub name: String,
    /// Desired replica count last reported by the autoscaler.
    pub desired_replicas: i32,
    pub scale_ref: ScaleRef,
    /// Minimum replicas from the autoscaler spec.
    pub min_replicas: Option<i32>,
    /// Raw cooldown annotation value, parsed by the state machine.
    pub cooldown: Option<String>,
    /// Custom metric used to measure demand.
    pub metric_name: Option<String>,
}

impl Target {
    /// Store key: `{namespace}/{name}`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Replica count a restore scales to. Non-positive minimums fall back
    /// to [`DEFAULT_MIN_REPLICAS`].
    pub fn restore_replicas(&self) -> i32 {
        self.min_replicas
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MIN_REPLICAS)
    }

    /// The metric name, if present and non-empty.
    pub fn metric(&self) -> Option<&str> {
        self.metric_name.as_deref().filter(|m| !m.is_empty())
    }
}

// ── Metric reading ─────────────────────────────────────────────────

/// Demand classification for one target in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricReading {
    /// The metric reported zero.
    Idle,
    /// The metric reported any nonzero value.
    Active,
}

/// Suffixes accepted by Kubernetes resource quantities.
const QUANTITY_SUFFIXES: &[&str] = &[
    "", "n", "u", "m", "k", "M", "G", "T", "P", "E", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei",
];

impl MetricReading {
    /// Classify a Kubernetes quantity string (`"0"`, `"250m"`, `"1k"`).
    ///
    /// Returns `None` for values that are not quantities; callers treat
    /// that as an unavailable reading.
    pub fn from_quantity(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-')))
            .unwrap_or(raw.len());
        let (number, suffix) = raw.split_at(split);

        if !is_quantity_suffix(suffix) {
            return None;
        }

        let value: f64 = number.parse().ok()?;
        if !value.is_finite() {
            return None;
        }

        if value == 0.0 {
            Some(MetricReading::Idle)
        } else {
            Some(MetricReading::Active)
        }
    }
}

fn is_quantity_suffix(suffix: &str) -> bool {
    if QUANTITY_SUFFIXES.contains(&suffix) {
        return true;
    }
    // Decimal exponent form: 1e3, 5E-2.
    match suffix.strip_prefix(['e', 'E']) {
        Some(exp) => exp.parse::<i32>().is_ok(),
        None => false,
    }
}
