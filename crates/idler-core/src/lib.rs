//! idler-core — shared types for the faas-idler workspace.
//!
//! Holds the pieces every other crate leans on: the cooldown duration
//! parser, the label and annotation keys that select managed targets,
//! the transient [`Target`] view of an autoscaler, metric-reading
//! classification, and the daemon's TOML configuration.

pub mod config;
pub mod duration;
pub mod labels;
pub mod types;

pub use config::{ConfigError, ConfigResult, IdlerConfig, Settings};
pub use duration::parse_duration;
pub use types::*;
