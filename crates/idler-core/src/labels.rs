//! Label and annotation keys shared with the rest of the justfaas stack.

/// Label carrying the function name. Presence is required for discovery.
pub const FUNCTION_NAME: &str = "justfaas.com/name";

/// Label opting an autoscaler into scale-to-zero.
pub const SCALE_TO_ZERO: &str = "justfaas.com/scale-to-zero";

/// Annotation holding a per-target cooldown override (e.g. `"1h30m"`).
pub const SCALE_TO_ZERO_COOLDOWN: &str = "justfaas.com/scale-to-zero-cooldown";

/// Label selector used to discover managed autoscalers.
pub const DISCOVERY_SELECTOR: &str = "justfaas.com/name,justfaas.com/scale-to-zero=true";

/// API group and plural of the custom-metrics described object.
pub const METRICS_DESCRIBED_OBJECT: &str = "functions.justfaas.com";
