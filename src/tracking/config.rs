use serde::{Deserialize, Serialize};

/// What happens to the reference sample when a fix passes the accuracy gate
/// but is not classified as movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorPolicy {
    /// Next Δt is measured from this fix; the position reference stays at the
    /// last movement point so slow drift still accumulates.
    #[default]
    AdvanceTimeReference,
    /// Neither the position nor the time reference moves.
    HoldReference,
}

impl AnchorPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "advance" | "advance_time_reference" => Some(AnchorPolicy::AdvanceTimeReference),
            "hold" | "hold_reference" => Some(AnchorPolicy::HoldReference),
            _ => None,
        }
    }
}

/// Thresholds for the movement filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    /// Fixes with a larger accuracy radius are dropped as noise (inclusive bound).
    pub max_accuracy_meters: f64,
    /// A delta must exceed this to count as movement.
    pub min_movement_meters: f64,
    /// Exclusive speed window in m/s; below is jitter at rest, above is a teleporting fix.
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    /// Minimum spacing between rendered route points.
    pub route_spacing_meters: f64,
    pub anchor_policy: AnchorPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_accuracy_meters: 20.0,
            min_movement_meters: 1.0,
            min_speed_mps: 0.3,
            max_speed_mps: 8.0,
            route_spacing_meters: 1.0,
            anchor_policy: AnchorPolicy::default(),
        }
    }
}

impl FilterConfig {
    pub fn with_anchor_policy(mut self, anchor_policy: AnchorPolicy) -> Self {
        self.anchor_policy = anchor_policy;
        self
    }
}
