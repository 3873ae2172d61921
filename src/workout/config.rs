use std::time::Duration;

use log::warn;

use crate::models::UserProfile;
use crate::tracking::{AnchorPolicy, FilterConfig, LocationRequest};

/// Everything the session controller needs at construction.
#[derive(Debug, Clone)]
pub struct WorkoutConfig {
    /// Weight feeds the calorie estimate; the rest is carried for display.
    pub profile: UserProfile,
    pub filter: FilterConfig,
    /// How often duration, calories and pace are refreshed while active.
    pub tick_interval: Duration,
    pub location_request: LocationRequest,
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            profile: UserProfile::default(),
            filter: FilterConfig::default(),
            tick_interval: Duration::from_secs(1),
            location_request: LocationRequest::default(),
        }
    }
}

impl WorkoutConfig {
    pub fn with_profile(profile: UserProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// Defaults overridden by `FITSYNC_TICK_MS` and `FITSYNC_ANCHOR_POLICY`.
    pub fn from_env(profile: UserProfile) -> Self {
        let mut config = Self::with_profile(profile);

        if let Ok(value) = std::env::var("FITSYNC_TICK_MS") {
            match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.tick_interval = Duration::from_millis(ms),
                _ => warn!("ignoring FITSYNC_TICK_MS={value:?}: expected a positive integer"),
            }
        }

        if let Ok(value) = std::env::var("FITSYNC_ANCHOR_POLICY") {
            match AnchorPolicy::parse(&value) {
                Some(policy) => config.filter.anchor_policy = policy,
                None => warn!("ignoring FITSYNC_ANCHOR_POLICY={value:?}: expected advance or hold"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_tick_every_second() {
        let config = WorkoutConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.profile.weight_kg, 70.0);
        assert_eq!(config.filter.anchor_policy, AnchorPolicy::AdvanceTimeReference);
    }

    #[test]
    fn env_overrides_are_applied_and_bad_values_ignored() {
        std::env::set_var("FITSYNC_TICK_MS", "250");
        std::env::set_var("FITSYNC_ANCHOR_POLICY", "hold");
        let config = WorkoutConfig::from_env(UserProfile::default());
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.filter.anchor_policy, AnchorPolicy::HoldReference);

        std::env::set_var("FITSYNC_TICK_MS", "soon");
        std::env::set_var("FITSYNC_ANCHOR_POLICY", "sideways");
        let config = WorkoutConfig::from_env(UserProfile::default());
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.filter.anchor_policy, AnchorPolicy::AdvanceTimeReference);

        std::env::remove_var("FITSYNC_TICK_MS");
        std::env::remove_var("FITSYNC_ANCHOR_POLICY");
    }
}
