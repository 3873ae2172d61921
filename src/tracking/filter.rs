use serde::Serialize;

use crate::models::{PositionSample, RoutePoint};

use super::config::{AnchorPolicy, FilterConfig};
use super::geodesic::{distance_meters, sample_distance_meters};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    InaccurateFix { accuracy_meters: f64 },
    InvalidCoordinates,
    /// Timestamp earlier than the current time reference.
    OutOfOrder { delta_millis: i64 },
}

/// What the filter did with one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleOutcome {
    /// First in-accuracy fix of the session. Starts the route, adds no distance.
    Anchored,
    Moved {
        delta_meters: f64,
        speed_mps: f64,
        route_extended: bool,
    },
    /// Passed the accuracy gate but looked like jitter or a speed spike.
    Stationary { distance_meters: f64, speed_mps: f64 },
    Rejected(RejectReason),
}

impl SampleOutcome {
    /// True when route or distance changed and observers need a refresh.
    pub fn changed_route(&self) -> bool {
        matches!(self, SampleOutcome::Anchored | SampleOutcome::Moved { .. })
    }
}

/// Turns raw fixes into a route and a running distance total.
///
/// The filter does not know about pause state; the session controller only
/// feeds it while a workout is active and calls [`MovementFilter::reset`]
/// between workouts.
#[derive(Debug, Clone)]
pub struct MovementFilter {
    config: FilterConfig,
    route: Vec<RoutePoint>,
    total_distance_meters: f64,
    last_accepted: Option<PositionSample>,
    /// Where the next Δt is measured from. Diverges from `last_accepted` under
    /// [`AnchorPolicy::AdvanceTimeReference`].
    time_reference_millis: Option<i64>,
}

impl MovementFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            route: Vec::new(),
            total_distance_meters: 0.0,
            last_accepted: None,
            time_reference_millis: None,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn on_sample(&mut self, sample: PositionSample) -> SampleOutcome {
        if !sample.has_valid_coordinates() {
            log_debug!("dropping fix with invalid coordinates: {:?}", sample);
            return SampleOutcome::Rejected(RejectReason::InvalidCoordinates);
        }

        // Written so that a NaN accuracy is rejected as well.
        if !(sample.accuracy_meters <= self.config.max_accuracy_meters) {
            log_debug!(
                "dropping fix: accuracy {:.1}m above {:.1}m",
                sample.accuracy_meters,
                self.config.max_accuracy_meters
            );
            return SampleOutcome::Rejected(RejectReason::InaccurateFix {
                accuracy_meters: sample.accuracy_meters,
            });
        }

        let Some(reference) = self.last_accepted else {
            self.route.push(sample.route_point());
            self.last_accepted = Some(sample);
            self.time_reference_millis = Some(sample.timestamp_millis);
            log_debug!(
                "anchored route at {:.6},{:.6}",
                sample.latitude,
                sample.longitude
            );
            return SampleOutcome::Anchored;
        };

        let time_reference = self
            .time_reference_millis
            .unwrap_or(reference.timestamp_millis);
        let delta_millis = sample.timestamp_millis - time_reference;
        if delta_millis < 0 {
            log_debug!("dropping out-of-order fix ({}ms behind)", -delta_millis);
            return SampleOutcome::Rejected(RejectReason::OutOfOrder { delta_millis });
        }

        let distance = sample_distance_meters(&reference, &sample);
        let speed_mps = if delta_millis > 0 {
            distance / (delta_millis as f64 / 1000.0)
        } else {
            0.0
        };

        let moving = distance > self.config.min_movement_meters
            && speed_mps > self.config.min_speed_mps
            && speed_mps < self.config.max_speed_mps;

        if !moving {
            if self.config.anchor_policy == AnchorPolicy::AdvanceTimeReference {
                self.time_reference_millis = Some(sample.timestamp_millis);
            }
            log_debug!(
                "not moving: {:.2}m at {:.2}m/s ({:?})",
                distance,
                speed_mps,
                self.config.anchor_policy
            );
            return SampleOutcome::Stationary {
                distance_meters: distance,
                speed_mps,
            };
        }

        let point = sample.route_point();
        let route_extended = self
            .route
            .last()
            .map_or(true, |last| distance_meters(last, &point) > self.config.route_spacing_meters);
        if route_extended {
            self.route.push(point);
        }

        self.total_distance_meters += distance;
        self.last_accepted = Some(sample);
        self.time_reference_millis = Some(sample.timestamp_millis);

        log_debug!(
            "moved {:.2}m at {:.2}m/s, total {:.1}m",
            distance,
            speed_mps,
            self.total_distance_meters
        );

        SampleOutcome::Moved {
            delta_meters: distance,
            speed_mps,
            route_extended,
        }
    }

    pub fn reset(&mut self) {
        self.route.clear();
        self.total_distance_meters = 0.0;
        self.last_accepted = None;
        self.time_reference_millis = None;
    }

    pub fn current_distance(&self) -> f64 {
        self.total_distance_meters
    }

    pub fn current_route_points(&self) -> &[RoutePoint] {
        &self.route
    }

    pub fn last_accepted(&self) -> Option<&PositionSample> {
        self.last_accepted.as_ref()
    }
}

impl Default for MovementFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
