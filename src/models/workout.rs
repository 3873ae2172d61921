use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RoutePoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutState {
    #[default]
    Idle,
    Active,
    Paused,
    Stopped,
}

impl WorkoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutState::Idle => "Idle",
            WorkoutState::Active => "Active",
            WorkoutState::Paused => "Paused",
            WorkoutState::Stopped => "Stopped",
        }
    }

    /// Active or Paused: a session exists and has not been finalised.
    pub fn in_session(&self) -> bool {
        matches!(self, WorkoutState::Active | WorkoutState::Paused)
    }
}

/// Terminal record of a finished workout. Built once on stop and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    pub distance_meters: f64,
    pub duration_millis: u64,
    pub calories_kcal: f64,
    pub route_points: Vec<RoutePoint>,
    pub average_pace_kmh: f64,
    pub started_at: DateTime<Utc>,
    /// Completion time.
    pub timestamp: DateTime<Utc>,
}

impl WorkoutSession {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }
}
