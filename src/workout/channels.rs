//! Latest-value channels the presentation layer observes.
//!
//! Each metric is its own `watch` channel. A fresh receiver sees the current
//! value straight away through `borrow()`, then `changed()` wakes on updates.
//! Dropping the receiver is the unsubscribe. Publishing never fails: with no
//! observers the value is stored for the next subscriber.

use tokio::sync::watch;

use crate::models::{RoutePoint, WorkoutSession, WorkoutState};

pub struct WorkoutChannels {
    tracking: watch::Sender<bool>,
    state: watch::Sender<WorkoutState>,
    duration_ms: watch::Sender<u64>,
    distance_meters: watch::Sender<f64>,
    calories_kcal: watch::Sender<f64>,
    pace_kmh: watch::Sender<f64>,
    route_points: watch::Sender<Vec<RoutePoint>>,
    current_position: watch::Sender<Option<RoutePoint>>,
    last_session: watch::Sender<Option<WorkoutSession>>,
}

fn replace_if_changed<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

impl WorkoutChannels {
    pub fn new() -> Self {
        Self {
            tracking: watch::channel(false).0,
            state: watch::channel(WorkoutState::Idle).0,
            duration_ms: watch::channel(0).0,
            distance_meters: watch::channel(0.0).0,
            calories_kcal: watch::channel(0.0).0,
            pace_kmh: watch::channel(0.0).0,
            route_points: watch::channel(Vec::new()).0,
            current_position: watch::channel(None).0,
            last_session: watch::channel(None).0,
        }
    }

    pub fn tracking(&self) -> watch::Receiver<bool> {
        self.tracking.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<WorkoutState> {
        self.state.subscribe()
    }

    pub fn duration_ms(&self) -> watch::Receiver<u64> {
        self.duration_ms.subscribe()
    }

    pub fn distance_meters(&self) -> watch::Receiver<f64> {
        self.distance_meters.subscribe()
    }

    pub fn calories_kcal(&self) -> watch::Receiver<f64> {
        self.calories_kcal.subscribe()
    }

    pub fn pace_kmh(&self) -> watch::Receiver<f64> {
        self.pace_kmh.subscribe()
    }

    pub fn route_points(&self) -> watch::Receiver<Vec<RoutePoint>> {
        self.route_points.subscribe()
    }

    pub fn current_position(&self) -> watch::Receiver<Option<RoutePoint>> {
        self.current_position.subscribe()
    }

    /// Most recently completed workout.
    pub fn last_session(&self) -> watch::Receiver<Option<WorkoutSession>> {
        self.last_session.subscribe()
    }

    /// Number of live receivers across all channels.
    pub fn observer_count(&self) -> usize {
        self.tracking.receiver_count()
            + self.state.receiver_count()
            + self.duration_ms.receiver_count()
            + self.distance_meters.receiver_count()
            + self.calories_kcal.receiver_count()
            + self.pace_kmh.receiver_count()
            + self.route_points.receiver_count()
            + self.current_position.receiver_count()
            + self.last_session.receiver_count()
    }

    pub(crate) fn publish_state(&self, state: WorkoutState) {
        replace_if_changed(&self.state, state);
        replace_if_changed(&self.tracking, state == WorkoutState::Active);
    }

    pub(crate) fn publish_duration(&self, duration_ms: u64) {
        replace_if_changed(&self.duration_ms, duration_ms);
    }

    pub(crate) fn publish_distance(&self, distance_meters: f64) {
        replace_if_changed(&self.distance_meters, distance_meters);
    }

    pub(crate) fn publish_derived(&self, calories_kcal: f64, pace_kmh: f64) {
        replace_if_changed(&self.calories_kcal, calories_kcal);
        replace_if_changed(&self.pace_kmh, pace_kmh);
    }

    pub(crate) fn publish_route(&self, points: &[RoutePoint]) {
        self.route_points.send_if_modified(|current| {
            if current.as_slice() == points {
                false
            } else {
                current.clear();
                current.extend_from_slice(points);
                true
            }
        });
    }

    pub(crate) fn publish_position(&self, position: Option<RoutePoint>) {
        replace_if_changed(&self.current_position, position);
    }

    pub(crate) fn publish_session(&self, session: WorkoutSession) {
        self.last_session.send_replace(Some(session));
    }
}

impl Default for WorkoutChannels {
    fn default() -> Self {
        Self::new()
    }
}
