//! Workout tracking core: turns noisy GPS fixes into a route, distance and
//! active duration, and drives the start/pause/resume/stop session lifecycle.

pub mod db;
pub mod models;
pub mod profile;
pub mod tracking;
mod utils;
pub mod workout;

pub use db::{Database, WorkoutTotals};
pub use models::{PositionSample, RoutePoint, UserProfile, WorkoutSession, WorkoutState};
pub use profile::ProfileStore;
pub use tracking::{
    AnchorPolicy, FilterConfig, LocationProvider, LocationRequest, ManualLocationProvider,
    MovementFilter, ProviderError, SampleOutcome, SampleSink, Subscription,
};
pub use utils::logging::init_logging;
pub use workout::{
    TrackingError, WorkoutChannels, WorkoutConfig, WorkoutController, WorkoutSnapshot,
};
