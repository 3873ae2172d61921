pub mod profile;
pub mod sample;
pub mod workout;

pub use profile::UserProfile;
pub use sample::{PositionSample, RoutePoint};
pub use workout::{WorkoutSession, WorkoutState};
