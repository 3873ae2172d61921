pub mod channels;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod metrics;

pub use channels::WorkoutChannels;
pub use config::WorkoutConfig;
pub use controller::{WorkoutController, WorkoutSnapshot};
pub use error::TrackingError;
