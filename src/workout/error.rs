use thiserror::Error;

use crate::models::WorkoutState;
use crate::tracking::ProviderError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    /// No location access. The workout was not started.
    #[error("tracking unavailable: location permission not granted")]
    PermissionDenied,

    #[error("tracking unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("weight must be a positive number of kilograms, got {0}")]
    InvalidWeight(f64),

    #[error("cannot {action} a workout while {from:?}")]
    InvalidTransition {
        from: WorkoutState,
        action: &'static str,
    },
}

impl TrackingError {
    /// Location could not be obtained at all, as opposed to a misuse of the API.
    pub fn is_tracking_unavailable(&self) -> bool {
        matches!(
            self,
            TrackingError::PermissionDenied | TrackingError::ProviderUnavailable(_)
        )
    }
}

impl From<ProviderError> for TrackingError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::PermissionDenied => TrackingError::PermissionDenied,
            ProviderError::Unavailable(reason) => TrackingError::ProviderUnavailable(reason),
        }
    }
}
