//! Seam between the tracker and the device location service.
//!
//! The platform side implements [`LocationProvider`]; the tracker hands it a
//! [`SampleSink`] when subscribing and keeps the returned [`Subscription`]
//! only for as long as it wants fixes.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PositionSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationPriority {
    HighAccuracy,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub interval: Duration,
    pub fastest_interval: Duration,
    pub min_displacement_meters: f64,
    pub priority: LocationPriority,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1_000),
            fastest_interval: Duration::from_millis(500),
            min_displacement_meters: 1.0,
            priority: LocationPriority::HighAccuracy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("location permission not granted")]
    PermissionDenied,

    #[error("location provider unavailable: {0}")]
    Unavailable(String),
}

/// Receives fixes from a provider. Called on the provider's own thread.
pub trait SampleSink: Send + Sync {
    fn on_sample(&self, sample: PositionSample);

    /// The provider failed after subscribing. No further samples will arrive.
    fn on_provider_error(&self, error: ProviderError) {
        let _ = error;
    }
}

pub trait LocationProvider: Send + Sync {
    fn subscribe(
        &self,
        request: &LocationRequest,
        sink: Arc<dyn SampleSink>,
    ) -> Result<Subscription, ProviderError>;
}

/// Scoped provider registration. Dropping it unsubscribes.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct ManualState {
    sink: Option<(u64, Arc<dyn SampleSink>)>,
    next_id: u64,
    permission_granted: bool,
    failure: Option<String>,
    last_request: Option<LocationRequest>,
}

/// Push-driven provider: platform glue (or a test) feeds fixes in with
/// [`ManualLocationProvider::push`] and they are forwarded to the current subscriber.
#[derive(Clone)]
pub struct ManualLocationProvider {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualLocationProvider {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                sink: None,
                next_id: 0,
                permission_granted: true,
                failure: None,
                last_request: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        lock_recovering(&self.inner)
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.lock().permission_granted = granted;
    }

    /// Makes subsequent `subscribe` calls fail with [`ProviderError::Unavailable`].
    pub fn set_unavailable(&self, reason: Option<String>) {
        self.lock().failure = reason;
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().sink.is_some()
    }

    pub fn last_request(&self) -> Option<LocationRequest> {
        self.lock().last_request.clone()
    }

    /// Delivers a fix. Returns false when nobody is subscribed.
    pub fn push(&self, sample: PositionSample) -> bool {
        // The sink may drop its subscription from inside the callback, so the
        // lock must not be held while it runs.
        let sink = self.lock().sink.as_ref().map(|(_, sink)| Arc::clone(sink));
        match sink {
            Some(sink) => {
                sink.on_sample(sample);
                true
            }
            None => false,
        }
    }

    /// Reports a runtime failure to the subscriber and detaches it.
    pub fn fail(&self, error: ProviderError) -> bool {
        let sink = self.lock().sink.take().map(|(_, sink)| sink);
        match sink {
            Some(sink) => {
                sink.on_provider_error(error);
                true
            }
            None => false,
        }
    }
}

impl Default for ManualLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for ManualLocationProvider {
    fn subscribe(
        &self,
        request: &LocationRequest,
        sink: Arc<dyn SampleSink>,
    ) -> Result<Subscription, ProviderError> {
        let id = {
            let mut state = self.lock();
            if !state.permission_granted {
                return Err(ProviderError::PermissionDenied);
            }
            if let Some(reason) = state.failure.clone() {
                return Err(ProviderError::Unavailable(reason));
            }
            state.next_id += 1;
            let id = state.next_id;
            state.sink = Some((id, sink));
            state.last_request = Some(request.clone());
            id
        };

        let weak: Weak<Mutex<ManualState>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut state = lock_recovering(&inner);
                if matches!(state.sink, Some((current, _)) if current == id) {
                    state.sink = None;
                }
            }
        }))
    }
}

pub(crate) fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
