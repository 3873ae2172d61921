use std::{
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    db::Database,
    log_error, log_info, log_warn,
    models::{PositionSample, RoutePoint, WorkoutSession, WorkoutState},
    tracking::{
        provider::lock_recovering, ActiveClock, LocationProvider, MovementFilter, ProviderError,
        SampleSink, Subscription,
    },
};

use super::{
    channels::WorkoutChannels,
    metrics::{average_pace_kmh, calories_kcal},
    TrackingError, WorkoutConfig,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSnapshot {
    pub state: WorkoutState,
    pub session_id: Option<String>,
    pub duration_ms: u64,
    pub distance_meters: f64,
    pub calories_kcal: f64,
    pub pace_kmh: f64,
    pub route_point_count: usize,
    pub current_position: Option<RoutePoint>,
    pub weight_kg: f64,
}

struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct TrackerState {
    status: WorkoutState,
    /// Bumped per workout so late fixes from an earlier subscription are dropped.
    epoch: u64,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    filter: MovementFilter,
    clock: ActiveClock,
    weight_kg: f64,
    /// Last fix seen while in a session, accurate or not.
    current_position: Option<RoutePoint>,
    subscription: Option<Subscription>,
    ticker: Option<Ticker>,
}

impl TrackerState {
    fn duration_ms(&self, now: Instant) -> u64 {
        self.clock.active_ms(now)
    }

    fn derived(&self, duration_ms: u64) -> (f64, f64) {
        let distance = self.filter.current_distance();
        (
            calories_kcal(self.weight_kg, distance, duration_ms),
            average_pace_kmh(distance, duration_ms),
        )
    }

    /// Cancels the ticker while the state lock is held, so no tick can mutate
    /// anything once the caller releases it. The handle is returned for joining.
    fn stop_ticker(&mut self) -> Option<JoinHandle<()>> {
        self.ticker.take().map(|ticker| {
            ticker.token.cancel();
            ticker.handle
        })
    }

    /// The returned subscription must be dropped after the lock is released:
    /// a provider may block in unsubscribe until its in-flight callback returns.
    #[must_use]
    fn clear_session(&mut self) -> Option<Subscription> {
        self.filter.reset();
        self.clock.reset();
        self.session_id = None;
        self.started_at = None;
        self.current_position = None;
        self.status = WorkoutState::Idle;
        self.subscription.take()
    }
}

impl Drop for TrackerState {
    fn drop(&mut self) {
        if let Some(ticker) = &self.ticker {
            ticker.token.cancel();
        }
    }
}

/// Owns the workout state machine.
///
/// Idle → Active on [`start`](Self::start); Active ⇄ Paused via
/// [`pause`](Self::pause)/[`resume`](Self::resume); Active or Paused → Stopped on
/// [`stop`](Self::stop), which archives the session and lands back in Idle.
#[derive(Clone)]
pub struct WorkoutController {
    state: Arc<Mutex<TrackerState>>,
    channels: Arc<WorkoutChannels>,
    provider: Arc<dyn LocationProvider>,
    config: Arc<WorkoutConfig>,
    db: Option<Database>,
}

impl WorkoutController {
    pub fn new(config: WorkoutConfig, provider: Arc<dyn LocationProvider>) -> Self {
        let state = TrackerState {
            status: WorkoutState::Idle,
            epoch: 0,
            session_id: None,
            started_at: None,
            filter: MovementFilter::new(config.filter.clone()),
            clock: ActiveClock::new(),
            weight_kg: config.profile.weight_kg,
            current_position: None,
            subscription: None,
            ticker: None,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            channels: Arc::new(WorkoutChannels::new()),
            provider,
            config: Arc::new(config),
            db: None,
        }
    }

    /// Completed workouts are written to this history store.
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn channels(&self) -> &WorkoutChannels {
        &self.channels
    }

    pub fn config(&self) -> &WorkoutConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        lock_recovering(&self.state)
    }

    pub fn state(&self) -> WorkoutState {
        self.lock().status
    }

    pub fn snapshot(&self) -> WorkoutSnapshot {
        let guard = self.lock();
        snapshot_of(&guard, Instant::now())
    }

    pub async fn start(&self) -> Result<WorkoutSnapshot, TrackingError> {
        let epoch = {
            let mut guard = self.lock();
            if guard.status != WorkoutState::Idle {
                return Err(TrackingError::InvalidTransition {
                    from: guard.status,
                    action: "start",
                });
            }
            guard.epoch += 1;
            guard.epoch
        };

        // Subscribing happens outside the lock: a provider may deliver its
        // first fix synchronously from inside `subscribe`.
        let subscription = match self.subscribe(epoch, Handle::current()) {
            Ok(subscription) => subscription,
            Err(err) => {
                log_warn!("Cannot start workout: {err}");
                self.channels.publish_state(WorkoutState::Idle);
                return Err(err.into());
            }
        };

        let snapshot = {
            let mut guard = self.lock();
            if guard.status != WorkoutState::Idle || guard.epoch != epoch {
                return Err(TrackingError::InvalidTransition {
                    from: guard.status,
                    action: "start",
                });
            }

            let now = Instant::now();
            let session_id = Uuid::new_v4().to_string();
            guard.filter.reset();
            guard.clock.start(now);
            guard.session_id = Some(session_id.clone());
            guard.started_at = Some(Utc::now());
            guard.current_position = None;
            guard.subscription = Some(subscription);
            guard.status = WorkoutState::Active;
            guard.ticker = Some(self.spawn_ticker());

            publish_all(&guard, &self.channels, now);
            log_info!("Workout {session_id} started");
            snapshot_of(&guard, now)
        };

        Ok(snapshot)
    }

    pub async fn pause(&self) -> Result<WorkoutSnapshot, TrackingError> {
        let (snapshot, handle, subscription) = {
            let mut guard = self.lock();
            if guard.status != WorkoutState::Active {
                return Err(TrackingError::InvalidTransition {
                    from: guard.status,
                    action: "pause",
                });
            }

            let now = Instant::now();
            guard.clock.freeze(now);
            let handle = guard.stop_ticker();
            let subscription = guard.subscription.take();
            guard.status = WorkoutState::Paused;

            publish_metrics(&guard, &self.channels, now);
            self.channels.publish_state(WorkoutState::Paused);
            log_info!("Workout paused at {}ms", guard.duration_ms(now));
            (snapshot_of(&guard, now), handle, subscription)
        };

        drop(subscription);
        join_ticker(handle).await;
        Ok(snapshot)
    }

    pub async fn resume(&self) -> Result<WorkoutSnapshot, TrackingError> {
        let epoch = {
            let guard = self.lock();
            if guard.status != WorkoutState::Paused {
                return Err(TrackingError::InvalidTransition {
                    from: guard.status,
                    action: "resume",
                });
            }
            guard.epoch
        };

        let subscription = self.subscribe(epoch, Handle::current()).map_err(|err| {
            log_warn!("Cannot resume workout: {err}");
            TrackingError::from(err)
        })?;

        let mut guard = self.lock();
        if guard.status != WorkoutState::Paused || guard.epoch != epoch {
            return Err(TrackingError::InvalidTransition {
                from: guard.status,
                action: "resume",
            });
        }

        let now = Instant::now();
        guard.clock.resume(now);
        guard.subscription = Some(subscription);
        guard.status = WorkoutState::Active;
        guard.ticker = Some(self.spawn_ticker());

        self.channels.publish_state(WorkoutState::Active);
        log_info!("Workout resumed at {}ms", guard.duration_ms(now));
        Ok(snapshot_of(&guard, now))
    }

    /// Finalises the workout, archives it and returns to Idle.
    pub async fn stop(&self) -> Result<WorkoutSession, TrackingError> {
        let Finished {
            session,
            ticker,
            subscription,
        } = {
            let mut guard = self.lock();
            if !guard.status.in_session() {
                return Err(TrackingError::InvalidTransition {
                    from: guard.status,
                    action: "stop",
                });
            }
            finish_session(&mut guard, &self.channels, Instant::now())
        };

        drop(subscription);
        join_ticker(ticker).await;

        if let Some(db) = &self.db {
            if let Err(err) = db.insert_workout(&session).await {
                log_error!("Failed to archive workout {}: {err:?}", session.id);
            }
        }

        Ok(session)
    }

    /// Drops an in-progress workout without archiving it.
    pub async fn cancel(&self) {
        let (handle, subscription) = {
            let mut guard = self.lock();
            if guard.status == WorkoutState::Idle {
                return;
            }
            let handle = guard.stop_ticker();
            let session_id = guard.session_id.clone().unwrap_or_default();
            let subscription = guard.clear_session();
            publish_all(&guard, &self.channels, Instant::now());
            log_info!("Workout {session_id} discarded");
            (handle, subscription)
        };

        drop(subscription);
        join_ticker(handle).await;
    }

    /// Recomputes calories for the running workout. The weight must be a
    /// positive number of kilograms.
    pub fn update_weight(&self, weight_kg: f64) -> Result<(), TrackingError> {
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(TrackingError::InvalidWeight(weight_kg));
        }
        let mut guard = self.lock();
        guard.weight_kg = weight_kg;
        publish_metrics(&guard, &self.channels, Instant::now());
        Ok(())
    }

    fn subscribe(&self, epoch: u64, runtime: Handle) -> Result<Subscription, ProviderError> {
        let sink = Arc::new(ControllerSink {
            state: Arc::downgrade(&self.state),
            channels: Arc::clone(&self.channels),
            db: self.db.clone(),
            runtime,
            epoch,
        });
        self.provider
            .subscribe(&self.config.location_request, sink)
    }

    fn spawn_ticker(&self) -> Ticker {
        let token = CancellationToken::new();
        let handle = tokio::spawn(duration_ticker(
            Arc::downgrade(&self.state),
            Arc::clone(&self.channels),
            token.clone(),
            self.config.tick_interval,
        ));
        Ticker { token, handle }
    }
}

/// Provider-facing side of the controller. Holds only a weak reference so a
/// provider that forgets to unsubscribe cannot keep the tracker alive.
struct ControllerSink {
    state: Weak<Mutex<TrackerState>>,
    channels: Arc<WorkoutChannels>,
    db: Option<Database>,
    /// Runtime the workout was started on. Provider threads have none of their own.
    runtime: Handle,
    epoch: u64,
}

impl SampleSink for ControllerSink {
    fn on_sample(&self, sample: PositionSample) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut guard = lock_recovering(&state);
        if guard.epoch != self.epoch || !guard.status.in_session() {
            return;
        }

        let position = sample.route_point();
        guard.current_position = Some(position);
        self.channels.publish_position(Some(position));

        // Fixes still in flight after a pause never reach the filter.
        if guard.status != WorkoutState::Active {
            return;
        }

        if guard.filter.on_sample(sample).changed_route() {
            let now = Instant::now();
            self.channels.publish_route(guard.filter.current_route_points());
            publish_metrics(&guard, &self.channels, now);
        }
    }

    fn on_provider_error(&self, err: ProviderError) {
        log_error!("Location provider failed during workout: {err}");

        let Some(state) = self.state.upgrade() else {
            return;
        };
        // The ticker exits on its own once cancelled; nothing to join here.
        let Finished {
            session,
            subscription,
            ..
        } = {
            let mut guard = lock_recovering(&state);
            if guard.epoch != self.epoch || !guard.status.in_session() {
                return;
            }
            finish_session(&mut guard, &self.channels, Instant::now())
        };
        drop(subscription);

        if let Some(db) = self.db.clone() {
            self.runtime.spawn(async move {
                if let Err(err) = db.insert_workout(&session).await {
                    log_error!("Failed to archive workout {}: {err:?}", session.id);
                }
            });
        }
    }
}

struct Finished {
    session: WorkoutSession,
    ticker: Option<JoinHandle<()>>,
    /// Dropped by the caller once the state lock is released.
    subscription: Option<Subscription>,
}

/// Freezes the clock, snapshots the accumulators and resets everything for
/// the next workout.
fn finish_session(state: &mut TrackerState, channels: &WorkoutChannels, now: Instant) -> Finished {
    state.clock.freeze(now);
    let ticker = state.stop_ticker();
    state.status = WorkoutState::Stopped;
    channels.publish_state(WorkoutState::Stopped);

    let duration_ms = state.duration_ms(now);
    let (calories, pace) = state.derived(duration_ms);
    let session = WorkoutSession {
        id: state
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        distance_meters: state.filter.current_distance(),
        duration_millis: duration_ms,
        calories_kcal: calories,
        route_points: state.filter.current_route_points().to_vec(),
        average_pace_kmh: pace,
        started_at: state.started_at.unwrap_or_else(Utc::now),
        timestamp: Utc::now(),
    };

    log_info!(
        "Workout {} finished: {:.1}m in {}ms, {:.0} kcal",
        session.id, session.distance_meters, session.duration_millis, session.calories_kcal
    );

    let subscription = state.clear_session();
    publish_all(state, channels, now);
    channels.publish_session(session.clone());

    Finished {
        session,
        ticker,
        subscription,
    }
}

fn snapshot_of(state: &TrackerState, now: Instant) -> WorkoutSnapshot {
    let duration_ms = state.duration_ms(now);
    let (calories, pace) = state.derived(duration_ms);
    WorkoutSnapshot {
        state: state.status,
        session_id: state.session_id.clone(),
        duration_ms,
        distance_meters: state.filter.current_distance(),
        calories_kcal: calories,
        pace_kmh: pace,
        route_point_count: state.filter.current_route_points().len(),
        current_position: state.current_position,
        weight_kg: state.weight_kg,
    }
}

fn publish_metrics(state: &TrackerState, channels: &WorkoutChannels, now: Instant) {
    let duration_ms = state.duration_ms(now);
    let (calories, pace) = state.derived(duration_ms);
    channels.publish_duration(duration_ms);
    channels.publish_distance(state.filter.current_distance());
    channels.publish_derived(calories, pace);
}

fn publish_all(state: &TrackerState, channels: &WorkoutChannels, now: Instant) {
    channels.publish_state(state.status);
    channels.publish_route(state.filter.current_route_points());
    if state.status == WorkoutState::Idle {
        channels.publish_position(None);
    }
    publish_metrics(state, channels, now);
}

async fn join_ticker(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if let Err(err) = handle.await {
            if !err.is_cancelled() {
                log_error!("Duration ticker task failed: {err}");
            }
        }
    }
}

async fn duration_ticker(
    state: Weak<Mutex<TrackerState>>,
    channels: Arc<WorkoutChannels>,
    token: CancellationToken,
    tick_interval: Duration,
) {
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if !refresh_duration(&state, &channels, &token) {
                    break;
                }
            }
        }
    }
}

/// One tick. Returns false once the ticker should exit.
fn refresh_duration(
    state: &Weak<Mutex<TrackerState>>,
    channels: &WorkoutChannels,
    token: &CancellationToken,
) -> bool {
    let Some(state) = state.upgrade() else {
        return false;
    };
    let guard = lock_recovering(&state);
    // Cancellation happens under this same lock, so checking here is final.
    if token.is_cancelled() || guard.status != WorkoutState::Active {
        return false;
    }
    publish_metrics(&guard, channels, Instant::now());
    true
}
