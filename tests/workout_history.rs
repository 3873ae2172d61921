// End-to-end: profile on disk feeds the controller, fixes arrive through the
// push provider, and the finished workout lands in the SQLite history.

use std::{sync::Arc, thread, time::Duration};

use fitsync_lib::{
    Database, ManualLocationProvider, PositionSample, ProfileStore, ProviderError, WorkoutConfig,
    WorkoutController, WorkoutState,
};

// ~1.11m of longitude at the equator.
const STEP: f64 = 0.00001;

#[tokio::test]
async fn finished_workout_is_archived_with_profile_weight() {
    fitsync_lib::init_logging();
    let dir = tempfile::tempdir().unwrap();

    let profiles = ProfileStore::new(dir.path().join("profile.json")).unwrap();
    profiles.set_weight(90.0).unwrap();
    let db = Database::new(dir.path().join("history.sqlite3")).unwrap();

    let provider = ManualLocationProvider::new();
    let controller = WorkoutController::new(
        WorkoutConfig::with_profile(profiles.profile()),
        Arc::new(provider.clone()),
    )
    .with_database(db.clone());

    controller.start().await.unwrap();
    assert_eq!(controller.snapshot().weight_kg, 90.0);

    // A walk east at ~1.1 m/s with one noisy fix in the middle.
    provider.push(PositionSample::new(0.0, 0.0, 6.0, 0));
    provider.push(PositionSample::new(0.0, STEP * 2.0, 6.0, 2_000));
    provider.push(PositionSample::new(0.0, STEP * 40.0, 35.0, 3_000));
    provider.push(PositionSample::new(0.0, STEP * 4.0, 6.0, 4_000));

    let session = controller.stop().await.unwrap();
    assert_eq!(controller.state(), WorkoutState::Idle);
    assert_eq!(session.route_points.len(), 3);
    assert!((session.distance_meters - 4.45).abs() < 0.02);

    let stored = db.get_workout(&session.id).await.unwrap().unwrap();
    assert_eq!(stored.id, session.id);
    assert_eq!(stored.route_points, session.route_points);
    assert_eq!(stored.duration_millis, session.duration_millis);

    let history = db.list_workouts(10, 0).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn cancelled_workout_is_not_archived() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
    let provider = ManualLocationProvider::new();
    let controller = WorkoutController::new(WorkoutConfig::default(), Arc::new(provider.clone()))
        .with_database(db.clone());

    controller.start().await.unwrap();
    provider.push(PositionSample::new(0.0, 0.0, 6.0, 0));
    controller.cancel().await;

    assert_eq!(db.workout_totals().await.unwrap().workout_count, 0);
    assert!(controller.stop().await.is_err());
}

#[tokio::test]
async fn provider_failure_on_its_own_thread_still_archives() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
    let provider = ManualLocationProvider::new();
    let controller = WorkoutController::new(WorkoutConfig::default(), Arc::new(provider.clone()))
        .with_database(db.clone());
    let last = controller.channels().last_session();

    controller.start().await.unwrap();
    provider.push(PositionSample::new(0.0, 0.0, 6.0, 0));

    // Platform callbacks arrive on a thread with no tokio runtime.
    let failing = provider.clone();
    thread::spawn(move || failing.fail(ProviderError::Unavailable("gps lost".into())))
        .join()
        .unwrap();
    assert_eq!(controller.state(), WorkoutState::Idle);
    let session_id = last.borrow().as_ref().map(|s| s.id.clone()).unwrap();

    let mut stored = None;
    for _ in 0..100 {
        stored = db.get_workout(&session_id).await.unwrap();
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stored.is_some());
    assert_eq!(db.workout_totals().await.unwrap().workout_count, 1);
}

#[tokio::test]
async fn denied_permission_reports_tracking_unavailable() {
    let provider = ManualLocationProvider::new();
    provider.set_permission_granted(false);
    let controller = WorkoutController::new(WorkoutConfig::default(), Arc::new(provider));

    let err = controller.start().await.unwrap_err();
    assert!(err.is_tracking_unavailable());
    assert_eq!(controller.state(), WorkoutState::Idle);
}
