// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrent writers against one trip must not lose updates.
//!
//! Every participant streams locations while one raises an SOS and another
//! finishes. If any write were applied to a stale copy of the aggregate, a
//! location, the completion, or the alert would disappear.

use trek_tracker::db::TrackingDb;
use trek_tracker::middleware::auth::{AuthUser, Role};
use trek_tracker::models::{LocationUpdate, ParticipantStatus, TrackingStatus};
use trek_tracker::services::TrackingService;

mod common;
use common::{test_service, ORGANIZER, TRIP_ID};

const UPDATES_PER_PARTICIPANT: usize = 20;

async fn run_concurrent_scenario(svc: TrackingService, trip_id: &str) {
    let organizer = AuthUser::new(ORGANIZER, Role::Organizer);
    svc.initialize(&organizer, trip_id).await.unwrap();
    svc.start(&organizer, trip_id).await.unwrap();

    let mut handles = vec![];

    for user in ["u1", "u2", "u3"] {
        let svc = svc.clone();
        let trip_id = trip_id.to_string();
        handles.push(tokio::spawn(async move {
            let caller = AuthUser::new(user, Role::Participant);
            for i in 0..UPDATES_PER_PARTICIPANT {
                let update = LocationUpdate::new(46.0 + i as f64 * 0.0001, 8.0);
                svc.record_location(&caller, &trip_id, update)
                    .await
                    .expect("location update failed");
            }
        }));
    }

    {
        let svc = svc.clone();
        let trip_id = trip_id.to_string();
        handles.push(tokio::spawn(async move {
            let caller = AuthUser::new("u2", Role::Participant);
            svc.raise_sos(&caller, &trip_id, None)
                .await
                .expect("SOS failed");
        }));
    }

    {
        let svc = svc.clone();
        let trip_id = trip_id.to_string();
        handles.push(tokio::spawn(async move {
            let caller = AuthUser::new("u3", Role::Participant);
            svc.complete(&caller, &trip_id, None)
                .await
                .expect("completion failed");
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let tracking = svc.db().get_tracking(trip_id).await.unwrap().unwrap();

    assert_eq!(tracking.status, TrackingStatus::Emergency);
    assert_eq!(tracking.emergency_alerts.len(), 1);
    assert_eq!(tracking.emergency_alerts[0].user_id, "u2");
    assert_eq!(
        tracking.participant("u2").unwrap().status,
        ParticipantStatus::Emergency
    );

    for user in ["u1", "u2", "u3"] {
        let p = tracking.participant(user).unwrap();
        assert_eq!(p.location_history.len(), UPDATES_PER_PARTICIPANT, "{}", user);
        // One participant's samples are applied in submission order
        let lats: Vec<f64> = p.location_history.iter().map(|l| l.latitude).collect();
        assert!(lats.windows(2).all(|w| w[0] < w[1]), "{}", user);
    }

    // Completion may land before or after u3's locations; later samples
    // never change a completed status.
    assert_eq!(
        tracking.participant("u3").unwrap().status,
        ParticipantStatus::Completed
    );

    // initialize + start + 3 * N locations + SOS + completion
    let expected_writes = 1 + (3 * UPDATES_PER_PARTICIPANT as u64) + 2;
    assert_eq!(tracking.version, expected_writes);
}

#[tokio::test]
async fn test_concurrent_updates_in_memory() {
    run_concurrent_scenario(test_service(TrackingDb::new_in_memory()), TRIP_ID).await;
}

#[tokio::test]
async fn test_concurrent_updates_firestore() {
    if std::env::var("FIRESTORE_EMULATOR_HOST").is_err() {
        println!("Skipping test because FIRESTORE_EMULATOR_HOST is not set");
        return;
    }

    let db = common::test_db().await;
    let trip_id = format!("concurrent-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));

    let svc = test_service(db);
    svc.rosters().insert(common::test_roster(&trip_id));
    run_concurrent_scenario(svc, &trip_id).await;
}
