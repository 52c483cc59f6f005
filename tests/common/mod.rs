// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use trek_tracker::config::Config;
use trek_tracker::db::TrackingDb;
use trek_tracker::middleware::auth::{create_jwt, Role};
use trek_tracker::models::{RosterParticipant, TripRoster};
use trek_tracker::routes::create_router;
use trek_tracker::services::{NotificationService, RosterService, TrackingService};
use trek_tracker::AppState;

pub const TRIP_ID: &str = "trip-alpine-01";
pub const ORGANIZER: &str = "org-1";
pub const PARTICIPANTS: [(&str, &str); 3] = [("u1", "Ana"), ("u2", "Ben"), ("u3", "Caro")];

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> TrackingDb {
    TrackingDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Roster for [`TRIP_ID`] with three participants.
#[allow(dead_code)]
pub fn test_roster(trip_id: &str) -> TripRoster {
    TripRoster {
        trip_id: trip_id.to_string(),
        organizer_id: ORGANIZER.to_string(),
        participants: PARTICIPANTS
            .iter()
            .map(|(id, name)| RosterParticipant {
                user_id: id.to_string(),
                user_name: name.to_string(),
            })
            .collect(),
    }
}

/// Tracking service over the given store, with a static roster for
/// [`TRIP_ID`] and a recording notifier.
#[allow(dead_code)]
pub fn test_service(db: TrackingDb) -> TrackingService {
    let rosters = RosterService::new_static();
    rosters.insert(test_roster(TRIP_ID));
    TrackingService::new(db, rosters, NotificationService::new_recording())
}

/// Create a test app with offline in-memory dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let tracking = test_service(TrackingDb::new_in_memory());

    let state = Arc::new(AppState { config, tracking });

    (create_router(state.clone()), state)
}

/// Signed session token for `user_id` with `role`.
#[allow(dead_code)]
pub fn token(state: &AppState, user_id: &str, role: Role) -> String {
    create_jwt(user_id, role, &state.config.jwt_signing_key).unwrap()
}

/// Send a request and decode the JSON response body (`Value::Null` if empty).
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Path under the tracking API for [`TRIP_ID`].
#[allow(dead_code)]
pub fn trip_path(suffix: &str) -> String {
    if suffix.is_empty() {
        format!("/api/tracking/trips/{}", TRIP_ID)
    } else {
        format!("/api/tracking/trips/{}/{}", TRIP_ID, suffix)
    }
}
