// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Tokens are accepted from the header or the session cookie
//! 3. Role gates apply before any trip data is touched
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use tower::ServiceExt;
use trek_tracker::middleware::auth::{create_jwt, Role, AUTH_COOKIE};

mod common;
use common::{create_test_app, send, token, trip_path, ORGANIZER};

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();
    let (status, _) = send(&app, Method::GET, &trip_path(""), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/tracking/my-active-trips",
        Some("not.a.jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_wrong_key_rejected() {
    let (app, _) = create_test_app();
    let forged = create_jwt(ORGANIZER, Role::Organizer, b"some_other_key_that_is_long_enough").unwrap();
    let (status, _) = send(
        &app,
        Method::GET,
        "/api/tracking/my-active-trips",
        Some(&forged),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let (app, state) = create_test_app();
    let jwt = token(&state, ORGANIZER, Role::Organizer);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tracking/my-active-trips")
                .header(header::COOKIE, format!("{}={}", AUTH_COOKIE, jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
}

#[tokio::test]
async fn test_participant_role_cannot_use_organizer_routes() {
    let (app, state) = create_test_app();
    let jwt = token(&state, "u1", Role::Participant);

    let (status, body) = send(&app, Method::POST, &trip_path("initialize"), Some(&jwt), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/tracking/my-active-trips",
        Some(&jwt),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_trip_id_rejected() {
    let (app, state) = create_test_app();
    let jwt = token(&state, ORGANIZER, Role::Organizer);

    let long_id = "x".repeat(200);
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/tracking/trips/{}/initialize", long_id),
        Some(&jwt),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/tracking/my-active-trips")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}
