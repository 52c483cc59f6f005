// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip tracking API routes.
//!
//! The auth middleware is applied in routes/mod.rs for these routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    EmergencyAlert, LocationPoint, LocationUpdate, TrackingStatus, TrackingView, TripTracking,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_TRIP_ID_LEN: usize = 128;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tracking/my-active-trips", get(my_active_trips))
        .route("/api/tracking/trips/{trip_id}", get(get_tracking))
        .route("/api/tracking/trips/{trip_id}/initialize", post(initialize))
        .route("/api/tracking/trips/{trip_id}/start", post(start))
        .route("/api/tracking/trips/{trip_id}/pause", post(pause))
        .route("/api/tracking/trips/{trip_id}/resume", post(resume))
        .route(
            "/api/tracking/trips/{trip_id}/clear-emergency",
            post(clear_emergency),
        )
        .route("/api/tracking/trips/{trip_id}/close", post(close))
        .route("/api/tracking/trips/{trip_id}/location", post(update_location))
        .route("/api/tracking/trips/{trip_id}/complete", post(complete))
        .route("/api/tracking/trips/{trip_id}/sos", post(sos))
        .route("/api/tracking/trips/{trip_id}/alerts", get(list_alerts))
        .route(
            "/api/tracking/trips/{trip_id}/alerts/resolve",
            post(resolve_alert),
        )
}

/// Trip ids come from the booking service; reject anything that could not
/// be one before it reaches a document path or upstream URL.
fn validate_trip_id(trip_id: &str) -> Result<()> {
    if trip_id.is_empty() || trip_id.len() > MAX_TRIP_ID_LEN {
        return Err(AppError::Validation("Invalid trip id".to_string()));
    }
    if !trip_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation("Invalid trip id".to_string()));
    }
    Ok(())
}

/// Parse a body that may be absent. Missing or malformed input is treated
/// as "no location".
fn optional_location(body: &Bytes) -> Option<LocationUpdate> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(update) => Some(update),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable location body");
            None
        }
    }
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackingResponse {
    pub tracking: TrackingView,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackingActionResponse {
    pub tracking: TrackingView,
    pub message: String,
}

impl TrackingActionResponse {
    fn new(tracking: &TripTracking, message: &str) -> Self {
        Self {
            tracking: TrackingView::full(tracking),
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActiveTripsResponse {
    pub trackings: Vec<TrackingView>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationResponse {
    pub message: String,
    pub location: LocationPoint,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CompleteResponse {
    pub message: String,
    pub status: TrackingStatus,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AlertResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub alert: EmergencyAlert,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AlertsResponse {
    pub alerts: Vec<EmergencyAlert>,
}

// ─── Organizer ───────────────────────────────────────────────

async fn initialize(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<(StatusCode, Json<TrackingResponse>)> {
    validate_trip_id(&trip_id)?;
    let result = state.tracking.initialize(&user, &trip_id).await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(TrackingResponse {
            tracking: TrackingView::full(&result.tracking),
        }),
    ))
}

async fn start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TrackingActionResponse>> {
    validate_trip_id(&trip_id)?;
    let tracking = state.tracking.start(&user, &trip_id).await?;
    Ok(Json(TrackingActionResponse::new(&tracking, "Trip tracking started")))
}

async fn pause(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TrackingActionResponse>> {
    validate_trip_id(&trip_id)?;
    let tracking = state.tracking.pause(&user, &trip_id).await?;
    Ok(Json(TrackingActionResponse::new(&tracking, "Trip tracking paused")))
}

async fn resume(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TrackingActionResponse>> {
    validate_trip_id(&trip_id)?;
    let tracking = state.tracking.resume(&user, &trip_id).await?;
    Ok(Json(TrackingActionResponse::new(&tracking, "Trip tracking resumed")))
}

async fn clear_emergency(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TrackingActionResponse>> {
    validate_trip_id(&trip_id)?;
    let tracking = state.tracking.clear_emergency(&user, &trip_id).await?;
    Ok(Json(TrackingActionResponse::new(&tracking, "Emergency cleared")))
}

async fn close(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TrackingActionResponse>> {
    validate_trip_id(&trip_id)?;
    let tracking = state.tracking.close(&user, &trip_id).await?;
    Ok(Json(TrackingActionResponse::new(&tracking, "Trip tracking closed")))
}

async fn my_active_trips(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ActiveTripsResponse>> {
    let trackings = state.tracking.active_trips(&user).await?;
    Ok(Json(ActiveTripsResponse { trackings }))
}

// ─── Participant ─────────────────────────────────────────────

async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    payload: std::result::Result<Json<LocationUpdate>, JsonRejection>,
) -> Result<Json<LocationResponse>> {
    validate_trip_id(&trip_id)?;
    let Json(update) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let location = state
        .tracking
        .record_location(&user, &trip_id, update)
        .await?;
    Ok(Json(LocationResponse {
        message: "Location updated successfully".to_string(),
        location,
    }))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    body: Bytes,
) -> Result<Json<CompleteResponse>> {
    validate_trip_id(&trip_id)?;
    let status = state
        .tracking
        .complete(&user, &trip_id, optional_location(&body))
        .await?;
    Ok(Json(CompleteResponse {
        message: "Trip marked as completed".to_string(),
        status,
    }))
}

async fn sos(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    body: Bytes,
) -> Result<Json<AlertResponse>> {
    validate_trip_id(&trip_id)?;
    let alert = state
        .tracking
        .raise_sos(&user, &trip_id, optional_location(&body))
        .await?;
    Ok(Json(AlertResponse {
        message: Some("Emergency alert sent".to_string()),
        alert,
    }))
}

// ─── Views & Alerts ──────────────────────────────────────────

async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<TrackingResponse>> {
    validate_trip_id(&trip_id)?;
    let tracking = state.tracking.get_view(&user, &trip_id).await?;
    Ok(Json(TrackingResponse { tracking }))
}

#[derive(Deserialize)]
struct AlertsQuery {
    #[serde(default)]
    unresolved: bool,
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>> {
    validate_trip_id(&trip_id)?;
    let alerts = state
        .tracking
        .list_alerts(&user, &trip_id, query.unresolved)
        .await?;
    Ok(Json(AlertsResponse { alerts }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveAlertRequest {
    user_id: String,
    timestamp: DateTime<Utc>,
}

async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    payload: std::result::Result<Json<ResolveAlertRequest>, JsonRejection>,
) -> Result<Json<AlertResponse>> {
    validate_trip_id(&trip_id)?;
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let alert = state
        .tracking
        .resolve_alert(&user, &trip_id, &request.user_id, request.timestamp)
        .await?;
    Ok(Json(AlertResponse {
        message: None,
        alert,
    }))
}
