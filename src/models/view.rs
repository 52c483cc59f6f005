// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role-based read views of a tracking aggregate.
//!
//! Organizers see everything. Participants see their own full entry and only
//! name, status and check-in time for everyone else.

use crate::error::AppError;
use crate::models::{
    EmergencyAlert, LocationPoint, ParticipantStatus, ParticipantTracking, TrackingStatus,
    TripTracking,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Who is looking at the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer<'a> {
    Organizer,
    Participant(&'a str),
}

impl<'a> Viewer<'a> {
    /// Classify a requester against a trip.
    pub fn resolve(tracking: &TripTracking, user_id: &'a str) -> Result<Self, AppError> {
        if tracking.is_organizer(user_id) {
            Ok(Viewer::Organizer)
        } else if tracking.is_participant(user_id) {
            Ok(Viewer::Participant(user_id))
        } else {
            Err(AppError::Forbidden(
                "Not authorized to view this trip tracking".to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ParticipantView {
    pub user_id: String,
    pub user_name: String,
    pub status: ParticipantStatus,
    pub last_check_in: Option<DateTime<Utc>>,
    /// Location detail, flattened into the entry when visible
    #[serde(flatten)]
    // TODO: export as optional fields once generated types can express a flattened Option
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub detail: Option<ParticipantDetail>,
}

/// Location detail, present only for entries the viewer may see.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ParticipantDetail {
    pub last_location: Option<LocationPoint>,
    pub start_location: Option<LocationPoint>,
    pub end_location: Option<LocationPoint>,
    pub location_history: Vec<LocationPoint>,
    pub distance_meters: f64,
    pub emergency_contacts_notified: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrackingView {
    pub trip_id: String,
    pub organizer_id: String,
    pub status: TrackingStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub participants: Vec<ParticipantView>,
    pub emergency_alerts: Vec<EmergencyAlert>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingView {
    pub fn project(tracking: &TripTracking, viewer: Viewer<'_>) -> Self {
        let participants = tracking
            .participants
            .values()
            .map(|p| {
                let full = match viewer {
                    Viewer::Organizer => true,
                    Viewer::Participant(me) => p.user_id == me,
                };
                ParticipantView::from_tracking(p, full)
            })
            .collect();

        // Alert locations are coordinates too.
        let emergency_alerts = tracking
            .emergency_alerts
            .iter()
            .map(|alert| match viewer {
                Viewer::Participant(me) if alert.user_id != me => EmergencyAlert {
                    location: None,
                    ..alert.clone()
                },
                _ => alert.clone(),
            })
            .collect();

        Self {
            trip_id: tracking.trip_id.clone(),
            organizer_id: tracking.organizer_id.clone(),
            status: tracking.status,
            started_at: tracking.started_at,
            completed_at: tracking.completed_at,
            participants,
            emergency_alerts,
            updated_at: tracking.updated_at,
        }
    }

    /// Full organizer view.
    pub fn full(tracking: &TripTracking) -> Self {
        Self::project(tracking, Viewer::Organizer)
    }
}

impl ParticipantView {
    fn from_tracking(p: &ParticipantTracking, full: bool) -> Self {
        let detail = full.then(|| ParticipantDetail {
            last_location: p.last_location,
            start_location: p.start_location,
            end_location: p.end_location,
            location_history: p.location_history.iter().copied().collect(),
            distance_meters: p.distance_meters,
            emergency_contacts_notified: p.emergency_contacts_notified,
        });

        Self {
            user_id: p.user_id.clone(),
            user_name: p.user_name.clone(),
            status: p.status,
            last_check_in: p.last_check_in,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T06:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn tracked_trip() -> TripTracking {
        let mut trip = TripTracking::new("trip-1", "org-1", [("a", "Asha"), ("b", "Bilal")], t0());
        trip.start(t0()).unwrap();
        for id in ["a", "b"] {
            let point = LocationPoint {
                latitude: 30.0,
                longitude: 79.0,
                altitude: Some(3000.0),
                accuracy: None,
                timestamp: t0(),
            };
            trip.record_location(id, point, t0()).unwrap();
        }
        trip
    }

    #[test]
    fn test_organizer_sees_all_detail() {
        let trip = tracked_trip();
        let view = TrackingView::project(&trip, Viewer::resolve(&trip, "org-1").unwrap());
        assert!(view.participants.iter().all(|p| p.detail.is_some()));
    }

    #[test]
    fn test_participant_sees_only_own_detail() {
        let trip = tracked_trip();
        let view = TrackingView::project(&trip, Viewer::resolve(&trip, "a").unwrap());

        let own = view.participants.iter().find(|p| p.user_id == "a").unwrap();
        let other = view.participants.iter().find(|p| p.user_id == "b").unwrap();

        assert!(own.detail.is_some());
        assert!(other.detail.is_none());
        assert_eq!(other.status, ParticipantStatus::Active);
        assert_eq!(other.last_check_in, Some(t0()));
    }

    #[test]
    fn test_redacted_entry_serializes_without_coordinates() {
        let trip = tracked_trip();
        let view = TrackingView::project(&trip, Viewer::Participant("a"));
        let json = serde_json::to_value(&view).unwrap();

        let own = &json["participants"][0];
        assert_eq!(own["userId"], "a");
        assert_eq!(own["lastLocation"]["latitude"], 30.0);

        let other = &json["participants"][1];
        assert_eq!(other["userId"], "b");
        assert_eq!(other["status"], "active");
        assert!(other.get("lastLocation").is_none());
        assert!(other.get("locationHistory").is_none());
        assert!(!other.to_string().contains("latitude"));
    }

    #[test]
    fn test_participant_view_strips_other_alert_locations() {
        let mut trip = tracked_trip();
        let sos_point = trip.participant("b").unwrap().last_location;
        trip.raise_sos("b", sos_point, t0()).unwrap();

        let as_a = TrackingView::project(&trip, Viewer::Participant("a"));
        assert!(as_a.emergency_alerts[0].location.is_none());

        let as_b = TrackingView::project(&trip, Viewer::Participant("b"));
        assert!(as_b.emergency_alerts[0].location.is_some());

        let as_organizer = TrackingView::full(&trip);
        assert!(as_organizer.emergency_alerts[0].location.is_some());
    }

    #[test]
    fn test_outsider_is_forbidden() {
        let trip = tracked_trip();
        let err = Viewer::resolve(&trip, "stranger").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
