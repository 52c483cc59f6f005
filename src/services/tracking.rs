// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip tracking operations.
//!
//! Every mutation goes through [`TrackingDb::update_tracking`], so the
//! aggregate rules in [`crate::models`] run against the latest committed
//! document. Authorization is checked before anything is written, and
//! notifications are dispatched only after the write commits.

use crate::db::firestore::CreateOutcome;
use crate::db::TrackingDb;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::location::optional_point;
use crate::models::{
    EmergencyAlert, LocationPoint, LocationUpdate, ParticipantStatus, TrackingStatus,
    TrackingView, TripTracking, Viewer,
};
use crate::services::notification::{NotificationEvent, NotificationService};
use crate::services::roster::RosterService;
use chrono::{DateTime, Utc};

/// Result of [`TrackingService::initialize`].
#[derive(Debug)]
pub struct Initialized {
    pub tracking: TripTracking,
    /// False when tracking already existed and was returned unchanged.
    pub created: bool,
}

#[derive(Clone)]
pub struct TrackingService {
    db: TrackingDb,
    rosters: RosterService,
    notifier: NotificationService,
}

fn require_organizer_role(caller: &AuthUser) -> Result<(), AppError> {
    if caller.role.can_organize() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Organizer or admin role required".to_string(),
        ))
    }
}

fn require_trip_organizer(tracking: &TripTracking, caller: &AuthUser) -> Result<(), AppError> {
    if tracking.is_organizer(&caller.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the trip organizer can manage this trip".to_string(),
        ))
    }
}

/// Organizer of the trip, or on-call staff.
fn require_responder(tracking: &TripTracking, caller: &AuthUser) -> Result<(), AppError> {
    if caller.role.is_staff() || tracking.is_organizer(&caller.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to manage alerts for this trip".to_string(),
        ))
    }
}

impl TrackingService {
    pub fn new(db: TrackingDb, rosters: RosterService, notifier: NotificationService) -> Self {
        Self {
            db,
            rosters,
            notifier,
        }
    }

    pub fn db(&self) -> &TrackingDb {
        &self.db
    }

    pub fn rosters(&self) -> &RosterService {
        &self.rosters
    }

    pub fn notifier(&self) -> &NotificationService {
        &self.notifier
    }

    async fn load(&self, trip_id: &str) -> Result<TripTracking, AppError> {
        self.db
            .get_tracking(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trip tracking {} not found", trip_id)))
    }

    // ─── Organizer Operations ────────────────────────────────────

    /// Create the tracking aggregate for a trip from its booking roster.
    ///
    /// Idempotent: if tracking already exists it is returned unchanged.
    pub async fn initialize(
        &self,
        caller: &AuthUser,
        trip_id: &str,
    ) -> Result<Initialized, AppError> {
        require_organizer_role(caller)?;

        if let Some(existing) = self.db.get_tracking(trip_id).await? {
            require_trip_organizer(&existing, caller)?;
            return Ok(Initialized {
                tracking: existing,
                created: false,
            });
        }

        let roster = self.rosters.get_participant_roster(trip_id).await?;
        if roster.organizer_id != caller.user_id {
            return Err(AppError::Forbidden(
                "Not authorized to initialize tracking for this trip".to_string(),
            ));
        }

        let tracking = TripTracking::new(trip_id, &roster.organizer_id, roster.members(), Utc::now());

        match self.db.create_tracking(&tracking).await? {
            CreateOutcome::Created(tracking) => {
                tracing::info!(
                    trip_id,
                    participants = tracking.participants.len(),
                    "Trip tracking initialized"
                );
                Ok(Initialized {
                    tracking,
                    created: true,
                })
            }
            CreateOutcome::Existing(existing) => Ok(Initialized {
                tracking: existing,
                created: false,
            }),
        }
    }

    pub async fn start(&self, caller: &AuthUser, trip_id: &str) -> Result<TripTracking, AppError> {
        require_organizer_role(caller)?;
        let now = Utc::now();

        let (tracking, ()) = self
            .db
            .update_tracking(trip_id, |t| {
                require_trip_organizer(t, caller)?;
                t.start(now)
            })
            .await?;

        tracing::info!(trip_id, "Trip tracking started");
        self.notifier.dispatch(NotificationEvent::TripStarted {
            trip_id: tracking.trip_id.clone(),
            organizer_id: tracking.organizer_id.clone(),
            participant_ids: tracking.participants.keys().cloned().collect(),
        });
        self.notify_if_completed(TrackingStatus::NotStarted, &tracking);

        Ok(tracking)
    }

    pub async fn pause(&self, caller: &AuthUser, trip_id: &str) -> Result<TripTracking, AppError> {
        self.organizer_transition(caller, trip_id, |t, _| t.pause())
            .await
    }

    pub async fn resume(&self, caller: &AuthUser, trip_id: &str) -> Result<TripTracking, AppError> {
        self.organizer_transition(caller, trip_id, |t, now| t.resume(now))
            .await
    }

    /// Return an `emergency` trip to `active` after all alerts are resolved.
    pub async fn clear_emergency(
        &self,
        caller: &AuthUser,
        trip_id: &str,
    ) -> Result<TripTracking, AppError> {
        self.organizer_transition(caller, trip_id, |t, now| t.clear_emergency(now))
            .await
    }

    /// Finish the trip regardless of participant progress.
    pub async fn close(&self, caller: &AuthUser, trip_id: &str) -> Result<TripTracking, AppError> {
        self.organizer_transition(caller, trip_id, |t, now| t.close(now))
            .await
    }

    async fn organizer_transition<F>(
        &self,
        caller: &AuthUser,
        trip_id: &str,
        transition: F,
    ) -> Result<TripTracking, AppError>
    where
        F: Fn(&mut TripTracking, DateTime<Utc>) -> Result<(), AppError>,
    {
        require_organizer_role(caller)?;
        let now = Utc::now();

        let (tracking, previous) = self
            .db
            .update_tracking(trip_id, |t| {
                require_trip_organizer(t, caller)?;
                let previous = t.status;
                transition(t, now)?;
                Ok(previous)
            })
            .await?;

        tracing::info!(
            trip_id,
            from = %previous,
            to = %tracking.status,
            "Trip status changed"
        );
        self.notify_if_completed(previous, &tracking);
        Ok(tracking)
    }

    // ─── Participant Operations ──────────────────────────────────

    /// Record a location fix for the caller.
    ///
    /// Coordinates are validated before the aggregate is touched.
    pub async fn record_location(
        &self,
        caller: &AuthUser,
        trip_id: &str,
        update: LocationUpdate,
    ) -> Result<LocationPoint, AppError> {
        let now = Utc::now();
        let point = update.into_point(now)?;

        self.db
            .update_tracking(trip_id, |t| t.record_location(&caller.user_id, point, now))
            .await?;

        tracing::debug!(trip_id, user_id = %caller.user_id, "Location recorded");
        Ok(point)
    }

    /// Mark the caller as finished. Returns the resulting trip status.
    pub async fn complete(
        &self,
        caller: &AuthUser,
        trip_id: &str,
        end_location: Option<LocationUpdate>,
    ) -> Result<TrackingStatus, AppError> {
        let now = Utc::now();
        let end = optional_point(end_location, now);

        let (tracking, previous) = self
            .db
            .update_tracking(trip_id, |t| {
                let previous = t.status;
                t.mark_completed(&caller.user_id, end, now)?;
                Ok(previous)
            })
            .await?;

        tracing::info!(
            trip_id,
            user_id = %caller.user_id,
            trip_status = %tracking.status,
            completed = tracking.count_with_status(ParticipantStatus::Completed),
            total = tracking.participants.len(),
            "Participant completed"
        );
        self.notify_if_completed(previous, &tracking);
        Ok(tracking.status)
    }

    /// Raise an SOS for the caller. The alert is committed before the
    /// emergency notification is sent.
    pub async fn raise_sos(
        &self,
        caller: &AuthUser,
        trip_id: &str,
        location: Option<LocationUpdate>,
    ) -> Result<EmergencyAlert, AppError> {
        let now = Utc::now();
        let location = optional_point(location, now);

        let (tracking, alert) = self
            .db
            .update_tracking(trip_id, |t| t.raise_sos(&caller.user_id, location, now))
            .await?;

        let user_name = tracking
            .participant(&caller.user_id)
            .map(|p| p.user_name.clone())
            .unwrap_or_default();

        tracing::warn!(
            trip_id,
            user_id = %caller.user_id,
            has_location = alert.location.is_some(),
            "SOS raised"
        );
        self.notifier.dispatch(NotificationEvent::SosRaised {
            trip_id: tracking.trip_id.clone(),
            organizer_id: tracking.organizer_id.clone(),
            user_id: alert.user_id.clone(),
            user_name,
            location: alert.location,
            timestamp: alert.timestamp,
        });

        Ok(alert)
    }

    // ─── Alerts ──────────────────────────────────────────────────

    pub async fn resolve_alert(
        &self,
        caller: &AuthUser,
        trip_id: &str,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<EmergencyAlert, AppError> {
        let now = Utc::now();

        let (_, alert) = self
            .db
            .update_tracking(trip_id, |t| {
                require_responder(t, caller)?;
                t.resolve_alert(user_id, timestamp, &caller.user_id, now)
            })
            .await?;

        tracing::info!(trip_id, user_id, resolved_by = %caller.user_id, "Emergency alert resolved");
        Ok(alert)
    }

    pub async fn list_alerts(
        &self,
        caller: &AuthUser,
        trip_id: &str,
        unresolved_only: bool,
    ) -> Result<Vec<EmergencyAlert>, AppError> {
        let tracking = self.load(trip_id).await?;
        require_responder(&tracking, caller)?;

        Ok(tracking
            .emergency_alerts
            .into_iter()
            .filter(|a| !unresolved_only || !a.resolved)
            .collect())
    }

    // ─── Views ───────────────────────────────────────────────────

    /// The caller's view of a trip: full for the organizer, reduced for
    /// participants.
    pub async fn get_view(&self, caller: &AuthUser, trip_id: &str) -> Result<TrackingView, AppError> {
        let tracking = self.load(trip_id).await?;
        let viewer = Viewer::resolve(&tracking, &caller.user_id)?;
        Ok(TrackingView::project(&tracking, viewer))
    }

    /// The caller's `active` and `emergency` trips, most recently updated first.
    pub async fn active_trips(&self, caller: &AuthUser) -> Result<Vec<TrackingView>, AppError> {
        require_organizer_role(caller)?;
        let trips = self.db.list_live_for_organizer(&caller.user_id).await?;
        Ok(trips.iter().map(TrackingView::full).collect())
    }

    fn notify_if_completed(&self, previous: TrackingStatus, tracking: &TripTracking) {
        if previous != TrackingStatus::Completed && tracking.status == TrackingStatus::Completed {
            tracing::info!(trip_id = %tracking.trip_id, "Trip completed");
            self.notifier.dispatch(NotificationEvent::TripCompleted {
                trip_id: tracking.trip_id.clone(),
                organizer_id: tracking.organizer_id.clone(),
            });
        }
    }
}
