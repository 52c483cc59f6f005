// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip tracking aggregate and its status machine.
//!
//! One `TripTracking` document exists per trip. It owns every participant's
//! progress and the alert log. All trip-level status changes other than the
//! SOS override and explicit organizer actions go through
//! [`TripTracking::refresh_status`].

use crate::error::AppError;
use crate::models::{EmergencyAlert, LocationPoint, ParticipantStatus, ParticipantTracking};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Trip-level tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TrackingStatus {
    #[default]
    NotStarted,
    Active,
    Completed,
    Emergency,
    Paused,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::NotStarted => "not_started",
            TrackingStatus::Active => "active",
            TrackingStatus::Completed => "completed",
            TrackingStatus::Emergency => "emergency",
            TrackingStatus::Paused => "paused",
        }
    }

    /// Statuses listed on an organizer's active-trips board.
    pub fn is_live(&self) -> bool {
        matches!(self, TrackingStatus::Active | TrackingStatus::Emergency)
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking aggregate for one trip.
///
/// Stored in the `trip_tracking` collection, keyed by trip id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TripTracking {
    pub trip_id: String,
    pub organizer_id: String,
    #[serde(default)]
    pub status: TrackingStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Participants keyed by user id, in roster order. Stored as an array.
    #[serde(default, with = "participants_in_order")]
    #[cfg_attr(feature = "binding-generation", ts(as = "Vec<ParticipantTracking>"))]
    pub participants: IndexMap<String, ParticipantTracking>,
    #[serde(default)]
    pub emergency_alerts: Vec<EmergencyAlert>,
    /// Incremented on every committed write (compare-and-swap token)
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripTracking {
    /// Build a fresh aggregate from a roster snapshot. Every participant
    /// starts as `joined`; duplicate roster entries collapse to one.
    pub fn new<I, U, N>(
        trip_id: impl Into<String>,
        organizer_id: impl Into<String>,
        roster: I,
        now: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = (U, N)>,
        U: Into<String>,
        N: Into<String>,
    {
        let participants = roster
            .into_iter()
            .map(|(id, name)| {
                let participant = ParticipantTracking::new(id, name);
                (participant.user_id.clone(), participant)
            })
            .collect();

        Self {
            trip_id: trip_id.into(),
            organizer_id: organizer_id.into(),
            status: TrackingStatus::NotStarted,
            started_at: None,
            completed_at: None,
            participants,
            emergency_alerts: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_organizer(&self, user_id: &str) -> bool {
        self.organizer_id == user_id
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.contains_key(user_id)
    }

    pub fn participant(&self, user_id: &str) -> Option<&ParticipantTracking> {
        self.participants.get(user_id)
    }

    /// Look up the caller's own slot. The error message never names other
    /// participants.
    pub(crate) fn participant_mut(
        &mut self,
        user_id: &str,
    ) -> Result<&mut ParticipantTracking, AppError> {
        self.participants
            .get_mut(user_id)
            .ok_or_else(|| AppError::Forbidden("You are not a participant in this trip".to_string()))
    }

    // ─── Participant Events ──────────────────────────────────────

    pub fn record_location(
        &mut self,
        user_id: &str,
        point: LocationPoint,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.participant_mut(user_id)?.record_location(point, now);
        self.refresh_status(now);
        Ok(())
    }

    /// Mark one participant finished and return the resulting trip status.
    pub fn mark_completed(
        &mut self,
        user_id: &str,
        end_location: Option<LocationPoint>,
        now: DateTime<Utc>,
    ) -> Result<TrackingStatus, AppError> {
        self.participant_mut(user_id)?.mark_completed(end_location);
        self.refresh_status(now);
        Ok(self.status)
    }

    /// Recompute the derived trip status from the full participant set.
    ///
    /// Only an `active` trip completes automatically, and only when every
    /// participant is `completed`. `emergency` never exits here. Returns
    /// `true` when this call completed the trip. `completed_at` keeps the
    /// first completion time if the trip completes again after an SOS.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != TrackingStatus::Active {
            return false;
        }

        let all_completed = !self.participants.is_empty()
            && self.participants.values().all(ParticipantTracking::is_completed);

        if all_completed {
            self.status = TrackingStatus::Completed;
            self.completed_at.get_or_insert(now);
            return true;
        }
        false
    }

    // ─── Organizer Actions ───────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.require_status(TrackingStatus::NotStarted, "start")?;
        self.status = TrackingStatus::Active;
        self.started_at = Some(now);
        // Participants may have finished before the organizer started
        self.refresh_status(now);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), AppError> {
        self.require_status(TrackingStatus::Active, "pause")?;
        self.status = TrackingStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.require_status(TrackingStatus::Paused, "resume")?;
        self.status = TrackingStatus::Active;
        self.refresh_status(now);
        Ok(())
    }

    /// Return an `emergency` trip to `active` once every alert is resolved.
    pub fn clear_emergency(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.require_status(TrackingStatus::Emergency, "clear the emergency on")?;
        if self.has_unresolved_alerts() {
            return Err(AppError::Conflict(
                "All emergency alerts must be resolved first".to_string(),
            ));
        }
        self.status = TrackingStatus::Active;
        self.refresh_status(now);
        Ok(())
    }

    /// End the trip regardless of participant progress.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        match self.status {
            TrackingStatus::Active | TrackingStatus::Paused | TrackingStatus::Emergency => {}
            other => {
                return Err(AppError::AlreadyInState(format!(
                    "Cannot close a trip that is {}",
                    other
                )))
            }
        }
        if self.has_unresolved_alerts() {
            return Err(AppError::Conflict(
                "All emergency alerts must be resolved first".to_string(),
            ));
        }
        self.status = TrackingStatus::Completed;
        self.completed_at.get_or_insert(now);
        Ok(())
    }

    fn require_status(&self, expected: TrackingStatus, action: &str) -> Result<(), AppError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(AppError::AlreadyInState(format!(
                "Cannot {} a trip that is {}",
                action, self.status
            )))
        }
    }

    /// Count of participants per status, for logging.
    pub fn count_with_status(&self, status: ParticipantStatus) -> usize {
        self.participants
            .values()
            .filter(|p| p.status == status)
            .count()
    }
}

/// Participants round-trip as a list because Firestore map fields do not
/// keep insertion order. The keyed map is rebuilt from `userId` on load.
mod participants_in_order {
    use super::ParticipantTracking;
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        participants: &IndexMap<String, ParticipantTracking>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(participants.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<IndexMap<String, ParticipantTracking>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<ParticipantTracking>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect())
    }
}
