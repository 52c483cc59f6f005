// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-participant progress within a tracked trip.

use crate::models::LocationPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of recent samples retained per participant.
pub const LOCATION_HISTORY_LIMIT: usize = 100;

/// Lifecycle of one participant within a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ParticipantStatus {
    #[default]
    Joined,
    /// Legacy value; documents written by older clients may carry it.
    Started,
    Active,
    Completed,
    Emergency,
}

/// Tracking state for a single roster member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ParticipantTracking {
    pub user_id: String,
    /// Display name snapshot taken at initialization
    pub user_name: String,
    #[serde(default)]
    pub status: ParticipantStatus,
    #[serde(default)]
    pub last_location: Option<LocationPoint>,
    #[serde(default)]
    pub start_location: Option<LocationPoint>,
    #[serde(default)]
    pub end_location: Option<LocationPoint>,
    /// Most recent samples, oldest first
    #[serde(default)]
    pub location_history: VecDeque<LocationPoint>,
    #[serde(default)]
    pub last_check_in: Option<DateTime<Utc>>,
    /// Path length accumulated from reported samples (meters)
    #[serde(default)]
    pub distance_meters: f64,
    #[serde(default)]
    pub emergency_contacts_notified: bool,
}

impl ParticipantTracking {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            status: ParticipantStatus::Joined,
            last_location: None,
            start_location: None,
            end_location: None,
            location_history: VecDeque::new(),
            last_check_in: None,
            distance_meters: 0.0,
            emergency_contacts_notified: false,
        }
    }

    /// Apply a location sample.
    ///
    /// The first sample moves a `joined` participant to `active` and becomes
    /// the start location. Duplicate timestamps are appended as-is.
    pub fn record_location(&mut self, point: LocationPoint, now: DateTime<Utc>) {
        if self.status == ParticipantStatus::Joined {
            self.status = ParticipantStatus::Active;
            self.start_location = Some(point);
        }

        if let Some(previous) = &self.last_location {
            self.distance_meters += previous.distance_to(&point);
        }

        self.last_location = Some(point);
        self.last_check_in = Some(now);

        self.location_history.push_back(point);
        while self.location_history.len() > LOCATION_HISTORY_LIMIT {
            self.location_history.pop_front();
        }
    }

    /// Mark this participant as finished. Allowed from any status, including
    /// `emergency`.
    pub fn mark_completed(&mut self, end_location: Option<LocationPoint>) {
        self.status = ParticipantStatus::Completed;
        if end_location.is_some() {
            self.end_location = end_location;
        }
    }

    /// Flag this participant as in an emergency, overriding any status.
    pub fn raise_emergency(&mut self) {
        self.status = ParticipantStatus::Emergency;
    }

    pub fn is_completed(&self) -> bool {
        self.status == ParticipantStatus::Completed
    }
}
