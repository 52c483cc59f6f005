// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip roster as returned by the booking service.

use serde::{Deserialize, Serialize};

/// Participant list and owner of a trip, snapshotted at tracking
/// initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRoster {
    pub trip_id: String,
    pub organizer_id: String,
    #[serde(default)]
    pub participants: Vec<RosterParticipant>,
}

/// A booked participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterParticipant {
    pub user_id: String,
    /// Display name (may be empty if the booking service has none)
    #[serde(default)]
    pub user_name: String,
}

impl TripRoster {
    /// `(user_id, user_name)` pairs in booking order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &str)> {
        self.participants
            .iter()
            .map(|p| (p.user_id.as_str(), p.user_name.as_str()))
    }
}
