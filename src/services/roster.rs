// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking service client for trip rosters.
//!
//! The roster is read once, when tracking is initialized; later roster
//! changes in the booking system do not reach an existing aggregate.

use crate::error::AppError;
use crate::models::TripRoster;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

const ROSTER_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
enum RosterSource {
    Http {
        http: reqwest::Client,
        base_url: String,
    },
    /// Fixed rosters, for tests and local runs.
    Static(Arc<DashMap<String, TripRoster>>),
}

/// Source of trip rosters.
#[derive(Clone)]
pub struct RosterService {
    source: RosterSource,
}

impl RosterService {
    /// Create a client for the booking service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(ROSTER_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            source: RosterSource::Http {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    /// Create an in-process roster source with no trips.
    pub fn new_static() -> Self {
        Self {
            source: RosterSource::Static(Arc::new(DashMap::new())),
        }
    }

    /// Register a roster with an in-process source.
    ///
    /// Ignored (with a warning) for the HTTP client.
    pub fn insert(&self, roster: TripRoster) {
        match &self.source {
            RosterSource::Static(rosters) => {
                rosters.insert(roster.trip_id.clone(), roster);
            }
            RosterSource::Http { .. } => {
                tracing::warn!(trip_id = %roster.trip_id, "Cannot insert roster into booking service client");
            }
        }
    }

    /// Fetch the participant roster and organizer for a trip.
    pub async fn get_participant_roster(&self, trip_id: &str) -> Result<TripRoster, AppError> {
        match &self.source {
            RosterSource::Static(rosters) => rosters
                .get(trip_id)
                .map(|r| r.clone())
                .ok_or_else(|| AppError::NotFound(format!("Trip {} not found", trip_id))),
            RosterSource::Http { http, base_url } => {
                let url = format!("{}/trips/{}/roster", base_url, trip_id);

                let response = http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| AppError::Upstream(format!("Roster request failed: {}", e)))?;

                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(AppError::NotFound(format!("Trip {} not found", trip_id)));
                }
                if !status.is_success() {
                    return Err(AppError::Upstream(format!(
                        "Booking service returned {} for trip {}",
                        status, trip_id
                    )));
                }

                let roster: TripRoster = response
                    .json()
                    .await
                    .map_err(|e| AppError::Upstream(format!("Invalid roster payload: {}", e)))?;

                if roster.trip_id != trip_id {
                    return Err(AppError::Upstream(format!(
                        "Booking service returned roster for {} instead of {}",
                        roster.trip_id, trip_id
                    )));
                }

                tracing::debug!(
                    trip_id,
                    participants = roster.participants.len(),
                    "Fetched trip roster"
                );
                Ok(roster)
            }
        }
    }
}
