// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emergency alert log and the SOS escalation rule.

use crate::error::AppError;
use crate::models::{LocationPoint, TrackingStatus, TripTracking};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kind of emergency signal.
///
/// Only `Sos` is raised today; the others are reserved for anomaly
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum AlertType {
    NoMovement,
    Sos,
    OffRoute,
    Overdue,
}

/// Entry in a trip's append-only alert log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EmergencyAlert {
    pub user_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationPoint>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

impl TripTracking {
    /// Record an SOS from a participant.
    ///
    /// Appends an unresolved alert, flags the participant, and forces the
    /// trip into `emergency` regardless of its current status. This is the
    /// only transition that bypasses [`TripTracking::refresh_status`].
    pub fn raise_sos(
        &mut self,
        user_id: &str,
        location: Option<LocationPoint>,
        now: DateTime<Utc>,
    ) -> Result<EmergencyAlert, AppError> {
        let participant = self.participant_mut(user_id)?;
        participant.raise_emergency();
        participant.emergency_contacts_notified = true;

        let alert = EmergencyAlert {
            user_id: user_id.to_string(),
            alert_type: AlertType::Sos,
            timestamp: now,
            location,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };
        self.emergency_alerts.push(alert.clone());
        self.status = TrackingStatus::Emergency;

        Ok(alert)
    }

    /// Mark the alert raised by `user_id` at `timestamp` as resolved.
    ///
    /// Trip status is left untouched: leaving `emergency` is a separate
    /// organizer action.
    pub fn resolve_alert(
        &mut self,
        user_id: &str,
        timestamp: DateTime<Utc>,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<EmergencyAlert, AppError> {
        let alert = self
            .emergency_alerts
            .iter_mut()
            .find(|a| a.user_id == user_id && a.timestamp == timestamp)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No alert from user {} at {}",
                    user_id,
                    crate::time_utils::format_utc_rfc3339(timestamp)
                ))
            })?;

        if alert.resolved {
            return Err(AppError::AlreadyInState(
                "Alert is already resolved".to_string(),
            ));
        }

        alert.resolved = true;
        alert.resolved_at = Some(now);
        alert.resolved_by = Some(resolved_by.to_string());
        Ok(alert.clone())
    }

    pub fn unresolved_alerts(&self) -> impl Iterator<Item = &EmergencyAlert> {
        self.emergency_alerts.iter().filter(|a| !a.resolved)
    }

    pub fn has_unresolved_alerts(&self) -> bool {
        self.unresolved_alerts().next().is_some()
    }
}
