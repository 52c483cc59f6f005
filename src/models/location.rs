// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS sample model and validation.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// A single recorded GPS sample. Immutable once stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, as reported by the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationPoint {
    /// Great-circle distance to another point, in meters.
    pub fn distance_to(&self, other: &LocationPoint) -> f64 {
        Haversine.distance(self.as_point(), other.as_point())
    }

    fn as_point(&self) -> Point<f64> {
        // geo uses (x, y) = (longitude, latitude)
        Point::new(self.longitude, self.latitude)
    }
}

/// Location payload submitted by a participant's client.
///
/// The server stamps the sample when it is accepted; clients do not supply
/// timestamps.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within [-90, 90]"))]
    pub latitude: f64,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be within [-180, 180]"
    ))]
    pub longitude: f64,

    pub altitude: Option<f64>,

    #[validate(range(min = 0.0, message = "accuracy cannot be negative"))]
    pub accuracy: Option<f64>,
}

impl LocationUpdate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
        }
    }

    /// Validate the payload and stamp it as a recorded point.
    pub fn into_point(self, timestamp: DateTime<Utc>) -> Result<LocationPoint, AppError> {
        // Range checks pass NaN through, so reject non-finite values first.
        let finite = self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.altitude.is_none_or(f64::is_finite)
            && self.accuracy.is_none_or(f64::is_finite);
        if !finite {
            return Err(AppError::Validation(
                "coordinates must be finite numbers".to_string(),
            ));
        }

        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(LocationPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            accuracy: self.accuracy,
            timestamp,
        })
    }
}

/// Parse an optional location body.
///
/// Used by the completion and SOS endpoints, where a missing or unusable
/// location must not block the request.
pub fn optional_point(
    update: Option<LocationUpdate>,
    timestamp: DateTime<Utc>,
) -> Option<LocationPoint> {
    let update = update?;
    match update.into_point(timestamp) {
        Ok(point) => Some(point),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid optional location");
            None
        }
    }
}
