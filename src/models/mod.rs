// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod alert;
pub mod location;
pub mod participant;
pub mod roster;
pub mod tracking;
pub mod view;

pub use alert::{AlertType, EmergencyAlert};
pub use location::{LocationPoint, LocationUpdate};
pub use participant::{ParticipantStatus, ParticipantTracking, LOCATION_HISTORY_LIMIT};
pub use roster::{RosterParticipant, TripRoster};
pub use tracking::{TrackingStatus, TripTracking};
pub use view::{ParticipantView, TrackingView, Viewer};
