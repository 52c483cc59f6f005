// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trek-Tracker: live trip tracking and emergency alerts
//!
//! This crate provides the backend API that follows participants' positions
//! during an organized trip, derives the trip's status from their progress,
//! and records SOS alerts for the organizer and on-call staff.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::TrackingService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tracking: TrackingService,
}
