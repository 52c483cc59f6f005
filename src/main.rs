// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trek-Tracker API Server
//!
//! Live location tracking and SOS handling for organized trips.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trek_tracker::{
    config::{Config, StoreKind},
    db::TrackingDb,
    services::{NotificationService, RosterService, TrackingService},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Trek-Tracker API");

    let db = match config.store {
        StoreKind::Firestore => TrackingDb::new(&config.gcp_project_id).await?,
        StoreKind::Memory => {
            tracing::warn!("Using in-memory tracking store; data is lost on restart");
            TrackingDb::new_in_memory()
        }
    };

    let rosters = RosterService::new(&config.booking_api_url)?;
    tracing::info!(url = %config.booking_api_url, "Booking service client initialized");

    let notifier = NotificationService::new(config.notification_url.as_deref());
    if config.notification_url.is_none() {
        tracing::warn!("NOTIFICATION_URL not set; notifications will only be logged");
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        tracking: TrackingService::new(db, rosters, notifier),
    });

    // Build router
    let app = trek_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trek_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
